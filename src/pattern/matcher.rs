// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Compiled topic matchers.
//!
//! ```text
//! template   %prefix%/%topic%/
//!                ↓ compile
//! expression ^(?P<prefix>.*?)/(?P<topic>.+?)(?:/(?P<reply>.*))?$
//!                ↓ parse("stat/lamp1/RESULT")
//! parsed     prefix = "stat", topic = "lamp1", reply = "RESULT"
//! ```

use regex::{Captures, Regex};

use crate::error::PatternError;

use super::TopicTemplate;
use super::template::{PREFIX_PLACEHOLDER, SEPARATOR, TOPIC_PLACEHOLDER};

/// Components recovered from a concrete topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTopic {
    /// The channel prefix (`stat`, `tele`, `cmnd`); may be empty.
    pub prefix: String,
    /// The device topic; never empty.
    pub topic: String,
    /// Whatever follows the template, e.g. `RESULT` or `LWT`; may be empty.
    pub reply: String,
}

/// Matcher for topics laid out according to a [`TopicTemplate`].
///
/// The match is anchored. `%prefix%` may capture nothing, `%topic%` captures
/// at least one character, and both are lazy so the first separator after
/// them ends the capture. Trailing separators in the template are folded into
/// an optional `/<reply>` tail.
#[derive(Debug, Clone)]
pub struct TopicMatcher {
    template: TopicTemplate,
    regex: Regex,
}

impl TopicMatcher {
    pub(super) fn compile(template: TopicTemplate) -> Result<Self, PatternError> {
        require_topic(&template)?;

        let body = template.as_str().trim_end_matches(SEPARATOR);
        let expression = format!(
            "^{}(?:{}(?P<reply>.*))?$",
            expand(body, "(?P<prefix>.*?)", "(?P<topic>.+?)"),
            regex::escape(&SEPARATOR.to_string()),
        );
        let regex = build_regex(&template, &expression)?;

        Ok(Self { template, regex })
    }

    /// Returns the template this matcher was compiled from.
    #[must_use]
    pub fn template(&self) -> &TopicTemplate {
        &self.template
    }

    /// Splits a concrete topic into its components.
    ///
    /// Returns `None` if the topic does not follow the template.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<ParsedTopic> {
        let captures = self.regex.captures(topic)?;
        let parsed = ParsedTopic {
            prefix: group(&captures, "prefix"),
            topic: group(&captures, "topic"),
            reply: group(&captures, "reply"),
        };
        (!parsed.topic.is_empty()).then_some(parsed)
    }
}

/// A device topic guessed from an unmatched last-will topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch {
    /// The captured prefix.
    pub prefix: String,
    /// The captured device topic; may be empty or a reserved segment.
    pub topic: String,
}

/// Wildcard matcher used during discovery.
///
/// Unlike [`TopicMatcher`], `%topic%` is greedy and any suffix is accepted,
/// so the capture is only a guess at the device topic.
#[derive(Debug, Clone)]
pub struct ProbeMatcher {
    template: TopicTemplate,
    regex: Regex,
}

impl ProbeMatcher {
    pub(super) fn compile(template: TopicTemplate) -> Result<Self, PatternError> {
        require_topic(&template)?;

        let expression = format!(
            "^{}.*$",
            expand(template.as_str(), "(?P<prefix>.*?)", "(?P<topic>.*)")
        );
        let regex = build_regex(&template, &expression)?;

        Ok(Self { template, regex })
    }

    /// Returns the template this matcher was compiled from.
    #[must_use]
    pub fn template(&self) -> &TopicTemplate {
        &self.template
    }

    /// Guesses the prefix and device topic of `topic`.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<ProbeMatch> {
        let captures = self.regex.captures(topic)?;
        Some(ProbeMatch {
            prefix: group(&captures, "prefix"),
            topic: group(&captures, "topic"),
        })
    }
}

fn require_topic(template: &TopicTemplate) -> Result<(), PatternError> {
    if template.as_str().contains(TOPIC_PLACEHOLDER) {
        Ok(())
    } else {
        Err(PatternError::MissingTopic(template.as_str().to_string()))
    }
}

fn build_regex(template: &TopicTemplate, expression: &str) -> Result<Regex, PatternError> {
    Regex::new(expression).map_err(|e| PatternError::Invalid {
        template: template.as_str().to_string(),
        message: e.to_string(),
    })
}

fn group(captures: &Captures<'_>, name: &str) -> String {
    captures
        .name(name)
        .map_or_else(String::new, |m| m.as_str().to_string())
}

/// Escapes literal text and replaces each placeholder with its capture group.
///
/// A placeholder that appears twice yields a duplicate group name, which the
/// regex compiler rejects.
fn expand(template: &str, prefix_group: &str, topic_group: &str) -> String {
    let mut expression = String::with_capacity(template.len() + 32);
    let mut rest = template;

    loop {
        let next = [
            (PREFIX_PLACEHOLDER, prefix_group),
            (TOPIC_PLACEHOLDER, topic_group),
        ]
        .into_iter()
        .filter_map(|(placeholder, group)| rest.find(placeholder).map(|at| (at, placeholder, group)))
        .min_by_key(|(at, _, _)| *at);

        let Some((at, placeholder, group)) = next else {
            expression.push_str(&regex::escape(rest));
            return expression;
        };

        expression.push_str(&regex::escape(&rest[..at]));
        expression.push_str(group);
        rest = &rest[at + placeholder.len()..];
    }
}
