// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `FullTopic` template type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

use super::{ProbeMatcher, TopicMatcher};

/// Placeholder replaced by the channel prefix (`cmnd`, `stat`, `tele`).
pub const PREFIX_PLACEHOLDER: &str = "%prefix%";

/// Placeholder replaced by the device topic.
pub const TOPIC_PLACEHOLDER: &str = "%topic%";

/// Topic level separator.
pub(crate) const SEPARATOR: char = '/';

/// A device-declared topic layout such as `%prefix%/%topic%/`.
///
/// Only `%prefix%` and `%topic%` are substituted; any other `%...%` text is
/// treated as a literal.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::pattern::TopicTemplate;
///
/// let template = TopicTemplate::new("%topic%/%prefix%/");
/// assert_eq!(template.build("tele", "plug", Some("LWT")), "plug/tele/LWT");
/// assert_eq!(template.build("cmnd", "plug", None), "plug/cmnd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicTemplate(String);

impl TopicTemplate {
    /// Wraps a template string.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Returns the template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the templates probed for when the configuration names none.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![Self::new("%prefix%/%topic%/"), Self::new("%topic%/%prefix%/")]
    }

    /// Expands the template into a concrete topic.
    ///
    /// Both placeholders are substituted literally, trailing separators are
    /// stripped, and `/<suffix>` is appended when a non-empty suffix is given.
    #[must_use]
    pub fn build(&self, prefix: &str, topic: &str, suffix: Option<&str>) -> String {
        let mut built = self
            .0
            .replace(PREFIX_PLACEHOLDER, prefix)
            .replace(TOPIC_PLACEHOLDER, topic);
        built.truncate(built.trim_end_matches(SEPARATOR).len());

        if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
            built.push(SEPARATOR);
            built.push_str(suffix);
        }
        built
    }

    /// Compiles the template into an anchored matcher.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the template has no `%topic%` placeholder
    /// or repeats a placeholder.
    pub fn compile(&self) -> Result<TopicMatcher, PatternError> {
        TopicMatcher::compile(self.clone())
    }

    /// Compiles the wildcard form used to guess device topics from
    /// unmatched last-will messages.
    ///
    /// # Errors
    ///
    /// Same conditions as [`compile`](Self::compile).
    pub fn compile_probe(&self) -> Result<ProbeMatcher, PatternError> {
        ProbeMatcher::compile(self.clone())
    }
}

impl fmt::Display for TopicTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TopicTemplate {
    fn from(value: String) -> Self {
        Self(value)
    }
}
