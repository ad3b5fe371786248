// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic templates and the matchers compiled from them.
//!
//! Tasmota devices publish under a configurable `FullTopic` such as
//! `%prefix%/%topic%/`, where `%prefix%` is one of `cmnd`, `stat` or `tele`
//! and `%topic%` is the device's own name. A [`TopicTemplate`] is compiled
//! into a [`TopicMatcher`] that splits concrete topics back into
//! `(prefix, topic, reply)`, and can be expanded again with
//! [`TopicTemplate::build`].
//!
//! # Examples
//!
//! ```
//! use tasmota_fleet::pattern::TopicTemplate;
//!
//! let template = TopicTemplate::new("%prefix%/%topic%/");
//! let matcher = template.compile().unwrap();
//!
//! let parsed = matcher.parse("stat/lamp1/RESULT").unwrap();
//! assert_eq!(parsed.prefix, "stat");
//! assert_eq!(parsed.topic, "lamp1");
//! assert_eq!(parsed.reply, "RESULT");
//!
//! assert_eq!(template.build("cmnd", "lamp1", Some("Power")), "cmnd/lamp1/Power");
//! ```

mod matcher;
mod template;

pub use matcher::{ParsedTopic, ProbeMatch, ProbeMatcher, TopicMatcher};
pub use template::{PREFIX_PLACEHOLDER, TOPIC_PLACEHOLDER, TopicTemplate};
