// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound payload decoding.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::pattern::TopicTemplate;

/// An inbound message body, decoded once when it enters the router.
///
/// Tasmota sends JSON for almost everything, but last-will messages and
/// some command echoes are bare strings, so both views are kept.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::router::Payload;
///
/// let payload = Payload::from_bytes(br#"{"POWER":"ON"}"#).unwrap();
/// assert_eq!(payload.json().unwrap()["POWER"], "ON");
///
/// let lwt = Payload::from_bytes(b"Online").unwrap();
/// assert_eq!(lwt.raw(), "Online");
/// assert!(lwt.json().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    raw: String,
    json: Option<Value>,
}

impl Payload {
    /// Decodes a text payload.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let json = serde_json::from_str(&raw).ok();
        Self { raw, json }
    }

    /// Decodes a payload from bytes; `None` if they are not UTF-8.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().map(Self::new)
    }

    /// Returns the payload text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed JSON document, if the payload is JSON.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// Returns the top-level JSON object, if the payload is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.json.as_ref().and_then(Value::as_object)
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Decodes the JSON document into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::NotJson` if the payload is not JSON, or
    /// `ParseError::Json` if the document does not have the expected shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ParseError> {
        let json = self.json.as_ref().ok_or(ParseError::NotJson)?;
        Ok(T::deserialize(json)?)
    }
}

/// A device's answer to a `FullTopic` query.
///
/// Tasmota sends it on `.../RESULT` or `.../FULLTOPIC` as
/// `{"FullTopic":"%prefix%/%topic%/"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FullTopicReply {
    /// The template the device publishes under.
    #[serde(rename = "FullTopic")]
    pub full_topic: TopicTemplate,
}
