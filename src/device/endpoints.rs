// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device endpoint values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Last-will state reported by the device (`Online` / `Offline`).
pub const ENDPOINT_LWT: &str = "LWT";

/// The `FullTopic` the device last reported.
pub const ENDPOINT_FULL_TOPIC: &str = "FullTopic";

/// Time the device was last heard from.
pub const ENDPOINT_LAST_SEEN: &str = "last_seen";

/// Last-will payload of a connected device.
pub const LWT_ONLINE: &str = "Online";

/// Last-will payload of a disconnected device, also used when the payload is empty.
pub const LWT_OFFLINE: &str = "Offline";

/// A value held by an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EndpointValue {
    /// Free text.
    Text(String),
    /// A numeric reading.
    Number(f64),
    /// An on/off flag.
    Bool(bool),
    /// A point in time.
    Timestamp(DateTime<Utc>),
}

impl EndpointValue {
    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a timestamp value.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(at) => Some(*at),
            _ => None,
        }
    }
}

impl From<&str> for EndpointValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EndpointValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for EndpointValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for EndpointValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for EndpointValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Thread-safe endpoint store of one device, keyed by endpoint name.
#[derive(Debug, Default)]
pub struct Endpoints {
    values: RwLock<HashMap<String, EndpointValue>>,
}

impl Endpoints {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an endpoint and returns its previous value.
    pub fn set(
        &self,
        name: impl Into<String>,
        value: impl Into<EndpointValue>,
    ) -> Option<EndpointValue> {
        self.values.write().insert(name.into(), value.into())
    }

    /// Returns a copy of an endpoint's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EndpointValue> {
        self.values.read().get(name).cloned()
    }

    /// Returns an endpoint's text value.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.values
            .read()
            .get(name)
            .and_then(EndpointValue::as_text)
            .map(str::to_string)
    }

    /// Returns an endpoint's timestamp value.
    #[must_use]
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.values
            .read()
            .get(name)
            .and_then(EndpointValue::as_timestamp)
    }

    /// Returns a copy of every endpoint.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, EndpointValue> {
        self.values.read().clone()
    }

    /// Returns the number of endpoints that hold a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if no endpoint holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
