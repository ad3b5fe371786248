// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a discovered device.
///
/// This is the device's MQTT topic (the value substituted for `%topic%`),
/// assigned once at discovery and never changed afterwards.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::device::DeviceId;
///
/// let id = DeviceId::new("tasmota_5A3F1C");
/// assert_eq!(id.as_str(), "tasmota_5A3F1C");
/// assert_eq!(id.to_string(), "tasmota_5A3F1C");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates an identifier from a device topic.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for DeviceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DeviceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_with_str() {
        let id = DeviceId::new("lamp1");
        assert_eq!(id, "lamp1");
        assert!(id == *"lamp1");
    }

    #[test]
    fn debug_format() {
        let id = DeviceId::new("lamp1");
        assert_eq!(format!("{id:?}"), "DeviceId(lamp1)");
    }

    #[test]
    fn hashable_and_borrowable() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(DeviceId::new("lamp1"), 1);
        assert_eq!(map.get("lamp1"), Some(&1));
    }

    #[test]
    fn serde_is_transparent() {
        let id = DeviceId::new("plug");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"plug\"");
    }
}
