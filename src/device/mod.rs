// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovered devices.
//!
//! A [`DeviceRecord`] is what gets persisted: the device topic and its
//! `FullTopic` template. A [`Device`] is the live handle shared through the
//! registry: the record, the matcher compiled from its template, endpoint
//! values and the attributes the device has reported.

mod device_id;
mod endpoints;
mod record;
mod status;

pub use device_id::DeviceId;
pub use endpoints::{
    ENDPOINT_FULL_TOPIC, ENDPOINT_LAST_SEEN, ENDPOINT_LWT, EndpointValue, Endpoints, LWT_OFFLINE,
    LWT_ONLINE,
};
pub use record::DeviceRecord;
pub use status::{
    DeviceStatus, StatusDevice, StatusFirmware, StatusLogging, StatusNetwork, StatusParameters,
};

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::pattern::{ParsedTopic, TopicMatcher, TopicTemplate};

/// Template of a device together with the matcher compiled from it.
struct TopicBinding {
    full_topic: TopicTemplate,
    /// `None` when the template does not compile; the device is then only
    /// reachable through its bare identifier.
    matcher: Option<TopicMatcher>,
}

impl TopicBinding {
    fn new(id: &DeviceId, full_topic: TopicTemplate) -> Self {
        let matcher = match full_topic.compile() {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                tracing::warn!(
                    device = %id,
                    full_topic = %full_topic,
                    error = %e,
                    "Device template rejected, matching by identifier only"
                );
                None
            }
        };
        Self {
            full_topic,
            matcher,
        }
    }
}

/// A device known to the registry.
///
/// `Device` is shared as `Arc<Device>`; every mutable part sits behind its
/// own lock so routing can read and update it from concurrent callbacks.
pub struct Device {
    id: DeviceId,
    binding: RwLock<TopicBinding>,
    endpoints: Endpoints,
    attributes: RwLock<Map<String, Value>>,
}

impl Device {
    /// Creates a live device from its record, compiling its template.
    #[must_use]
    pub fn new(record: DeviceRecord) -> Self {
        let binding = TopicBinding::new(&record.id, record.full_topic);
        Self {
            id: record.id,
            binding: RwLock::new(binding),
            endpoints: Endpoints::new(),
            attributes: RwLock::new(Map::new()),
        }
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Returns the device's current template.
    #[must_use]
    pub fn full_topic(&self) -> TopicTemplate {
        self.binding.read().full_topic.clone()
    }

    /// Returns the persisted form of this device.
    #[must_use]
    pub fn record(&self) -> DeviceRecord {
        DeviceRecord::new(self.id.clone(), self.full_topic())
    }

    /// Replaces the template, recompiling the matcher.
    ///
    /// Returns `false` without touching anything if the template is unchanged.
    pub fn set_full_topic(&self, full_topic: TopicTemplate) -> bool {
        let mut binding = self.binding.write();
        if binding.full_topic == full_topic {
            return false;
        }
        *binding = TopicBinding::new(&self.id, full_topic);
        true
    }

    /// Matches a concrete topic against this device.
    ///
    /// A topic equal to the identifier matches with empty prefix and reply.
    /// Otherwise the topic must parse with the device's template and the
    /// captured topic must be this device's identifier.
    #[must_use]
    pub fn match_topic(&self, topic: &str) -> Option<ParsedTopic> {
        if self.id == topic {
            return Some(ParsedTopic {
                topic: topic.to_string(),
                ..ParsedTopic::default()
            });
        }

        let binding = self.binding.read();
        binding
            .matcher
            .as_ref()?
            .parse(topic)
            .filter(|parsed| self.id == parsed.topic.as_str())
    }

    /// Builds one of this device's topics, e.g. `tele/<id>/LWT`.
    #[must_use]
    pub fn topic_for(&self, prefix: &str, suffix: Option<&str>) -> String {
        self.binding
            .read()
            .full_topic
            .build(prefix, self.id.as_str(), suffix)
    }

    /// Returns the endpoint store.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Returns the last reported last-will value.
    #[must_use]
    pub fn liveness(&self) -> Option<String> {
        self.endpoints.text(ENDPOINT_LWT)
    }

    /// Returns `true` if the last reported last-will value is `Online`.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.liveness().as_deref() == Some(LWT_ONLINE)
    }

    /// Returns when the device was last heard from.
    #[must_use]
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.endpoints.timestamp(ENDPOINT_LAST_SEEN)
    }

    /// Records that the device was heard from now.
    pub fn touch(&self) {
        self.endpoints.set(ENDPOINT_LAST_SEEN, Utc::now());
    }

    /// Merges top-level fields of a reported JSON object into the attributes.
    pub fn merge_attributes(&self, fields: &Map<String, Value>) {
        let mut attributes = self.attributes.write();
        for (key, value) in fields {
            attributes.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy of all collected attributes.
    #[must_use]
    pub fn attributes(&self) -> Value {
        Value::Object(self.attributes.read().clone())
    }

    /// Decodes the collected attributes into a typed status view.
    ///
    /// Sections that are missing or do not have the expected shape are left
    /// empty; the others still decode.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        serde_json::from_value(self.attributes()).unwrap_or_else(|e| {
            tracing::debug!(device = %self.id, error = %e, "Attributes do not decode as status");
            DeviceStatus::default()
        })
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("full_topic", &self.binding.read().full_topic)
            .field("liveness", &self.liveness())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> Device {
        Device::new(DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
    }

    #[test]
    fn match_bare_identifier() {
        let parsed = lamp().match_topic("lamp1").unwrap();
        assert_eq!(parsed.topic, "lamp1");
        assert!(parsed.prefix.is_empty());
        assert!(parsed.reply.is_empty());
    }

    #[test]
    fn match_through_template() {
        let parsed = lamp().match_topic("tele/lamp1/STATE").unwrap();
        assert_eq!(parsed.prefix, "tele");
        assert_eq!(parsed.reply, "STATE");
    }

    #[test]
    fn other_device_topic_does_not_match() {
        assert!(lamp().match_topic("tele/lamp2/STATE").is_none());
    }

    #[test]
    fn set_full_topic_reports_change() {
        let device = lamp();
        assert!(!device.set_full_topic(TopicTemplate::new("%prefix%/%topic%/")));
        assert!(device.set_full_topic(TopicTemplate::new("%topic%/%prefix%/")));

        assert!(device.match_topic("tele/lamp1/STATE").is_none());
        assert!(device.match_topic("lamp1/tele/STATE").is_some());
    }

    #[test]
    fn invalid_template_matches_identifier_only() {
        let device = Device::new(DeviceRecord::new("lamp1", "%prefix%/fixed/"));
        assert!(device.match_topic("tele/fixed/LWT").is_none());
        assert!(device.match_topic("lamp1").is_some());
    }

    #[test]
    fn topic_for_builds_from_template() {
        assert_eq!(lamp().topic_for("tele", Some("LWT")), "tele/lamp1/LWT");
        assert_eq!(lamp().topic_for("cmnd", None), "cmnd/lamp1");
    }

    #[test]
    fn liveness_follows_lwt_endpoint() {
        let device = lamp();
        assert!(!device.is_online());
        device.endpoints().set(ENDPOINT_LWT, LWT_ONLINE);
        assert!(device.is_online());
        device.endpoints().set(ENDPOINT_LWT, LWT_OFFLINE);
        assert!(!device.is_online());
    }

    #[test]
    fn touch_sets_last_seen() {
        let device = lamp();
        assert!(device.last_seen().is_none());
        device.touch();
        assert!(device.last_seen().is_some());
    }

    #[test]
    fn attributes_merge_into_status() {
        let device = lamp();
        let first: Value = serde_json::json!({"Status": {"FriendlyName": ["Desk"]}});
        let second: Value = serde_json::json!({"StatusLOG": {"TelePeriod": 60}});
        device.merge_attributes(first.as_object().unwrap());
        device.merge_attributes(second.as_object().unwrap());

        let status = device.status();
        assert_eq!(status.friendly_name(), Some("Desk"));
        assert_eq!(status.tele_period(), Some(60));
    }

    #[test]
    fn malformed_section_keeps_the_others() {
        let device = lamp();
        let network: Value = serde_json::json!({"StatusNET": {"IPAddress": "10.0.0.7"}});
        let logging: Value = serde_json::json!({"StatusLOG": {"TelePeriod": "off"}});
        device.merge_attributes(network.as_object().unwrap());
        device.merge_attributes(logging.as_object().unwrap());

        let status = device.status();
        assert_eq!(status.ip_address(), Some("10.0.0.7"));
        assert_eq!(status.tele_period(), None);
    }
}
