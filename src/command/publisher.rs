// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fire-and-forget command publication.

use std::sync::Arc;

use crate::command::{Command, DeviceCommand, INITIAL_COMMANDS};
use crate::device::Device;
use crate::pattern::TopicTemplate;
use crate::protocol::Transport;

/// Prefix of command topics.
pub(crate) const COMMAND_PREFIX: &str = "cmnd";

/// Publishes commands to devices through a [`Transport`].
///
/// Nothing waits for an answer: replies arrive as ordinary inbound messages
/// and are handled by the router. Transport failures are logged and
/// otherwise ignored.
#[derive(Clone)]
pub struct CommandPublisher {
    transport: Arc<dyn Transport>,
}

impl CommandPublisher {
    /// Creates a publisher sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns the topic `command` is published to for `device`.
    ///
    /// An empty command yields the bare command topic.
    #[must_use]
    pub fn command_topic(device: &Device, command: &str) -> String {
        device.topic_for(COMMAND_PREFIX, Some(command))
    }

    /// Publishes `value` as the payload of `command` to `device`.
    pub fn publish(&self, device: &Device, command: &str, value: &str) {
        let topic = Self::command_topic(device, command);
        self.publish_raw(&topic, value.as_bytes());
    }

    /// Publishes a typed command to `device`.
    pub fn send(&self, device: &Device, command: &impl Command) {
        self.publish(device, &command.mqtt_topic_suffix(), &command.mqtt_payload());
    }

    /// Publishes every entry of [`INITIAL_COMMANDS`] to `device` once.
    pub fn initial_query(&self, device: &Device) {
        tracing::debug!(device = %device.id(), "Sending initial query");
        for (command, value) in INITIAL_COMMANDS {
            self.publish(device, command, value);
        }
    }

    /// Asks a device that is not registered yet for its `FullTopic`,
    /// addressing it through a candidate template.
    pub fn probe_full_topic(&self, template: &TopicTemplate, topic: &str) {
        let command = DeviceCommand::FullTopic;
        let suffix = command.mqtt_topic_suffix();
        let probe = template.build(COMMAND_PREFIX, topic, Some(suffix.as_str()));
        tracing::info!(
            topic = %probe,
            full_topic = %template,
            "Asking unknown device for its FullTopic"
        );
        self.publish_raw(&probe, command.mqtt_payload().as_bytes());
    }

    fn publish_raw(&self, topic: &str, payload: &[u8]) {
        match self.transport.publish(topic, payload) {
            Ok(()) => tracing::debug!(topic = %topic, bytes = payload.len(), "Published"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Publish failed"),
        }
    }
}

impl std::fmt::Debug for CommandPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPublisher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRecord;
    use crate::protocol::MemoryTransport;

    fn setup() -> (Arc<MemoryTransport>, CommandPublisher) {
        let transport = Arc::new(MemoryTransport::new());
        let publisher = CommandPublisher::new(transport.clone());
        (transport, publisher)
    }

    #[test]
    fn command_topic_for_each_layout() {
        let lamp = Device::new(DeviceRecord::new("lamp1", "%prefix%/%topic%/"));
        let plug = Device::new(DeviceRecord::new("plug", "%topic%/%prefix%/"));

        assert_eq!(CommandPublisher::command_topic(&lamp, "Power"), "cmnd/lamp1/Power");
        assert_eq!(CommandPublisher::command_topic(&plug, "Power"), "plug/cmnd/Power");
        assert_eq!(CommandPublisher::command_topic(&lamp, ""), "cmnd/lamp1");
    }

    #[test]
    fn initial_query_publishes_every_entry_once() {
        let (transport, publisher) = setup();
        let lamp = Device::new(DeviceRecord::new("lamp1", "%prefix%/%topic%/"));

        publisher.initial_query(&lamp);

        let published = transport.published();
        assert_eq!(published.len(), INITIAL_COMMANDS.len());
        for ((topic, payload), (command, value)) in published.iter().zip(INITIAL_COMMANDS) {
            assert_eq!(topic, &format!("cmnd/lamp1/{command}"));
            assert_eq!(payload.as_slice(), value.as_bytes());
        }
    }

    #[test]
    fn send_typed_command() {
        let (transport, publisher) = setup();
        let lamp = Device::new(DeviceRecord::new("lamp1", "%prefix%/%topic%/"));

        publisher.send(&lamp, &DeviceCommand::Status(0));
        publisher.send(&lamp, &DeviceCommand::Restart);

        assert_eq!(
            transport.published(),
            vec![
                ("cmnd/lamp1/status".to_string(), b"0".to_vec()),
                ("cmnd/lamp1/restart".to_string(), b"1".to_vec()),
            ]
        );
    }

    #[test]
    fn probe_full_topic_sends_empty_payload() {
        let (transport, publisher) = setup();

        publisher.probe_full_topic(&TopicTemplate::new("%topic%/%prefix%/"), "plug");

        assert_eq!(
            transport.published(),
            vec![("plug/cmnd/FullTopic".to_string(), Vec::new())]
        );
    }
}
