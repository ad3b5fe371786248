// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handlers for payloads of known devices.

use crate::device::{Device, ENDPOINT_FULL_TOPIC};
use crate::pattern::ParsedTopic;

use super::{FullTopicReply, Payload};

/// Receives every non-last-will message of a registered device.
///
/// Implementations map firmware-specific payloads onto device state. They
/// are called from the transport callback and must not block.
pub trait PayloadHandler: Send + Sync {
    /// Handles one message of `device`.
    fn handle(&self, device: &Device, parsed: &ParsedTopic, payload: &Payload);
}

impl<F> PayloadHandler for F
where
    F: Fn(&Device, &ParsedTopic, &Payload) + Send + Sync,
{
    fn handle(&self, device: &Device, parsed: &ParsedTopic, payload: &Payload) {
        self(device, parsed, payload);
    }
}

/// Default handler that merges JSON object payloads into the device
/// attributes.
///
/// `STATUS*` answers, `STATE` and `SENSOR` telemetry and `RESULT` echoes all
/// carry top-level sections (`StatusNET`, `Uptime`, ...), so merging them
/// builds the document [`Device::status`] decodes. A `FullTopic` echo also
/// refreshes the `FullTopic` endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeCollector;

impl PayloadHandler for AttributeCollector {
    fn handle(&self, device: &Device, parsed: &ParsedTopic, payload: &Payload) {
        let Some(fields) = payload.as_object() else {
            tracing::trace!(
                device = %device.id(),
                reply = %parsed.reply,
                "Non-object payload ignored"
            );
            return;
        };

        device.merge_attributes(fields);

        if let Ok(reply) = payload.decode::<FullTopicReply>() {
            device
                .endpoints()
                .set(ENDPOINT_FULL_TOPIC, reply.full_topic.as_str());
        }

        tracing::debug!(
            device = %device.id(),
            reply = %parsed.reply,
            fields = fields.len(),
            "Attributes updated"
        );
    }
}
