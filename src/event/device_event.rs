// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use serde::Serialize;

use crate::device::{DeviceId, LWT_ONLINE};
use crate::pattern::TopicTemplate;

/// Events emitted while routing fleet traffic.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::device::DeviceId;
/// use tasmota_fleet::event::DeviceEvent;
/// use tasmota_fleet::pattern::TopicTemplate;
///
/// let event = DeviceEvent::discovered(
///     DeviceId::new("lamp1"),
///     TopicTemplate::new("%prefix%/%topic%/"),
/// );
/// assert!(event.is_lifecycle());
/// assert_eq!(event.device_id(), "lamp1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A device answered a `FullTopic` probe and was registered.
    Discovered {
        /// The ID of the new device.
        device_id: DeviceId,
        /// The template the device declared.
        full_topic: TopicTemplate,
    },

    /// A known device declared a different template.
    FullTopicChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// The new template.
        full_topic: TopicTemplate,
    },

    /// A known device published its last-will topic.
    LivenessChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// Whether the device reported `Online`.
        online: bool,
        /// The raw last-will value.
        lwt: String,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Discovered { device_id, .. }
            | Self::FullTopicChanged { device_id, .. }
            | Self::LivenessChanged { device_id, .. } => device_id,
        }
    }

    /// Returns `true` if this event reports a newly registered device.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Discovered { .. })
    }

    /// Returns `true` if this is a liveness event.
    #[must_use]
    pub fn is_liveness(&self) -> bool {
        matches!(self, Self::LivenessChanged { .. })
    }

    /// Creates a discovered event.
    #[must_use]
    pub fn discovered(device_id: DeviceId, full_topic: TopicTemplate) -> Self {
        Self::Discovered {
            device_id,
            full_topic,
        }
    }

    /// Creates a template change event.
    #[must_use]
    pub fn full_topic_changed(device_id: DeviceId, full_topic: TopicTemplate) -> Self {
        Self::FullTopicChanged {
            device_id,
            full_topic,
        }
    }

    /// Creates a liveness event from a raw last-will value.
    #[must_use]
    pub fn liveness_changed(device_id: DeviceId, lwt: impl Into<String>) -> Self {
        let lwt = lwt.into();
        Self::LivenessChanged {
            device_id,
            online: lwt == LWT_ONLINE,
            lwt,
        }
    }
}
