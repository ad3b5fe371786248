// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted device record.

use serde::{Deserialize, Serialize};

use crate::pattern::TopicTemplate;

use super::DeviceId;

/// The persisted part of a device: its identifier and topic template.
///
/// Everything else a [`Device`](super::Device) tracks (liveness, endpoint
/// values, attributes) is rebuilt from traffic after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// The device topic.
    pub id: DeviceId,
    /// The device's `FullTopic` template.
    pub full_topic: TopicTemplate,
}

impl DeviceRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(id: impl Into<DeviceId>, full_topic: impl Into<TopicTemplate>) -> Self {
        Self {
            id: id.into(),
            full_topic: full_topic.into(),
        }
    }
}
