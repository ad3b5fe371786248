// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of known devices.
//!
//! ```text
//! Topic: tele/lamp1/STATE
//!           ↓
//!   DeviceRegistry.find_by_topic()
//!           ↓
//!   snapshot of Arc<Device> (read lock released)
//!           ↓
//!   device.match_topic() for each device
//!           ↓
//!   first device whose parsed topic is its own id
//! ```
//!
//! Devices must not declare templates that let one device's topics parse as
//! another's identifier; when they do, the winner depends on iteration order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::{Device, DeviceId, DeviceRecord};
use crate::pattern::{ParsedTopic, TopicTemplate};

/// Concurrent map from device identifier to device.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Arc<Device>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let registry = Self::new();
        registry.load(records);
        registry
    }

    /// Inserts every record not already present; returns how many were added.
    pub fn load(&self, records: impl IntoIterator<Item = DeviceRecord>) -> usize {
        records
            .into_iter()
            .filter(|record| self.insert(record.clone()).is_some())
            .count()
    }

    /// Looks a device up by identifier.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.read().get(id).cloned()
    }

    /// Resolves which device a concrete topic belongs to.
    ///
    /// The device list is snapshotted first so matching runs without holding
    /// the lock.
    #[must_use]
    pub fn find_by_topic(&self, topic: &str) -> Option<(Arc<Device>, ParsedTopic)> {
        self.snapshot().into_iter().find_map(|device| {
            let parsed = device.match_topic(topic)?;
            Some((device, parsed))
        })
    }

    /// Adds a device unless one with the same identifier exists.
    ///
    /// Returns the new device, or `None` if the identifier was taken.
    pub fn insert(&self, record: DeviceRecord) -> Option<Arc<Device>> {
        let mut devices = self.devices.write();
        if devices.contains_key(&record.id) {
            return None;
        }

        let device = Arc::new(Device::new(record));
        devices.insert(device.id().clone(), Arc::clone(&device));
        tracing::debug!(device = %device.id(), "Device registered");
        Some(device)
    }

    /// Replaces a device's template.
    ///
    /// Returns `true` only if the device exists and the template differed.
    pub fn update(&self, id: &str, full_topic: TopicTemplate) -> bool {
        self.find_by_id(id)
            .is_some_and(|device| device.set_full_topic(full_topic))
    }

    /// Removes a device, returning it if it was present.
    pub fn remove(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.write().remove(id)
    }

    /// Returns a copy of the device list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Device>> {
        self.devices.read().values().cloned().collect()
    }

    /// Returns the identifiers of all devices.
    #[must_use]
    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.read().keys().cloned().collect()
    }

    /// Returns the number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns `true` if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
