// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for fleet changes.
//!
//! This module provides a pub/sub event system for notifying subscribers about
//! discovered devices, template changes and liveness transitions. The
//! [`EventBus`] uses tokio's broadcast channel to allow multiple subscribers
//! to receive events.
//!
//! # Examples
//!
//! ```
//! use tasmota_fleet::device::DeviceId;
//! use tasmota_fleet::event::{DeviceEvent, EventBus};
//!
//! let bus = EventBus::new();
//!
//! // Subscribe to events
//! let mut rx = bus.subscribe();
//!
//! // Publish an event
//! bus.publish(DeviceEvent::liveness_changed(DeviceId::new("lamp1"), "Online"));
//! ```

mod device_event;
mod event_bus;

pub use device_event::DeviceEvent;
pub use event_bus::EventBus;
