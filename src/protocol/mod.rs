// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message transport for the fleet controller.
//!
//! The routing core only needs to subscribe to topic filters and publish
//! payloads; both sit behind the [`Transport`] trait.
//!
//! # Transports
//!
//! - [`MqttBroker`]: a rumqttc connection to a real broker
//! - [`MemoryTransport`]: an in-process loopback that records publishes and
//!   lets callers inject messages

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt_broker;

pub use memory::MemoryTransport;
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder};

use std::sync::Arc;

use crate::error::ProtocolError;

/// Topic filters subscribed to by default.
///
/// Covers the standard `prefix/topic` layout and the reversed
/// `topic/prefix` layout for the three Tasmota prefixes.
pub const DEFAULT_SUBSCRIPTIONS: [&str; 6] = [
    "tele/#", "stat/#", "cmnd/#", "+/tele/#", "+/stat/#", "+/cmnd/#",
];

/// Callback invoked for every inbound message with its topic and raw payload.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Publish/subscribe capability the routing core depends on.
///
/// Implementations must not block: publishing is fire-and-forget and there
/// is no acknowledgement tracking.
pub trait Transport: Send + Sync {
    /// Subscribes to `filters`, delivering every matching message to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if a subscription request cannot be queued.
    fn subscribe(&self, filters: &[String], handler: MessageHandler) -> Result<(), ProtocolError>;

    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be queued.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ProtocolError>;
}

/// Returns [`DEFAULT_SUBSCRIPTIONS`] as owned strings.
#[must_use]
pub fn default_subscriptions() -> Vec<String> {
    DEFAULT_SUBSCRIPTIONS.iter().map(ToString::to_string).collect()
}
