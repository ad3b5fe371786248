// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing of inbound messages.
//!
//! ```text
//! (topic, payload bytes)
//!     ↓ decode (non-UTF-8 dropped)
//! registry.find_by_topic(topic)
//!     ├─ hit:  last_seen = now
//!     │        ├─ */LWT    → discovery.on_device_lwt
//!     │        └─ other    → PayloadHandler
//!     └─ miss: ├─ */LWT                → discovery.on_unmatched_lwt
//!              ├─ */RESULT, */FULLTOPIC → discovery.on_reply (needs FullTopic)
//!              └─ other                 → dropped
//! ```
//!
//! Routing never fails: anything that cannot be attributed to a device is
//! logged and dropped.

mod handler;
mod payload;

pub use handler::{AttributeCollector, PayloadHandler};
pub use payload::{FullTopicReply, Payload};

use std::sync::Arc;

use crate::device::{DeviceId, ENDPOINT_LWT};
use crate::discovery::{DiscoveryEngine, UnmatchedLwt};
use crate::registry::DeviceRegistry;

/// Suffixes of topics that may carry a `FullTopic` answer.
const REPLY_SUFFIXES: [&str; 2] = ["RESULT", "FULLTOPIC"];

/// What [`MessageRouter::route`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Forwarded to the payload handler of a registered device.
    Device(DeviceId),
    /// Last-will of a registered device.
    Liveness(DeviceId),
    /// Last-will of an unknown device; carries the number of probes sent.
    Probe(usize),
    /// A `FullTopic` reply resolved a device.
    Resolved(DeviceId),
    /// Not attributable to any device.
    Dropped,
}

/// Dispatches inbound messages to devices and the discovery engine.
///
/// `route` takes `&self` and may be called concurrently from any number of
/// transport callbacks.
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<DeviceRegistry>,
    discovery: Arc<DiscoveryEngine>,
    handler: Arc<dyn PayloadHandler>,
}

impl MessageRouter {
    /// Creates a router using the default [`AttributeCollector`].
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>, discovery: Arc<DiscoveryEngine>) -> Self {
        Self::with_handler(registry, discovery, Arc::new(AttributeCollector))
    }

    /// Creates a router forwarding device payloads to `handler`.
    #[must_use]
    pub fn with_handler(
        registry: Arc<DeviceRegistry>,
        discovery: Arc<DiscoveryEngine>,
        handler: Arc<dyn PayloadHandler>,
    ) -> Self {
        Self {
            registry,
            discovery,
            handler,
        }
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Returns the discovery engine.
    #[must_use]
    pub fn discovery(&self) -> &Arc<DiscoveryEngine> {
        &self.discovery
    }

    /// Routes one inbound message.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Route {
        let Some(payload) = Payload::from_bytes(payload) else {
            tracing::debug!(topic = %topic, "Non-UTF-8 payload dropped");
            return Route::Dropped;
        };

        let is_lwt = topic.ends_with(ENDPOINT_LWT);

        if let Some((device, parsed)) = self.registry.find_by_topic(topic) {
            device.touch();
            if is_lwt {
                self.discovery.on_device_lwt(&device, &payload);
                return Route::Liveness(device.id().clone());
            }
            tracing::debug!(topic = %topic, device = %device.id(), "Routing to device");
            self.handler.handle(&device, &parsed, &payload);
            return Route::Device(device.id().clone());
        }

        if is_lwt {
            return match self.discovery.on_unmatched_lwt(topic, &payload) {
                UnmatchedLwt::Probed(sent) => Route::Probe(sent),
                UnmatchedLwt::Registered(device) => Route::Liveness(device.id().clone()),
            };
        }

        if REPLY_SUFFIXES.iter().any(|suffix| topic.ends_with(suffix)) {
            let Ok(reply) = payload.decode::<FullTopicReply>() else {
                tracing::trace!(topic = %topic, "Reply without FullTopic dropped");
                return Route::Dropped;
            };
            return self
                .discovery
                .on_reply(topic, &reply)
                .map_or(Route::Dropped, |resolution| {
                    Route::Resolved(resolution.device().id().clone())
                });
        }

        tracing::trace!(topic = %topic, "Unattributed topic dropped");
        Route::Dropped
    }

    /// Returns a transport callback routing into this router.
    #[must_use]
    pub fn message_handler(&self) -> crate::protocol::MessageHandler {
        let router = self.clone();
        Arc::new(move |topic: &str, payload: &[u8]| {
            router.route(topic, payload);
        })
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("devices", &self.registry.len())
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}
