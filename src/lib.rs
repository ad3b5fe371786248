// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `tasmota_fleet` - Discovery and message routing for Tasmota fleets.
//!
//! Tasmota devices publish on topics built from a per-device `FullTopic`
//! template such as `%prefix%/%topic%/`. This library watches an MQTT
//! broker, discovers devices from their last-will messages, learns each
//! device's template and routes every later message to the device it
//! belongs to.
//!
//! # Discovery
//!
//! 1. An unknown last-will topic (`tele/lamp1/LWT`) is matched against the
//!    configured templates; each candidate device topic is asked for its
//!    `FullTopic` (`cmnd/lamp1/FullTopic`).
//! 2. The `FullTopic` reply (`stat/lamp1/RESULT`) registers and persists
//!    the device, then sends it the initial query burst.
//! 3. From then on every message matching the device template is routed
//!    to the device and merged into its attributes.
//!
//! # Quick Start
//!
//! ```no_run
//! use tasmota_fleet::FleetController;
//! use tasmota_fleet::config::FleetConfig;
//!
//! #[tokio::main]
//! async fn main() -> tasmota_fleet::Result<()> {
//!     let config = FleetConfig::load("fleet.json")?;
//!     let controller = FleetController::connect(config).await?;
//!
//!     let mut events = controller.subscribe_events();
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Without a Broker
//!
//! The routing core is transport-agnostic. [`protocol::MemoryTransport`]
//! records publications and lets messages be injected directly:
//!
//! ```
//! use std::sync::Arc;
//! use tasmota_fleet::FleetController;
//! use tasmota_fleet::config::FleetConfig;
//! use tasmota_fleet::protocol::MemoryTransport;
//! use tasmota_fleet::store::MemoryStore;
//!
//! # fn main() -> tasmota_fleet::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let controller = FleetController::new(
//!     FleetConfig::default(),
//!     transport.clone(),
//!     Arc::new(MemoryStore::new()),
//! )?;
//! controller.start()?;
//!
//! transport.deliver("tele/lamp1/LWT", b"Online");
//! assert_eq!(transport.published_topics(), vec!["cmnd/lamp1/FullTopic"]);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
mod controller;
pub mod device;
pub mod discovery;
pub mod error;
pub mod event;
pub mod pattern;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod store;
pub mod types;

pub use command::{Command, CommandPublisher, DeviceCommand};
pub use config::{BrokerConfig, FleetConfig};
pub use controller::FleetController;
pub use device::{Device, DeviceId, DeviceRecord};
pub use discovery::DiscoveryEngine;
pub use error::{
    ConfigError, Error, ParseError, PatternError, ProtocolError, Result, StoreError, ValueError,
};
pub use event::{DeviceEvent, EventBus};
pub use pattern::{TopicMatcher, TopicTemplate};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder};
pub use protocol::{MemoryTransport, Transport};
pub use registry::DeviceRegistry;
pub use router::{MessageRouter, Route};
pub use store::{DeviceStore, JsonFileStore, MemoryStore};
pub use types::TelePeriod;
