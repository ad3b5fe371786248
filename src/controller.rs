// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet controller wiring the routing core to a transport and a store.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::command::{Command, CommandPublisher, DeviceCommand};
use crate::config::FleetConfig;
use crate::device::Device;
use crate::discovery::DiscoveryEngine;
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, EventBus};
use crate::protocol::Transport;
use crate::registry::DeviceRegistry;
use crate::router::MessageRouter;
use crate::store::DeviceStore;
use crate::types::TelePeriod;

/// Entry point for managing a Tasmota fleet.
///
/// The controller owns the registry, discovery engine and router, and is
/// the handle through which device actions are issued. Nothing is global:
/// everything that needs to reach the fleet gets a reference to it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tasmota_fleet::FleetController;
/// use tasmota_fleet::config::FleetConfig;
/// use tasmota_fleet::protocol::MemoryTransport;
/// use tasmota_fleet::store::MemoryStore;
///
/// # fn main() -> tasmota_fleet::Result<()> {
/// let transport = Arc::new(MemoryTransport::new());
/// let controller = FleetController::new(
///     FleetConfig::default(),
///     transport.clone(),
///     Arc::new(MemoryStore::new()),
/// )?;
/// controller.start()?;
///
/// transport.deliver("stat/lamp1/RESULT", br#"{"FullTopic":"%prefix%/%topic%/"}"#);
/// assert!(controller.device("lamp1").is_ok());
/// # Ok(())
/// # }
/// ```
pub struct FleetController {
    config: FleetConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<DeviceRegistry>,
    publisher: CommandPublisher,
    router: MessageRouter,
    events: EventBus,
}

impl FleetController {
    /// Creates a controller, loading every stored device into the registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the stored devices cannot be read.
    pub fn new(
        config: FleetConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn DeviceStore>,
    ) -> Result<Self> {
        let registry = Arc::new(DeviceRegistry::new());
        let loaded = registry.load(store.find_all()?);
        tracing::info!(devices = loaded, "Loaded stored devices");

        let publisher = CommandPublisher::new(Arc::clone(&transport));
        let events = EventBus::new();
        let discovery = Arc::new(DiscoveryEngine::new(
            &config.patterns,
            Arc::clone(&registry),
            store,
            publisher.clone(),
            events.clone(),
        ));
        let router = MessageRouter::new(Arc::clone(&registry), discovery);

        Ok(Self {
            config,
            transport,
            registry,
            publisher,
            router,
            events,
        })
    }

    /// Connects to the configured broker and starts routing.
    ///
    /// Devices are persisted to `store_path` when configured, otherwise kept
    /// in memory.
    ///
    /// # Errors
    ///
    /// Returns error if the broker connection fails or the stored devices
    /// cannot be read.
    #[cfg(feature = "mqtt")]
    pub async fn connect(config: FleetConfig) -> Result<Self> {
        use crate::protocol::MqttBrokerBuilder;
        use crate::store::{JsonFileStore, MemoryStore};

        let broker = MqttBrokerBuilder::from_config(&config.broker)
            .build()
            .await?;
        let store: Arc<dyn DeviceStore> = match &config.store_path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };

        let controller = Self::new(config, Arc::new(broker), store)?;
        controller.start()?;
        Ok(controller)
    }

    /// Subscribes the router to the configured topic filters.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the subscription cannot be requested.
    pub fn start(&self) -> Result<()> {
        self.transport
            .subscribe(&self.config.subscriptions, self.router.message_handler())?;
        tracing::info!(
            filters = self.config.subscriptions.len(),
            devices = self.registry.len(),
            "Fleet controller started"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the configuration the controller was created with.
    #[must_use]
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Returns the message router.
    #[must_use]
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Subscribes to fleet events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Returns the last-will topics still waiting for a `FullTopic` reply.
    #[must_use]
    pub fn pending_lwts(&self) -> Vec<String> {
        self.router.discovery().pending().snapshot()
    }

    /// Looks up a registered device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn device(&self, id: &str) -> Result<Arc<Device>> {
        self.registry
            .find_by_id(id)
            .ok_or_else(|| Error::DeviceNotFound(id.into()))
    }

    // =========================================================================
    // Device Actions
    // =========================================================================

    /// Publishes a raw command to a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn publish(&self, id: &str, command: &str, value: &str) -> Result<()> {
        let device = self.device(id)?;
        self.publisher.publish(&device, command, value);
        Ok(())
    }

    /// Sends a typed command to a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn send(&self, id: &str, command: &impl Command) -> Result<()> {
        let device = self.device(id)?;
        self.publisher.send(&device, command);
        Ok(())
    }

    /// Reboots a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn restart(&self, id: &str) -> Result<()> {
        tracing::info!(device = %id, "Restarting device");
        self.send(id, &DeviceCommand::Restart)
    }

    /// Renames a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn set_device_name(&self, id: &str, name: impl Into<String>) -> Result<()> {
        self.send(id, &DeviceCommand::DeviceName(name.into()))
    }

    /// Sets a device's telemetry period, then asks for its full status so
    /// the new value is reflected in the attributes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if `seconds` is outside 10-3600, or
    /// `Error::DeviceNotFound` if no device has this identifier.
    pub fn set_tele_period(&self, id: &str, seconds: u16) -> Result<()> {
        let period = TelePeriod::new(seconds)?;
        let device = self.device(id)?;
        self.publisher
            .send(&device, &DeviceCommand::TelePeriod(period));
        self.publisher.send(&device, &DeviceCommand::Status(0));
        Ok(())
    }

    /// Re-sends the initial query to a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this identifier.
    pub fn refresh(&self, id: &str) -> Result<()> {
        let device = self.device(id)?;
        self.publisher.initial_query(&device);
        Ok(())
    }
}

impl std::fmt::Debug for FleetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetController")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
