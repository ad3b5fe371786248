// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection for a Tasmota fleet.
//!
//! One connection carries the whole fleet: the controller subscribes to a
//! handful of wildcard filters and every inbound publish is handed to a
//! single [`MessageHandler`].
//!
//! # Examples
//!
//! ```no_run
//! use tasmota_fleet::protocol::MqttBroker;
//!
//! # async fn example() -> tasmota_fleet::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! if broker.is_connected() {
//!     println!("Connected to MQTT broker");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, Publish, QoS};
use tokio::sync::{mpsc, oneshot};

use crate::config::BrokerConfig;
use crate::error::ProtocolError;

use super::{MessageHandler, Transport};

/// Capacity of the channel between the event loop and the routing task.
const INBOUND_CAPACITY: usize = 1024;

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Connection settings resolved by the builder.
#[derive(Debug, Clone)]
struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// A persistent MQTT broker connection.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`). The handler runs on its
/// own routing task, never inside the event loop. Publishes are queued and
/// handed to the client by a writer task that waits for capacity, so a burst
/// of commands is delayed rather than dropped.
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    client: AsyncClient,
    handler: RwLock<Option<MessageHandler>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    config: MqttBrokerConfig,
    connected: AtomicBool,
    queued: AtomicUsize,
    sent: AtomicU64,
}

/// A publish waiting for the writer task.
struct Outbound {
    topic: String,
    payload: Vec<u8>,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns the number of publishes queued but not yet handed to the
    /// client.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.queued.load(Ordering::Acquire)
    }

    /// Returns the number of publishes handed to the client so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.inner.sent.load(Ordering::Acquire)
    }

    fn dispatch(&self, topic: &str, payload: &[u8]) {
        let handler = self.inner.handler.read().clone();
        match handler {
            Some(handler) => handler(topic, payload),
            None => tracing::trace!(topic = %topic, "No handler subscribed, message dropped"),
        }
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be sent.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        *self.inner.handler.write() = None;
        self.inner.client.disconnect().await?;
        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Transport for MqttBroker {
    fn subscribe(&self, filters: &[String], handler: MessageHandler) -> Result<(), ProtocolError> {
        *self.inner.handler.write() = Some(handler);
        for filter in filters {
            self.inner.client.try_subscribe(filter, QoS::AtMostOnce)?;
            tracing::debug!(filter = %filter, "Subscribed to filter");
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        self.inner.queued.fetch_add(1, Ordering::AcqRel);
        let outbound = Outbound {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        if self.inner.outbound.send(outbound).is_err() {
            self.inner.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(ProtocolError::NotConnected);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use tasmota_fleet::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> tasmota_fleet::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Creates a builder preset from configuration.
    #[must_use]
    pub fn from_config(config: &BrokerConfig) -> Self {
        let mut builder = Self::default()
            .host(config.host.clone())
            .port(config.port)
            .keep_alive(config.keep_alive())
            .connection_timeout(config.connection_timeout());
        if let Some(username) = &config.username {
            builder = builder.credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }
        builder
    }

    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("tasmota_fleet_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        // Every device answers the initial query in a burst.
        let (client, event_loop) = AsyncClient::new(mqtt_options, 256);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client: client.clone(),
                handler: RwLock::new(None),
                outbound: outbound_tx,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                queued: AtomicUsize::new(0),
                sent: AtomicU64::new(0),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();

        let broker_clone = broker.clone();
        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, inbound_tx, Some(connack_tx)).await;
        });

        let broker_clone = broker.clone();
        tokio::spawn(async move {
            route_inbound(broker_clone, inbound_rx).await;
        });

        let inner = Arc::downgrade(&broker.inner);
        tokio::spawn(async move {
            write_outbound(client, inner, outbound_rx).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(broker)
    }
}

/// Handles MQTT events for the broker connection.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    inbound_tx: mpsc::Sender<Publish>,
    connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = connack_tx;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                if inbound_tx.send(publish).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT broker event loop error");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
        }
    }
}

/// Runs the handler for inbound publishes, off the event loop.
async fn route_inbound(broker: MqttBroker, mut inbound_rx: mpsc::Receiver<Publish>) {
    while let Some(publish) = inbound_rx.recv().await {
        broker.dispatch(&publish.topic, &publish.payload);
    }
}

/// Hands queued publishes to the client in order, waiting for capacity.
async fn write_outbound(
    client: AsyncClient,
    inner: std::sync::Weak<MqttBrokerInner>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(Outbound { topic, payload }) = outbound_rx.recv().await {
        let result = client
            .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.queued.fetch_sub(1, Ordering::AcqRel);
        match result {
            Ok(()) => {
                inner.sent.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to publish queued command");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttBrokerBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_with_credentials() {
        let builder = MqttBrokerBuilder::default().credentials("user", "pass");
        let creds = builder.config.credentials.unwrap();
        assert_eq!(creds.0, "user");
        assert_eq!(creds.1, "pass");
    }

    #[test]
    fn builder_chain() {
        let builder = MqttBrokerBuilder::default()
            .host("192.168.1.50")
            .port(8883)
            .credentials("admin", "secret")
            .keep_alive(Duration::from_secs(45))
            .connection_timeout(Duration::from_secs(15));

        assert_eq!(builder.config.host, "192.168.1.50");
        assert_eq!(builder.config.port, 8883);
        assert!(builder.config.credentials.is_some());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(45));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(15));
    }

    #[test]
    fn builder_from_config() {
        let config = BrokerConfig {
            host: "broker.local".to_string(),
            port: 1884,
            username: Some("fleet".to_string()),
            password: None,
            keep_alive_secs: 60,
            connection_timeout_secs: 3,
        };
        let builder = MqttBrokerBuilder::from_config(&config);

        assert_eq!(builder.config.host, "broker.local");
        assert_eq!(builder.config.port, 1884);
        assert_eq!(
            builder.config.credentials,
            Some(("fleet".to_string(), String::new()))
        );
        assert_eq!(builder.config.keep_alive, Duration::from_secs(60));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(3));
    }

    #[test]
    fn builder_from_default_config_has_no_credentials() {
        let builder = MqttBrokerBuilder::from_config(&BrokerConfig::default());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.port, 1883);
    }

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttBrokerBuilder::default().build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
