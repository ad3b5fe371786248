// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tasmota_fleet::command::INITIAL_COMMANDS;
use tasmota_fleet::config::{BrokerConfig, FleetConfig};
use tasmota_fleet::device::DeviceRecord;
use tasmota_fleet::protocol::{MqttBroker, MqttBrokerBuilder, Transport};
use tasmota_fleet::store::MemoryStore;
use tasmota_fleet::{FleetController, ProtocolError};
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    sleep(Duration::from_millis(500)).await;
}

async fn connect(port: u16) -> MqttBroker {
    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .await
        .expect("connect to mock broker")
}

// ============================================================================
// Broker Connection
// ============================================================================

mod broker_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;

        assert!(broker.is_connected());
        assert_eq!(broker.host(), "127.0.0.1");
        assert_eq!(broker.port(), port);
        assert!(!broker.has_credentials());
    }

    #[tokio::test]
    async fn connect_from_config() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..BrokerConfig::default()
        };
        let broker = MqttBrokerBuilder::from_config(&config)
            .build()
            .await
            .expect("connect to mock broker");

        assert!(broker.is_connected());
    }

    #[tokio::test]
    async fn unreachable_broker_times_out() {
        let port = get_test_port();

        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_millis(300))
            .build()
            .await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn disconnect_clears_state() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;
        broker.disconnect().await.expect("disconnect");

        assert!(!broker.is_connected());
        assert!(matches!(
            broker.publish("cmnd/lamp1/restart", b"1"),
            Err(ProtocolError::NotConnected)
        ));
    }
}

// ============================================================================
// Transport Operations
// ============================================================================

mod transport {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn subscribe_and_publish_are_accepted() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;
        let filters = vec!["tele/+/LWT".to_string(), "stat/+/RESULT".to_string()];

        broker
            .subscribe(&filters, Arc::new(|_: &str, _: &[u8]| {}))
            .expect("subscribe");
        broker
            .publish("cmnd/lamp1/FullTopic", b"")
            .expect("publish");
    }

    #[tokio::test]
    async fn controller_connects_and_starts() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = FleetConfig {
            broker: BrokerConfig {
                host: "127.0.0.1".to_string(),
                port,
                ..BrokerConfig::default()
            },
            ..FleetConfig::default()
        };

        let controller = FleetController::connect(config)
            .await
            .expect("controller connects");

        assert!(controller.registry().is_empty());
        assert!(controller.pending_lwts().is_empty());
    }

    #[tokio::test]
    async fn restored_fleet_coming_online_sends_every_initial_query() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;
        let records = (0..12).map(|n| DeviceRecord::new(format!("dev{n}"), "%prefix%/%topic%/"));
        let controller = FleetController::new(
            FleetConfig::default(),
            Arc::new(broker.clone()),
            Arc::new(MemoryStore::with_records(records)),
        )
        .expect("controller");

        for n in 0..12 {
            controller
                .router()
                .route(&format!("tele/dev{n}/LWT"), b"Online");
        }

        let expected = u64::try_from(12 * INITIAL_COMMANDS.len()).unwrap();
        for _ in 0..100 {
            if broker.sent() == expected {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(broker.sent(), expected);
        assert_eq!(broker.queued(), 0);
    }
}
