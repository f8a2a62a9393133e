// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use smartpanel::config::PanelConfig;
use smartpanel::panel::Panel;
use smartpanel::protocol::{ConnectionStatus, Message, MqttBroker, QoS, Transport};
use smartpanel::types::PowerState;
use smartpanel::{ConnectionError, Error, ProtocolError};
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

    // Give the broker time to bind before clients connect
    sleep(Duration::from_millis(500)).await;
}

fn local_broker(port: u16) -> MqttBroker {
    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .retry_interval(Duration::from_millis(200))
        .build()
        .unwrap()
}

// ============================================================================
// Broker Connection Tests
// ============================================================================

mod broker_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = local_broker(port);
        let result = broker.wait_connected(Duration::from_secs(5)).await;

        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
        assert!(broker.is_connected());
        assert_eq!(broker.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn status_transition_is_observable() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = local_broker(port);
        let mut status = broker.watch_status();
        assert_eq!(*status.borrow(), ConnectionStatus::Pending);

        let reached = tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| *s == ConnectionStatus::Connected),
        )
        .await;
        assert!(reached.is_ok());
    }

    #[tokio::test]
    async fn connection_refused() {
        // Nothing listens on this port
        let port = get_test_port();

        let broker = local_broker(port);
        let result = broker.wait_connected(Duration::from_secs(5)).await;

        match result {
            Err(ProtocolError::Connection(ConnectionError::Refused { host, port: p })) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("expected refused, got {other:?}"),
        }
        assert_eq!(broker.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn host_unresolvable() {
        let broker = MqttBroker::builder()
            .host("nonexistent.invalid")
            .retry_interval(Duration::from_secs(1))
            .build()
            .unwrap();

        let result = broker.wait_connected(Duration::from_secs(15)).await;

        assert!(
            matches!(
                result,
                Err(ProtocolError::Connection(ConnectionError::HostUnresolvable { ref host }))
                    if host == "nonexistent.invalid"
            ),
            "expected unresolvable host, got {result:?}"
        );
    }

    #[tokio::test]
    async fn disconnect_stops_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = local_broker(port);
        broker.wait_connected(Duration::from_secs(5)).await.unwrap();

        broker.disconnect().unwrap();
        assert!(!broker.is_connected());
    }
}

// ============================================================================
// Subscription Tests
// ============================================================================

mod subscriptions {
    use super::*;

    #[tokio::test]
    async fn subscriptions_survive_connect() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = local_broker(port);
        broker.subscribe("tasmota/desk/LWT", Arc::new(|_msg: &Message| {}));
        broker.subscribe("tasmota/desk/POWER", Arc::new(|_msg: &Message| {}));

        broker.wait_connected(Duration::from_secs(5)).await.unwrap();
        assert_eq!(broker.subscription_count(), 2);

        broker.unsubscribe("tasmota/desk/POWER");
        assert_eq!(broker.subscription_count(), 1);
    }

    #[tokio::test]
    async fn subscription_made_before_connect_receives_publishes() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let listener = local_broker(port);
        listener.subscribe(
            "tasmota/+/POWER",
            Arc::new(move |msg: &Message| {
                let _ = tx.send((msg.topic().to_string(), msg.payload_lossy().to_string()));
            }),
        );
        listener.wait_connected(Duration::from_secs(5)).await.unwrap();

        let device = local_broker(port);
        device.wait_connected(Duration::from_secs(5)).await.unwrap();

        // Repeat until the SUBSCRIBE has been acknowledged
        let mut received = None;
        for _ in 0..50 {
            device.publish("tasmota/desk/POWER", "ON", QoS::AtLeastOnce);
            if let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
                received = Some(msg);
                break;
            }
        }

        assert_eq!(
            received,
            Some(("tasmota/desk/POWER".to_string(), "ON".to_string()))
        );
    }
}

// ============================================================================
// Panel Over MQTT Tests
// ============================================================================

mod panel_over_mqtt {
    use super::*;

    fn config(port: u16) -> PanelConfig {
        PanelConfig::from_json_str(&format!(
            r#"{{
                "mqtt": {{ "host": "127.0.0.1", "port": {port}, "connect_timeout_secs": 5 }},
                "devices": {{ "Desk": {{ "type": "TASMOTA", "topic": "tasmota/desk" }} }}
            }}"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn panel_connects_and_subscribes() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let panel = Panel::connect(&config(port)).await.unwrap();

        assert_eq!(panel.connection_status(), ConnectionStatus::Connected);
        assert!(panel.device("Desk").is_some());
    }

    #[tokio::test]
    async fn power_report_reaches_device() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let mut panel = Panel::connect(&config(port)).await.unwrap();
        let device = local_broker(port);
        device.wait_connected(Duration::from_secs(5)).await.unwrap();

        let observed_on =
            |panel: &Panel| panel.device("Desk").is_some_and(|d| d.observed() == PowerState::On);

        for _ in 0..50 {
            if observed_on(&panel) {
                break;
            }
            device.publish("tasmota/desk/POWER", "ON", QoS::AtLeastOnce);
            while let Ok(true) = tokio::time::timeout(Duration::from_millis(100), panel.step()).await {
                if observed_on(&panel) {
                    break;
                }
            }
        }

        let desk = panel.device("Desk").unwrap();
        assert_eq!(desk.observed(), PowerState::On);
        assert_eq!(desk.expected(), PowerState::On);
        assert!(desk.matches());
    }

    #[tokio::test]
    async fn unreachable_broker_is_not_fatal() {
        let port = get_test_port();

        let panel = Panel::connect(&config(port)).await.unwrap();

        assert_ne!(panel.connection_status(), ConnectionStatus::Connected);
        let desk = panel.device("Desk").unwrap();
        assert!(!desk.matches());
    }

    #[tokio::test]
    async fn empty_host_is_rejected() {
        let mut config = config(1883);
        config.mqtt.host = String::new();

        let result = Panel::connect(&config).await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::InvalidAddress(_)))
        ));
    }
}
