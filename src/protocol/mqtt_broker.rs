// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection.
//!
//! A single [`MqttBroker`] is shared by every device on the panel. It owns
//! the subscription table and re-issues every subscription after each
//! connection acknowledgement, so device code never resubscribes itself.
//!
//! Connection failures are not fatal: the rumqttc event loop keeps polling
//! in the background and the broker reconnects as soon as the host becomes
//! reachable.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use smartpanel::protocol::MqttBroker;
//!
//! # async fn example() -> smartpanel::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .build()?;
//!
//! if let Err(e) = broker.wait_connected(Duration::from_secs(5)).await {
//!     tracing::warn!(error = %e, "Broker not reachable yet, retrying in background");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use tokio::sync::watch;

use super::{ConnectionStatus, Message, MessageHandler, QoS, TopicRouter, Transport};
use crate::error::{ConnectionError, ProtocolError};

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capacity of the rumqttc request channel.
const REQUEST_CAPACITY: usize = 256;

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    retry_interval: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(60),
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// First outcome of a connection attempt, `None` while the attempt runs.
type Outcome = Option<Result<(), ConnectionError>>;

/// An MQTT broker connection shared by all devices.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`). The background event loop
/// stops once every clone has been dropped or [`disconnect`](Self::disconnect)
/// was called.
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing.
    client: AsyncClient,
    /// Filters to handlers; replayed on every ConnAck.
    router: TopicRouter,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status for the presentation layer.
    status: watch::Sender<ConnectionStatus>,
    /// Result of the latest connection attempt.
    outcome: watch::Sender<Outcome>,
    /// Set by `disconnect` so the event loop does not reconnect.
    stopping: AtomicBool,
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
        *self.inner.status.borrow() == ConnectionStatus::Connected
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

    /// Returns the number of registered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.router.subscription_count()
    }

    /// Waits for the outcome of the current connection attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Connection` if the attempt failed (the broker
    /// keeps retrying regardless), or `ProtocolError::Timeout` if no outcome
    /// arrived in time.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), ProtocolError> {
        let mut rx = self.inner.outcome.subscribe();

        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;

        let outcome = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))?
            .map_err(|_| ProtocolError::ChannelClosed("broker outcome".to_string()))?
            .clone();

        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(e.into()),
            None => Err(ProtocolError::ChannelClosed("broker outcome".to_string())),
        }
    }

    /// Disconnects from the broker and stops reconnecting.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.stopping.store(true, Ordering::Release);
        self.inner.client.try_disconnect()?;
        self.inner.status.send_replace(ConnectionStatus::Disconnected);
        Ok(())
    }
}

impl MqttBrokerInner {
    fn new(config: MqttBrokerConfig, client_id: &str, capacity: usize) -> (Self, EventLoop) {
        let mut mqtt_options = MqttOptions::new(client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, capacity);
        let (status, _) = watch::channel(ConnectionStatus::Pending);
        let (outcome, _) = watch::channel(None);

        let inner = Self {
            client,
            router: TopicRouter::new(),
            config,
            status,
            outcome,
            stopping: AtomicBool::new(false),
        };
        (inner, event_loop)
    }

    /// Marks the connection up and re-issues every registered filter.
    ///
    /// The status is published before the filters are walked, so a
    /// concurrent [`Transport::subscribe`] either sees `Connected` or has
    /// its filter replayed here. Returns the number of SUBSCRIBE requests
    /// queued.
    fn on_connected(&self) -> usize {
        self.status.send_replace(ConnectionStatus::Connected);
        self.outcome.send_replace(Some(Ok(())));

        let mut count = 0;
        self.router.for_each_filter(|filter| {
            match self.client.try_subscribe(filter, rumqttc::QoS::AtLeastOnce) {
                Ok(()) => count += 1,
                Err(e) => tracing::warn!(filter = %filter, error = %e, "Failed to resubscribe"),
            }
        });
        tracing::debug!(count, "Resubscribed after connect");
        count
    }

    fn on_failure(&self, error: ConnectionError) {
        let was = self.status.send_replace(ConnectionStatus::Disconnected);
        if was != ConnectionStatus::Disconnected {
            tracing::info!(error = %error, "MQTT connection lost");
        }
        self.outcome.send_replace(Some(Err(error)));
    }

    /// Maps a rumqttc failure onto the connection error taxonomy.
    async fn classify(&self, error: &rumqttc::ConnectionError) -> ConnectionError {
        let host = &self.config.host;
        let port = self.config.port;

        if let rumqttc::ConnectionError::Io(io) = error {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return ConnectionError::Refused {
                    host: host.clone(),
                    port,
                };
            }
            if tokio::net::lookup_host((host.as_str(), port)).await.is_err() {
                return ConnectionError::HostUnresolvable { host: host.clone() };
            }
        }
        ConnectionError::Failed(error.to_string())
    }
}

impl Transport for MqttBroker {
    fn subscribe(&self, filter: &str, handler: MessageHandler) {
        self.inner.router.register(filter, handler);
        if !self.is_connected() {
            tracing::debug!(filter = %filter, "Subscription deferred until connected");
            return;
        }
        if let Err(e) = self
            .inner
            .client
            .try_subscribe(filter, rumqttc::QoS::AtLeastOnce)
        {
            tracing::warn!(filter = %filter, error = %e, "Failed to queue subscription");
        }
    }

    fn unsubscribe(&self, filter: &str) {
        if self.inner.router.unregister(filter)
            && let Err(e) = self.inner.client.try_unsubscribe(filter)
        {
            tracing::warn!(filter = %filter, error = %e, "Failed to queue unsubscribe");
        }
    }

    fn publish(&self, topic: &str, payload: &str, qos: QoS) {
        tracing::debug!(topic = %topic, payload = %payload, "Publishing MQTT message");
        if let Err(e) = self
            .inner
            .client
            .try_publish(topic, qos.into(), false, payload.as_bytes().to_vec())
        {
            tracing::warn!(topic = %topic, error = %e, "Failed to queue publish");
        }
    }

    fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Builder for an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use smartpanel::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> smartpanel::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .credentials("panel", "secret")
///     .keep_alive(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
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

    /// Sets the keep-alive interval (default: 60 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the pause between reconnection attempts (default: 5 seconds).
    #[must_use]
    pub fn retry_interval(mut self, duration: Duration) -> Self {
        self.config.retry_interval = duration;
        self
    }

    /// Creates the broker and starts connecting in the background.
    ///
    /// Use [`MqttBroker::wait_connected`] to observe the first outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if the host is not set.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("smartpanel_{}_{}", std::process::id(), counter);

        let (inner, event_loop) = MqttBrokerInner::new(self.config, &client_id, REQUEST_CAPACITY);
        let inner = Arc::new(inner);

        tracing::info!(
            host = %inner.config.host,
            port = %inner.config.port,
            client_id = %client_id,
            "Connecting to MQTT broker"
        );

        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            handle_broker_events(event_loop, weak).await;
        });

        Ok(MqttBroker { inner })
    }
}

/// Drives the rumqttc event loop until the broker is dropped or disconnected.
async fn handle_broker_events(mut event_loop: EventLoop, broker: Weak<MqttBrokerInner>) {
    loop {
        let event = event_loop.poll().await;
        let Some(inner) = broker.upgrade() else {
            tracing::debug!("MQTT broker dropped, stopping event loop");
            break;
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::info!(?connack, host = %inner.config.host, "Connected to MQTT broker");
                inner.on_connected();
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = Message::new(publish.topic.clone(), publish.payload.to_vec());
                tracing::debug!(
                    topic = %message.topic(),
                    payload = %message.payload_lossy(),
                    "MQTT message received"
                );
                inner.router.route(&message);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker sent disconnect");
                inner.status.send_replace(ConnectionStatus::Disconnected);
            }
            Ok(_) => {}
            Err(e) => {
                if inner.stopping.load(Ordering::Acquire) {
                    tracing::debug!("MQTT event loop stopped after disconnect");
                    break;
                }
                let error = inner.classify(&e).await;
                tracing::warn!(error = %error, "MQTT connection error, will try again");
                inner.on_failure(error);

                let retry = inner.config.retry_interval;
                drop(inner);
                tokio::time::sleep(retry).await;
            }
        }
    }
}
