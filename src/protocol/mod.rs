// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message bus transport.
//!
//! Device logic only ever talks to a [`Transport`]: it subscribes topic
//! filters with a handler, publishes fire-and-forget messages, and reads the
//! connection status. Two implementations are provided:
//!
//! - [`MqttBroker`]: a rumqttc connection that resubscribes every registered
//!   filter after each (re)connect
//! - [`LoopbackTransport`]: an in-process bus that records every publish
//!
//! Handlers run on whatever thread the transport delivers on. The panel's
//! handlers only hand messages off to its event loop (see
//! [`Mailbox`](crate::panel::Mailbox)).

mod loopback;
#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_filter;
mod topic_router;

pub use loopback::{LoopbackTransport, Published};
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use topic_filter::topic_matches;
pub use topic_router::TopicRouter;

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ValueError;

/// An inbound bus message.
///
/// # Examples
///
/// ```
/// use smartpanel::protocol::Message;
///
/// let msg = Message::new("desk/LWT", "Online");
/// assert_eq!(msg.topic(), "desk/LWT");
/// assert_eq!(msg.payload(), b"Online");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the topic the message was published on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload as UTF-8, if it is valid.
    #[must_use]
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Returns the payload for log output, lossily decoded.
    #[must_use]
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// MQTT delivery guarantee for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Acknowledged delivery.
    AtLeastOnce,
    /// Assured single delivery. All device commands use this level.
    #[default]
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(ValueError::OutOfRange {
                min: 0,
                max: 2,
                actual: u16::from(value),
            }),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

#[cfg(feature = "mqtt")]
impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::AtMostOnce,
            QoS::AtLeastOnce => Self::AtLeastOnce,
            QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// Broker connection status, consumed by the presentation layer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// No connection attempt has completed yet.
    #[default]
    Pending,
    /// The broker acknowledged the connection.
    Connected,
    /// The connection was lost or could not be established.
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Callback invoked for every inbound message matching a subscription.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// The bus as seen by device logic.
///
/// All methods are fire-and-forget; failures are logged by the
/// implementation and never surfaced to the caller.
pub trait Transport: Send + Sync {
    /// Registers `handler` for `filter`, replacing any previous handler for
    /// the same filter.
    ///
    /// The transport re-issues the subscription after every reconnect.
    fn subscribe(&self, filter: &str, handler: MessageHandler);

    /// Removes the subscription for `filter`, if any.
    fn unsubscribe(&self, filter: &str);

    /// Publishes `payload` on `topic`.
    fn publish(&self, topic: &str, payload: &str, qos: QoS);

    /// Returns the current connection status.
    fn status(&self) -> ConnectionStatus;

    /// Returns a receiver that observes connection status transitions.
    fn watch_status(&self) -> watch::Receiver<ConnectionStatus>;
}
