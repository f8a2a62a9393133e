// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.
//!
//! [`LoopbackTransport`] behaves like a broker that every participant shares:
//! publishes are delivered to matching subscriptions in the same call and
//! are appended to a log. It backs offline demos and the test suite.

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use super::{ConnectionStatus, Message, MessageHandler, QoS, TopicRouter, Transport};

/// A publish recorded by [`LoopbackTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Topic the message was published on.
    pub topic: String,
    /// UTF-8 payload.
    pub payload: String,
    /// Requested delivery guarantee.
    pub qos: QoS,
    /// Time of the publish on the tokio clock.
    pub at: Instant,
}

/// An in-process bus with a publish log.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use smartpanel::protocol::{LoopbackTransport, Message, QoS, Transport};
///
/// let bus = LoopbackTransport::new();
/// bus.subscribe("desk/#", Arc::new(|msg: &Message| {
///     assert_eq!(msg.topic(), "desk/LWT");
/// }));
/// bus.inject("desk/LWT", "Online");
///
/// bus.publish("desk/cmnd/Power1", "?", QoS::ExactlyOnce);
/// assert_eq!(bus.published_on("desk/cmnd/Power1"), vec!["?".to_string()]);
/// ```
#[derive(Debug)]
pub struct LoopbackTransport {
    router: TopicRouter,
    log: Mutex<Vec<Published>>,
    status: watch::Sender<ConnectionStatus>,
}

impl LoopbackTransport {
    /// Creates a connected loopback bus.
    #[must_use]
    pub fn new() -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connected);
        Self {
            router: TopicRouter::new(),
            log: Mutex::new(Vec::new()),
            status,
        }
    }

    /// Delivers a message to matching subscriptions without logging it,
    /// as if a device had published it.
    ///
    /// Returns the number of handlers invoked.
    pub fn inject(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.router.route(&Message::new(topic, payload))
    }

    /// Sets the reported connection status.
    pub fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    /// Returns a copy of the publish log.
    #[must_use]
    pub fn published(&self) -> Vec<Published> {
        self.log.lock().clone()
    }

    /// Returns and clears the publish log.
    pub fn take_published(&self) -> Vec<Published> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Returns the payloads published on `topic`, oldest first.
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }

    /// Returns the registered filters.
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        self.router.filters()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn subscribe(&self, filter: &str, handler: MessageHandler) {
        self.router.register(filter, handler);
    }

    fn unsubscribe(&self, filter: &str) {
        self.router.unregister(filter);
    }

    fn publish(&self, topic: &str, payload: &str, qos: QoS) {
        tracing::debug!(topic = %topic, payload = %payload, "Loopback publish");
        self.log.lock().push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            at: Instant::now(),
        });
        self.router.route(&Message::new(topic, payload));
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn publish_is_logged_and_routed() {
        let bus = LoopbackTransport::new();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe(
            "a/+",
            Arc::new(move |_msg: &Message| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.publish("a/b", "x", QoS::AtMostOnce);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let log = bus.published();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].topic, "a/b");
        assert_eq!(log[0].qos, QoS::AtMostOnce);
    }

    #[tokio::test]
    async fn inject_is_not_logged() {
        let bus = LoopbackTransport::new();
        bus.subscribe("a", Arc::new(|_msg: &Message| {}));
        assert_eq!(bus.inject("a", "1"), 1);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn take_published_clears_log() {
        let bus = LoopbackTransport::new();
        bus.publish("x", "1", QoS::ExactlyOnce);
        assert_eq!(bus.take_published().len(), 1);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn status_is_observable() {
        let bus = LoopbackTransport::new();
        let mut rx = bus.watch_status();
        assert_eq!(bus.status(), ConnectionStatus::Connected);

        bus.set_status(ConnectionStatus::Disconnected);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = LoopbackTransport::new();
        bus.subscribe("a", Arc::new(|_msg: &Message| {}));
        bus.unsubscribe("a");
        assert_eq!(bus.inject("a", "1"), 0);
        assert!(bus.filters().is_empty());
    }
}
