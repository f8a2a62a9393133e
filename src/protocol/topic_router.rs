// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription table and message routing.
//!
//! The [`TopicRouter`] is the transport-owned map from topic filter to
//! handler. Registration and the reconnect path both go through its lock, so
//! a device subscribing while a reconnect re-registers everything never
//! loses a filter.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: tasmota/desk/POWER → ON
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!     every filter matching the topic ("tasmota/desk/POWER")
//!                     ↓
//!           handler(&Message) (lock released)
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Message, MessageHandler, topic_matches};

/// Routes inbound messages to the handlers of matching filters.
#[derive(Default)]
pub struct TopicRouter {
    /// Map from topic filter to its handler.
    subscribers: Mutex<HashMap<String, MessageHandler>>,
}

impl TopicRouter {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `filter`.
    ///
    /// Returns `true` if a previous handler for the same filter was replaced.
    pub fn register(&self, filter: impl Into<String>, handler: MessageHandler) -> bool {
        let filter = filter.into();
        tracing::debug!(filter = %filter, "Registering subscription");
        self.subscribers.lock().insert(filter, handler).is_some()
    }

    /// Removes the handler for `filter`.
    ///
    /// Returns `true` if the filter was registered.
    pub fn unregister(&self, filter: &str) -> bool {
        tracing::debug!(filter = %filter, "Removing subscription");
        self.subscribers.lock().remove(filter).is_some()
    }

    /// Returns every registered filter.
    ///
    /// The lock is held for the duration of the snapshot only.
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        self.subscribers.lock().keys().cloned().collect()
    }

    /// Runs `f` on every registered filter while holding the table lock.
    ///
    /// Used by the reconnect path so that no registration interleaves with
    /// the re-subscription pass.
    pub fn for_each_filter(&self, mut f: impl FnMut(&str)) {
        let subscribers = self.subscribers.lock();
        for filter in subscribers.keys() {
            f(filter);
        }
    }

    /// Delivers `message` to every handler whose filter matches its topic.
    ///
    /// Handlers are invoked after the lock is released, so a handler may
    /// register further subscriptions. Returns the number of handlers called.
    pub fn route(&self, message: &Message) -> usize {
        let handlers: Vec<MessageHandler> = {
            let subscribers = self.subscribers.lock();
            subscribers
                .iter()
                .filter(|(filter, _)| topic_matches(filter, message.topic()))
                .map(|(_, handler)| handler.clone())
                .collect()
        };

        if handlers.is_empty() {
            tracing::trace!(topic = %message.topic(), "No subscription for topic");
        }

        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    /// Returns the number of registered filters.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("filters", &self.filters())
            .finish()
    }
}
