// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for panel updates.

use tokio::sync::broadcast;

use super::PanelUpdate;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans panel updates out to every renderer.
///
/// Backed by a tokio broadcast channel of fixed capacity (default 256). A
/// subscriber that falls behind loses the oldest updates and sees
/// `RecvError::Lagged`; since every update is a full snapshot, the next one
/// repairs the tile.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<PanelUpdate>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering at most `capacity` updates per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to updates published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PanelUpdate> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes `update`; it is dropped when nobody listens.
    pub fn publish(&self, update: PanelUpdate) {
        if self.sender.send(update).is_err() {
            tracing::trace!("No renderer subscribed, update dropped");
        }
    }

    /// Publishes `update` and returns how many subscribers will see it.
    #[must_use]
    pub fn publish_counted(&self, update: PanelUpdate) -> usize {
        self.sender.send(update).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
