// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thread-safe handoff onto the panel's event loop.
//!
//! Transport handlers run on the transport's own task. They never touch a
//! device: they wrap the message in a [`PanelEvent`] and post it to the
//! [`Mailbox`]. Timers use the same path via [`Mailbox::schedule`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::device::DeviceInput;
use crate::protocol::{ConnectionStatus, Message, MessageHandler};

/// Work item processed by [`Panel::dispatch`](super::Panel::dispatch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Input addressed to the device configured under `key`.
    Device {
        /// Configuration key of the device.
        key: String,
        /// What happened.
        input: DeviceInput,
    },
    /// A message on a Shelly relay's fan-in subscription.
    Relay {
        /// Configuration key of the relay.
        key: String,
        /// The inbound message.
        message: Message,
    },
    /// A message on one of the environment sensor topics.
    Environment(Message),
    /// The user tapped the tile of the device or relay under this key.
    Tap(String),
    /// The broker connection status changed.
    Connection(ConnectionStatus),
}

/// Receiving half of a [`Mailbox`].
pub type Inbox = mpsc::UnboundedReceiver<PanelEvent>;

/// Sending half of the panel's event queue.
///
/// Cloning is cheap; every clone feeds the same [`Inbox`].
///
/// # Examples
///
/// ```
/// use smartpanel::panel::{Mailbox, PanelEvent};
///
/// let (mailbox, mut inbox) = Mailbox::channel();
/// mailbox.send(PanelEvent::Tap("desk".to_string()));
/// assert_eq!(inbox.try_recv().unwrap(), PanelEvent::Tap("desk".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::UnboundedSender<PanelEvent>,
}

impl Mailbox {
    /// Creates a connected mailbox and inbox.
    #[must_use]
    pub fn channel() -> (Self, Inbox) {
        let (sender, inbox) = mpsc::unbounded_channel();
        (Self { sender }, inbox)
    }

    /// Posts `event`.
    ///
    /// Returns `false` if the inbox was dropped.
    pub fn send(&self, event: PanelEvent) -> bool {
        if let Err(err) = self.sender.send(event) {
            tracing::debug!(event = ?err.0, "Panel inbox closed, event dropped");
            return false;
        }
        true
    }

    /// Posts `event` once `delay` has elapsed.
    ///
    /// The wait happens on a spawned task; the caller returns immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn schedule(&self, delay: Duration, event: PanelEvent) -> JoinHandle<()> {
        let mailbox = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            mailbox.send(event);
        })
    }

    /// Builds a transport handler that wraps every message with `wrap` and
    /// posts the result.
    pub fn handler<F>(&self, wrap: F) -> MessageHandler
    where
        F: Fn(Message) -> PanelEvent + Send + Sync + 'static,
    {
        let mailbox = self.clone();
        Arc::new(move |message: &Message| {
            mailbox.send(wrap(message.clone()));
        })
    }

    /// Forwards every status transition observed on `status` as a
    /// [`PanelEvent::Connection`].
    ///
    /// The task ends when either side closes. Must be called from within a
    /// tokio runtime.
    pub fn forward_status(&self, mut status: watch::Receiver<ConnectionStatus>) -> JoinHandle<()> {
        let mailbox = self.clone();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                if !mailbox.send(PanelEvent::Connection(current)) {
                    break;
                }
            }
        })
    }

    /// Returns `true` if the inbox was dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
