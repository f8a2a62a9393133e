// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reachability tracking from last-will messages.

use super::listener::{ChangeListener, notify};
use crate::types::Presence;

/// Tracks whether a device is reachable.
///
/// The state only moves when a presence message arrives. An unrecognized
/// payload forces [`Presence::Unknown`] rather than keeping or guessing a
/// value.
///
/// # Examples
///
/// ```
/// use smartpanel::state::OnlineState;
/// use smartpanel::types::Presence;
///
/// let mut online = OnlineState::new();
/// assert!(online.handle_message(b"Online"));
/// assert!(!online.handle_message(b"Online"));
/// assert_eq!(online.is_online(), Presence::Online);
/// ```
#[derive(Debug, Default)]
pub struct OnlineState {
    online: Presence,
    listener: ChangeListener<OnlineState>,
}

impl OnlineState {
    /// Creates a tracker in the `Unknown` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut(&OnlineState) + Send + 'static) {
        self.listener.set(listener);
    }

    /// Applies a presence payload.
    ///
    /// Returns `true` (and notifies the listener) only if the resolved state
    /// differs from the previous one.
    pub fn handle_message(&mut self, payload: &[u8]) -> bool {
        let presence = Presence::from_lwt(payload);
        if presence == Presence::Unknown {
            tracing::warn!(
                payload = %String::from_utf8_lossy(payload),
                "Unexpected presence payload"
            );
        }

        if presence == self.online {
            return false;
        }

        tracing::debug!(from = %self.online, to = %presence, "Presence changed");
        self.online = presence;
        notify!(self, listener);
        true
    }

    /// Returns the current reachability.
    #[must_use]
    pub fn is_online(&self) -> Presence {
        self.online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counted() -> (OnlineState, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        let mut state = OnlineState::new();
        state.on_change(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (state, count)
    }

    #[test]
    fn starts_unknown() {
        assert_eq!(OnlineState::new().is_online(), Presence::Unknown);
    }

    #[test]
    fn literal_payloads_resolve_regardless_of_prior_state() {
        let priors: [&[u8]; 3] = [b"Online", b"Offline", b"garbage"];
        for prior in priors {
            let mut state = OnlineState::new();
            state.handle_message(prior);
            state.handle_message(b"Online");
            assert_eq!(state.is_online(), Presence::Online);

            let mut state = OnlineState::new();
            state.handle_message(prior);
            state.handle_message(b"Offline");
            assert_eq!(state.is_online(), Presence::Offline);

            let mut state = OnlineState::new();
            state.handle_message(prior);
            state.handle_message(b"online");
            assert_eq!(state.is_online(), Presence::Unknown);
        }
    }

    #[test]
    fn repeated_payload_notifies_once() {
        let (mut state, count) = counted();
        assert!(state.handle_message(b"Online"));
        assert!(!state.handle_message(b"Online"));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(state.handle_message(b"Offline"));
        assert!(!state.handle_message(b"Offline"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_payload_degrades_known_state() {
        let (mut state, count) = counted();
        state.handle_message(b"Online");
        assert!(state.handle_message(b"\x00"));
        assert_eq!(state.is_online(), Presence::Unknown);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_payload_from_unknown_is_silent() {
        let (mut state, count) = counted();
        assert!(!state.handle_message(b"rebooting"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_sees_new_value() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let mut state = OnlineState::new();
        state.on_change(move |s| seen_clone.lock().push(s.is_online()));

        state.handle_message(b"Online");
        state.handle_message(b"Offline");
        assert_eq!(*seen.lock(), vec![Presence::Online, Presence::Offline]);
    }
}
