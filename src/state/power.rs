// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commanded versus observed power state.
//!
//! The reconciler holds two tri-states:
//!
//! - `observed`: what the device last reported on the bus
//! - `expected`: what the user last asked for
//!
//! An observation always overwrites `expected` as well. Once the device
//! reports, it is the source of truth, and a tap followed by someone flipping
//! the physical switch cannot leave the two permanently apart.

use super::listener::{ChangeListener, notify};
use crate::types::PowerState;

/// Reconciles user intent with reported device power.
///
/// # Examples
///
/// ```
/// use smartpanel::state::PowerReconciler;
/// use smartpanel::types::PowerState;
///
/// let mut power = PowerReconciler::new();
/// power.on_observed(PowerState::Off);
/// assert!(power.matches());
///
/// power.toggle_user_intent();
/// assert_eq!(power.expected(), PowerState::On);
/// assert!(!power.matches());
///
/// power.on_observed(PowerState::On);
/// assert!(power.matches());
/// ```
#[derive(Debug, Default)]
pub struct PowerReconciler {
    observed: PowerState,
    expected: PowerState,
    listener: ChangeListener<PowerReconciler>,
}

impl PowerReconciler {
    /// Creates a reconciler with both states `Unknown`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut(&PowerReconciler) + Send + 'static) {
        self.listener.set(listener);
    }

    /// Records a power report from the bus.
    ///
    /// Sets both `observed` and `expected` to `value`. Returns `true` (and
    /// notifies) iff `observed` changed.
    pub fn on_observed(&mut self, value: PowerState) -> bool {
        let previous = self.observed;
        self.observed = value;
        self.expected = value;

        if previous == value {
            return false;
        }
        notify!(self, listener);
        true
    }

    /// Records what the user asked for; `observed` is untouched.
    ///
    /// Returns `true` (and notifies) iff `expected` changed.
    pub fn on_user_intent(&mut self, on: bool) -> bool {
        let value = PowerState::from(on);
        if self.expected == value {
            return false;
        }
        self.expected = value;
        notify!(self, listener);
        true
    }

    /// Flips the user intent; `Unknown` counts as off, so it moves to on.
    pub fn toggle_user_intent(&mut self) -> bool {
        self.on_user_intent(self.expected != PowerState::On)
    }

    /// Applies a raw power report payload (`ON` / `OFF`).
    ///
    /// Any other payload resolves `observed` to `Unknown` and is logged.
    pub fn handle_message(&mut self, payload: &[u8]) -> bool {
        let value = PowerState::from_report(payload);
        if value == PowerState::Unknown {
            tracing::warn!(
                payload = %String::from_utf8_lossy(payload),
                "Unexpected power payload"
            );
        }
        self.on_observed(value)
    }

    /// Returns the last reported power state.
    #[must_use]
    pub fn observed(&self) -> PowerState {
        self.observed
    }

    /// Returns the power state the user last asked for.
    #[must_use]
    pub fn expected(&self) -> PowerState {
        self.expected
    }

    /// Returns `true` if the device has confirmed what the user asked for.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.observed.is_known() && self.observed == self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const ALL: [PowerState; 3] = [PowerState::On, PowerState::Off, PowerState::Unknown];

    /// Builds a reconciler with arbitrary `observed` / `expected`.
    fn with(observed: PowerState, expected: PowerState) -> PowerReconciler {
        let mut power = PowerReconciler::new();
        power.on_observed(observed);
        match expected {
            PowerState::On => {
                power.on_user_intent(true);
            }
            PowerState::Off => {
                power.on_user_intent(false);
            }
            PowerState::Unknown => {
                assert_eq!(observed, PowerState::Unknown, "intent cannot be unknown");
            }
        }
        power
    }

    fn counted() -> (PowerReconciler, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        let mut power = PowerReconciler::new();
        power.on_change(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (power, count)
    }

    #[test]
    fn starts_unknown() {
        let power = PowerReconciler::new();
        assert_eq!(power.observed(), PowerState::Unknown);
        assert_eq!(power.expected(), PowerState::Unknown);
        assert!(!power.matches());
    }

    #[test]
    fn matches_table() {
        // (observed, expected, matches)
        let cases = [
            (PowerState::On, PowerState::On, true),
            (PowerState::On, PowerState::Off, false),
            (PowerState::On, PowerState::Unknown, false),
            (PowerState::Off, PowerState::On, false),
            (PowerState::Off, PowerState::Off, true),
            (PowerState::Off, PowerState::Unknown, false),
            (PowerState::Unknown, PowerState::On, false),
            (PowerState::Unknown, PowerState::Off, false),
            (PowerState::Unknown, PowerState::Unknown, false),
        ];

        for (observed, expected, matches) in cases {
            let power = PowerReconciler {
                observed,
                expected,
                listener: ChangeListener::new(),
            };
            assert_eq!(
                power.matches(),
                matches,
                "observed={observed:?} expected={expected:?}"
            );
        }
    }

    #[test]
    fn observation_overwrites_intent() {
        let mut power = PowerReconciler::new();
        power.on_user_intent(true);
        power.on_observed(PowerState::Off);

        assert_eq!(power.expected(), PowerState::Off);
        assert_eq!(power.observed(), PowerState::Off);
        assert!(power.matches());
    }

    #[test]
    fn observation_notifies_only_on_observed_change() {
        let (mut power, count) = counted();
        assert!(power.on_observed(PowerState::On));
        assert!(!power.on_observed(PowerState::On));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_observation_still_resynchronizes_intent() {
        let (mut power, count) = counted();
        power.on_observed(PowerState::On);
        power.on_user_intent(false);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // Same observed value: no notification, but intent snaps back.
        assert!(!power.on_observed(PowerState::On));
        assert_eq!(power.expected(), PowerState::On);
        assert!(power.matches());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn intent_does_not_touch_observed() {
        let (mut power, count) = counted();
        assert!(power.on_user_intent(true));
        assert_eq!(power.observed(), PowerState::Unknown);
        assert_eq!(power.expected(), PowerState::On);
        assert!(!power.on_user_intent(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn toggle_from_each_state() {
        for observed in ALL {
            let mut power = with(observed, observed);
            let before = power.expected();
            assert!(power.toggle_user_intent());
            assert_eq!(power.expected(), before.toggled());
            assert_eq!(power.observed(), observed);
        }
    }

    #[test]
    fn toggle_from_unknown_moves_to_on() {
        let mut power = PowerReconciler::new();
        power.toggle_user_intent();
        assert_eq!(power.expected(), PowerState::On);
        power.toggle_user_intent();
        assert_eq!(power.expected(), PowerState::Off);
    }

    #[test]
    fn unrecognized_payload_resolves_unknown() {
        let (mut power, count) = counted();
        power.handle_message(b"ON");
        assert_eq!(power.observed(), PowerState::On);

        assert!(power.handle_message(b"maybe"));
        assert_eq!(power.observed(), PowerState::Unknown);
        assert_eq!(power.expected(), PowerState::Unknown);
        assert!(!power.matches());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
