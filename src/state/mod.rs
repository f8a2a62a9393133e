// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device state machines.
//!
//! - [`OnlineState`] tracks reachability from last-will messages
//! - [`PowerReconciler`] tracks user intent against reported power
//!
//! Both are plain values mutated through `&mut self`; they never fail and
//! represent malformed input as the `Unknown` tri-state member. Each exposes
//! a single [`ChangeListener`] slot and also returns whether a call changed
//! anything, which is what the owning [`Device`](crate::device::Device) uses.
//!
//! # Examples
//!
//! ```
//! use smartpanel::state::{OnlineState, PowerReconciler};
//! use smartpanel::types::{PowerState, Presence};
//!
//! let mut online = OnlineState::new();
//! online.handle_message(b"Offline");
//! assert_eq!(online.is_online(), Presence::Offline);
//!
//! let mut power = PowerReconciler::new();
//! power.handle_message(b"ON");
//! assert_eq!(power.observed(), PowerState::On);
//! ```

mod listener;
mod online;
mod power;

pub use listener::{ChangeListener, Listener};
pub(crate) use listener::notify;
pub use online::OnlineState;
pub use power::PowerReconciler;
