// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the state machines.
//!
//! # Types
//!
//! - [`PowerState`] - On/Off/Unknown tri-state for relays
//! - [`Presence`] - Online/Offline/Unknown tri-state for reachability
//! - [`PowerIndex`] - Relay index for multi-channel devices (1-8)

mod power;
mod presence;

pub use power::{PowerIndex, PowerState};
pub use presence::Presence;
