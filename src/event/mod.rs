// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications for the presentation layer.
//!
//! The panel turns every change notification into a [`PanelUpdate`] and
//! broadcasts it on an [`EventBus`]. A renderer subscribes and redraws the
//! tile the update names.
//!
//! # Examples
//!
//! ```
//! use smartpanel::event::{EventBus, PanelUpdate};
//! use smartpanel::protocol::ConnectionStatus;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(PanelUpdate::connection(ConnectionStatus::Connected));
//! assert!(matches!(rx.try_recv(), Ok(PanelUpdate::Connection { .. })));
//! ```

mod event_bus;
mod update;

pub use event_bus::EventBus;
pub use update::{DeviceSnapshot, EnvironmentSnapshot, PanelUpdate, RelaySnapshot};
