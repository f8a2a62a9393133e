// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Presentation colors derived from reconciled state.
//!
//! [`classify`] reduces an `(observed, expected)` pair to a three-way
//! [`Classification`]. A [`ColorPolicy`] then names the [`PaletteColor`] that
//! backs each slot for a given device.
//!
//! # Examples
//!
//! ```
//! use smartpanel::color::{Classification, ColorPolicy, PaletteColor, classify};
//! use smartpanel::device::DeviceRole;
//! use smartpanel::types::PowerState;
//!
//! let class = classify(PowerState::On, PowerState::On);
//! assert_eq!(class, Classification::Positive);
//!
//! let policy = ColorPolicy::for_role(DeviceRole::Thing);
//! assert_eq!(policy.color_for(class), PaletteColor::Hope);
//! ```

mod palette;
mod policy;

pub use palette::PaletteColor;
pub use policy::{Classification, ColorPolicy, classify, classify_observed};
