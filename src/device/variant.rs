// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device variants and panel roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PowerIndex;

/// The configured `type` string selecting the multi-relay variant.
pub const WS2812_TYPE: &str = "TASMOTA WS2812";

/// Firmware flavour of a Tasmota device, as far as the command protocol is
/// concerned.
///
/// # Examples
///
/// ```
/// use smartpanel::device::DeviceVariant;
///
/// assert_eq!(DeviceVariant::from_type("TASMOTA WS2812"), DeviceVariant::MultiRelayLight);
/// assert_eq!(DeviceVariant::from_type("TASMOTA"), DeviceVariant::Relay);
/// assert_eq!(DeviceVariant::MultiRelayLight.power_report_suffix(), "POWER1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceVariant {
    /// Single relay (plugs, switches, repeaters).
    #[default]
    Relay,
    /// WS2812 light controller exposing two relays that must both flip.
    MultiRelayLight,
}

impl DeviceVariant {
    /// Resolves a configured `type` string; unknown types are plain relays.
    #[must_use]
    pub fn from_type(device_type: &str) -> Self {
        if device_type == WS2812_TYPE {
            Self::MultiRelayLight
        } else {
            Self::Relay
        }
    }

    /// Returns the subtopic carrying power reports.
    #[must_use]
    pub const fn power_report_suffix(&self) -> &'static str {
        match self {
            Self::Relay => "POWER",
            Self::MultiRelayLight => "POWER1",
        }
    }

    /// Returns the relay that must be toggled after the primary one, if any.
    #[must_use]
    pub const fn secondary_relay(&self) -> Option<PowerIndex> {
        match self {
            Self::Relay => None,
            Self::MultiRelayLight => Some(PowerIndex::SECONDARY),
        }
    }
}

impl From<String> for DeviceVariant {
    fn from(value: String) -> Self {
        Self::from_type(&value)
    }
}

impl From<DeviceVariant> for String {
    fn from(value: DeviceVariant) -> Self {
        match value {
            DeviceVariant::Relay => "TASMOTA".to_string(),
            DeviceVariant::MultiRelayLight => WS2812_TYPE.to_string(),
        }
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay => write!(f, "relay"),
            Self::MultiRelayLight => write!(f, "multi-relay light"),
        }
    }
}

/// How a device appears on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// A labelled switch tile. Taps are only accepted while online.
    #[default]
    Thing,
    /// The Wi-Fi repeater icon. Taps are accepted regardless of presence.
    Repeater,
}

impl DeviceRole {
    /// Returns `true` if taps require the device to be online.
    #[must_use]
    pub const fn requires_presence(&self) -> bool {
        matches!(self, Self::Thing)
    }
}
