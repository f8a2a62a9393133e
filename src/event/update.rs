// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Updates published to the presentation layer.

use crate::color::{Classification, PaletteColor};
use crate::device::{Device, DeviceRole, ShellyRelay};
use crate::environment::{AIR_QUALITY_BARS, EnvironmentSensor};
use crate::protocol::ConnectionStatus;
use crate::types::{PowerState, Presence};

/// Something the presentation layer should redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelUpdate {
    /// A Tasmota device tile changed.
    Device(DeviceSnapshot),
    /// A Shelly relay button changed.
    Relay(RelaySnapshot),
    /// The environment tile changed.
    Environment(EnvironmentSnapshot),
    /// The broker status icon changed.
    Connection {
        /// New status.
        status: ConnectionStatus,
        /// Icon color.
        color: PaletteColor,
    },
}

impl PanelUpdate {
    /// Creates a connection update with the status icon color.
    #[must_use]
    pub const fn connection(status: ConnectionStatus) -> Self {
        Self::Connection {
            status,
            color: PaletteColor::for_connection(status),
        }
    }

    /// Returns the key of the device or relay this update is about.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Device(snapshot) => Some(&snapshot.key),
            Self::Relay(snapshot) => Some(&snapshot.key),
            Self::Environment(_) | Self::Connection { .. } => None,
        }
    }
}

/// Everything needed to draw a device tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Configuration key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Panel role.
    pub role: DeviceRole,
    /// Reachability.
    pub presence: Presence,
    /// Last reported power.
    pub observed: PowerState,
    /// Last requested power.
    pub expected: PowerState,
    /// Whether the device confirmed the request.
    pub matches: bool,
    /// Whether taps are currently ignored.
    pub throttled: bool,
    /// Presentation class.
    pub classification: Classification,
    /// Tile color.
    pub color: PaletteColor,
}

impl DeviceSnapshot {
    /// Returns the tile color as normalized RGBA.
    #[must_use]
    pub fn rgba(&self) -> [f32; 4] {
        self.color.rgba(1.0)
    }
}

impl From<&Device> for DeviceSnapshot {
    fn from(device: &Device) -> Self {
        Self {
            key: device.key().to_string(),
            name: device.name().to_string(),
            role: device.role(),
            presence: device.presence(),
            observed: device.observed(),
            expected: device.expected(),
            matches: device.matches(),
            throttled: device.is_throttled(),
            classification: device.classification(),
            color: device.color(),
        }
    }
}

/// Everything needed to draw a relay button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySnapshot {
    /// Configuration key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Last reported relay state.
    pub observed: PowerState,
    /// Wattage label.
    pub label: String,
    /// Presentation class.
    pub classification: Classification,
    /// Button color.
    pub color: PaletteColor,
}

impl From<&ShellyRelay> for RelaySnapshot {
    fn from(relay: &ShellyRelay) -> Self {
        Self {
            key: relay.key().to_string(),
            name: relay.name().to_string(),
            observed: relay.observed(),
            label: relay.label().to_string(),
            classification: relay.classification(),
            color: relay.color(),
        }
    }
}

/// Everything needed to draw the environment tile.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSnapshot {
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// Air quality index.
    pub air_quality: Option<f64>,
    /// Two-digit temperature text.
    pub temperature_text: String,
    /// Two-digit humidity text.
    pub humidity_text: String,
    /// Bar colors, lowest first.
    pub air_quality_colors: [PaletteColor; AIR_QUALITY_BARS],
}

impl From<&EnvironmentSensor> for EnvironmentSnapshot {
    fn from(sensor: &EnvironmentSensor) -> Self {
        Self {
            temperature: sensor.temperature(),
            humidity: sensor.humidity(),
            air_quality: sensor.air_quality(),
            temperature_text: sensor.temperature_text(),
            humidity_text: sensor.humidity_text(),
            air_quality_colors: sensor.air_quality_colors(),
        }
    }
}
