// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Panel configuration.
//!
//! The configuration is a JSON document. Devices and relays are keyed by
//! section name; the key is how taps and updates refer to them.
//!
//! ```json
//! {
//!   "mqtt": { "host": "192.168.1.50", "username": "panel", "password": "secret" },
//!   "timing": { "throttle_ms": 500, "secondary_delay_ms": 1000 },
//!   "devices": {
//!     "DeskLamp": { "type": "TASMOTA WS2812", "topic": "tasmota/desk", "color_on": "yellow" },
//!     "WifiRepeater": { "type": "TASMOTA", "topic": "tasmota/repeater", "role": "repeater" }
//!   },
//!   "relays": { "Fan": { "topic": "shellies/fan" } },
//!   "environment": {
//!     "temperature": "sensors/room/temperature",
//!     "humidity": "sensors/room/humidity",
//!     "air_quality": "sensors/room/air_quality"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::ColorPolicy;
use crate::device::{DeviceRole, DeviceTiming, DeviceVariant};
use crate::error::ConfigError;

/// Complete panel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Throttle and secondary-command delays.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Tasmota devices by key.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceConfig>,
    /// Shelly relays by key.
    #[serde(default)]
    pub relays: BTreeMap<String, RelayConfig>,
    /// Optional environment sensor.
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,
}

impl PanelConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the document does not parse, or the
    /// error from [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document from a reader.
    ///
    /// # Errors
    ///
    /// Same as [`from_json_str`](Self::from_json_str).
    pub fn from_json_reader(reader: impl Read) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingValue` for an empty broker host, device
    /// topic, relay topic or sensor topic, and `ConfigError::Invalid` for a
    /// zero throttle window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("mqtt", "host", &self.mqtt.host)?;

        if self.timing.throttle_ms == 0 {
            return Err(ConfigError::Invalid {
                section: "timing".to_string(),
                key: "throttle_ms".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        for (key, device) in &self.devices {
            require(key, "topic", &device.topic)?;
        }
        for (key, relay) in &self.relays {
            require(key, "topic", &relay.topic)?;
        }
        if let Some(environment) = &self.environment {
            require("environment", "temperature", &environment.temperature)?;
            require("environment", "humidity", &environment.humidity)?;
            require("environment", "air_quality", &environment.air_quality)?;
        }
        Ok(())
    }

    /// Returns the configuration of device `key`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownDevice` if no such device is configured.
    pub fn device(&self, key: &str) -> Result<&DeviceConfig, ConfigError> {
        self.devices
            .get(key)
            .ok_or_else(|| ConfigError::UnknownDevice(key.to_string()))
    }
}

fn require(section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingValue {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional user name.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password; only used together with `username`.
    #[serde(default)]
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// How long to wait for the first connection outcome.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Pause between reconnection attempts in seconds.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

const fn default_port() -> u16 {
    1883
}

const fn default_keep_alive_secs() -> u64 {
    60
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_retry_interval_secs() -> u64 {
    5
}

impl MqttConfig {
    /// Creates a configuration for `host` with defaults for everything else.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns a broker builder preloaded with these settings.
    #[cfg(feature = "mqtt")]
    #[must_use]
    pub fn broker_builder(&self) -> crate::protocol::MqttBrokerBuilder {
        let mut builder = crate::protocol::MqttBroker::builder()
            .host(&self.host)
            .port(self.port)
            .keep_alive(Duration::from_secs(self.keep_alive_secs))
            .retry_interval(Duration::from_secs(self.retry_interval_secs));
        if let Some(username) = &self.username {
            builder = builder.credentials(username, self.password.as_deref().unwrap_or_default());
        }
        builder
    }
}

/// Throttle and secondary-command delays in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Cool-down after an accepted toggle.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Delay before the secondary relay toggle of multi-relay devices.
    #[serde(default = "default_secondary_delay_ms")]
    pub secondary_delay_ms: u64,
}

const fn default_throttle_ms() -> u64 {
    500
}

const fn default_secondary_delay_ms() -> u64 {
    1000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            secondary_delay_ms: default_secondary_delay_ms(),
        }
    }
}

impl From<TimingConfig> for DeviceTiming {
    fn from(config: TimingConfig) -> Self {
        Self {
            throttle: Duration::from_millis(config.throttle_ms),
            secondary_delay: Duration::from_millis(config.secondary_delay_ms),
        }
    }
}

/// A Tasmota device tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device type; `TASMOTA WS2812` selects the multi-relay variant.
    #[serde(rename = "type")]
    pub variant: DeviceVariant,
    /// Base topic.
    pub topic: String,
    /// Display name; defaults to the section key.
    #[serde(default)]
    pub name: Option<String>,
    /// How the device appears on the panel.
    #[serde(default)]
    pub role: DeviceRole,
    /// Palette name for confirmed on.
    #[serde(default)]
    pub color_on: Option<String>,
    /// Palette name for confirmed off.
    #[serde(default)]
    pub color_off: Option<String>,
    /// Palette name for unknown or pending.
    #[serde(default)]
    pub color_neutral: Option<String>,
}

impl DeviceConfig {
    /// Creates a plain relay configuration for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            variant: DeviceVariant::Relay,
            topic: topic.into(),
            name: None,
            role: DeviceRole::Thing,
            color_on: None,
            color_off: None,
            color_neutral: None,
        }
    }

    /// Returns the role defaults with the configured overrides applied.
    #[must_use]
    pub fn color_policy(&self) -> ColorPolicy {
        ColorPolicy::for_role(self.role).with_overrides(
            self.color_on.as_deref(),
            self.color_off.as_deref(),
            self.color_neutral.as_deref(),
        )
    }
}

/// A Shelly relay button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base topic, such as `shellies/fan`.
    pub topic: String,
    /// Display name; defaults to the section key.
    #[serde(default)]
    pub name: Option<String>,
    /// Palette name for on.
    #[serde(default)]
    pub color_on: Option<String>,
    /// Palette name for off.
    #[serde(default)]
    pub color_off: Option<String>,
    /// Palette name for unknown.
    #[serde(default)]
    pub color_neutral: Option<String>,
}

impl RelayConfig {
    /// Returns the thing defaults with the configured overrides applied.
    #[must_use]
    pub fn color_policy(&self) -> ColorPolicy {
        ColorPolicy::THING.with_overrides(
            self.color_on.as_deref(),
            self.color_off.as_deref(),
            self.color_neutral.as_deref(),
        )
    }
}

/// Environment sensor topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Temperature topic (degrees Celsius).
    pub temperature: String,
    /// Relative humidity topic (percent).
    pub humidity: String,
    /// Air quality topic (0 to 5).
    pub air_quality: String,
}
