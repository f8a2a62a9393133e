// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room temperature, humidity and air quality.

use std::fmt;
use std::sync::Arc;

use crate::color::PaletteColor;
use crate::config::EnvironmentConfig;
use crate::panel::{Mailbox, PanelEvent};
use crate::protocol::{Message, Transport};
use crate::state::{ChangeListener, notify};

/// Number of air quality bars.
pub const AIR_QUALITY_BARS: usize = 5;

/// Color of each lit air quality bar, lowest first.
const BAR_COLORS: [PaletteColor; AIR_QUALITY_BARS] = [
    PaletteColor::Hope,
    PaletteColor::Hope,
    PaletteColor::Glint,
    PaletteColor::Glint,
    PaletteColor::Beat,
];

/// Which reading a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Air quality index from 0 to 5.
    AirQuality,
}

/// Formats a reading for a two-digit display: rounded half to even, zero
/// padded, or `"--"` when unknown.
///
/// # Examples
///
/// ```
/// use smartpanel::environment::format_reading;
///
/// assert_eq!(format_reading(Some(7.4)), "07");
/// assert_eq!(format_reading(Some(20.5)), "20");
/// assert_eq!(format_reading(Some(21.5)), "22");
/// assert_eq!(format_reading(None), "--");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_reading(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:02}", v.round_ties_even() as i64),
        None => "--".to_string(),
    }
}

/// The environment sensor tile.
pub struct EnvironmentSensor {
    temperature_topic: String,
    humidity_topic: String,
    air_quality_topic: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    air_quality: Option<f64>,
    listener: ChangeListener<EnvironmentSensor>,
}

impl EnvironmentSensor {
    /// Creates the sensor and subscribes its three topics.
    pub fn new(config: &EnvironmentConfig, transport: &Arc<dyn Transport>, mailbox: &Mailbox) -> Self {
        for topic in [&config.temperature, &config.humidity, &config.air_quality] {
            transport.subscribe(topic, mailbox.handler(PanelEvent::Environment));
        }
        Self {
            temperature_topic: config.temperature.clone(),
            humidity_topic: config.humidity.clone(),
            air_quality_topic: config.air_quality.clone(),
            temperature: None,
            humidity: None,
            air_quality: None,
            listener: ChangeListener::new(),
        }
    }

    /// Installs the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut(&EnvironmentSensor) + Send + 'static) {
        self.listener.set(listener);
    }

    /// Returns which reading `topic` carries, if any.
    #[must_use]
    pub fn reading_for(&self, topic: &str) -> Option<Reading> {
        if topic == self.temperature_topic {
            Some(Reading::Temperature)
        } else if topic == self.humidity_topic {
            Some(Reading::Humidity)
        } else if topic == self.air_quality_topic {
            Some(Reading::AirQuality)
        } else {
            None
        }
    }

    /// Applies a message on one of the sensor topics.
    ///
    /// An unparseable payload resets the reading to unknown. Returns `true`
    /// if the reading changed.
    pub fn handle(&mut self, message: &Message) -> bool {
        let Some(reading) = self.reading_for(message.topic()) else {
            tracing::trace!(topic = %message.topic(), "Not an environment topic");
            return false;
        };

        let value = message
            .payload_str()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        if value.is_none() {
            tracing::warn!(
                topic = %message.topic(),
                payload = %message.payload_lossy(),
                "Unparseable sensor payload"
            );
        }

        let slot = match reading {
            Reading::Temperature => &mut self.temperature,
            Reading::Humidity => &mut self.humidity,
            Reading::AirQuality => &mut self.air_quality,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        notify!(self, listener);
        true
    }

    /// Returns the temperature in degrees Celsius.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Returns the relative humidity in percent.
    #[must_use]
    pub fn humidity(&self) -> Option<f64> {
        self.humidity
    }

    /// Returns the air quality index.
    #[must_use]
    pub fn air_quality(&self) -> Option<f64> {
        self.air_quality
    }

    /// Returns the temperature display string.
    #[must_use]
    pub fn temperature_text(&self) -> String {
        format_reading(self.temperature)
    }

    /// Returns the humidity display string.
    #[must_use]
    pub fn humidity_text(&self) -> String {
        format_reading(self.humidity)
    }

    /// Returns which air quality bars are lit, lowest first.
    ///
    /// Bar `i` (1-based) is lit iff the quality is at least `i`.
    #[must_use]
    pub fn air_quality_bars(&self) -> [bool; AIR_QUALITY_BARS] {
        let mut bars = [false; AIR_QUALITY_BARS];
        if let Some(q) = self.air_quality {
            let mut threshold = 1.0;
            for bar in &mut bars {
                *bar = q >= threshold;
                threshold += 1.0;
            }
        }
        bars
    }

    /// Returns the color of each air quality bar, lowest first.
    ///
    /// Unlit bars are `off`; every bar is `reboot` while the quality is
    /// unknown.
    #[must_use]
    pub fn air_quality_colors(&self) -> [PaletteColor; AIR_QUALITY_BARS] {
        if self.air_quality.is_none() {
            return [PaletteColor::Reboot; AIR_QUALITY_BARS];
        }
        let mut colors = [PaletteColor::Off; AIR_QUALITY_BARS];
        for ((color, lit), on) in colors.iter_mut().zip(self.air_quality_bars()).zip(BAR_COLORS) {
            if lit {
                *color = on;
            }
        }
        colors
    }

    /// Returns the value color for a reading: `fresh` when known, `reboot`
    /// otherwise.
    #[must_use]
    pub fn value_color(value: Option<f64>) -> PaletteColor {
        if value.is_some() {
            PaletteColor::Fresh
        } else {
            PaletteColor::Reboot
        }
    }
}

impl fmt::Debug for EnvironmentSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSensor")
            .field("temperature", &self.temperature)
            .field("humidity", &self.humidity)
            .field("air_quality", &self.air_quality)
            .finish_non_exhaustive()
    }
}
