// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types.
//!
//! [`PowerState`] is a tri-state: `Unknown` is a first-class member that is
//! never equal to `On` or `Off`, so every comparison handles it explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Power state of a relay as observed on the bus or requested by the user.
///
/// # Examples
///
/// ```
/// use smartpanel::types::PowerState;
///
/// assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
/// assert_eq!(PowerState::from_report(b"OFF"), PowerState::Off);
/// assert_eq!(PowerState::from_report(b"on"), PowerState::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// Power is off.
    Off,
    /// Power is on.
    On,
    /// No report yet, or the last report was not understood.
    #[default]
    Unknown,
}

impl PowerState {
    /// Returns the report literal, or `"UNKNOWN"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns `true` for `On` and `Off`.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Logical negation where `Unknown` counts as off.
    ///
    /// ```
    /// use smartpanel::types::PowerState;
    ///
    /// assert_eq!(PowerState::Unknown.toggled(), PowerState::On);
    /// assert_eq!(PowerState::On.toggled(), PowerState::Off);
    /// ```
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off | Self::Unknown => Self::On,
        }
    }

    /// Resolves a power report payload (`ON` / `OFF`, exact bytes).
    ///
    /// Anything else resolves to `Unknown`.
    #[must_use]
    pub fn from_report(payload: &[u8]) -> Self {
        std::str::from_utf8(payload)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(ValueError::InvalidPowerState(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Index of a power channel on a multi-relay device.
///
/// Tasmota devices can have up to 8 relays, indexed from 1 to 8.
/// Index 0 addresses all relays at once.
///
/// # Examples
///
/// ```
/// use smartpanel::types::PowerIndex;
///
/// let idx = PowerIndex::new(3).unwrap();
/// assert_eq!(idx.command_suffix(), "3");
/// assert!(PowerIndex::new(9).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PowerIndex(u8);

impl PowerIndex {
    /// Maximum valid power index (8 relays).
    pub const MAX: u8 = 8;

    /// The primary relay.
    pub const PRIMARY: Self = Self(1);

    /// The secondary relay of the WS2812 light controllers.
    pub const SECONDARY: Self = Self(3);

    /// Creates a new power index.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if index is greater than 8.
    pub fn new(index: u8) -> Result<Self, ValueError> {
        if index > Self::MAX {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: u16::from(Self::MAX),
                actual: u16::from(index),
            });
        }
        Ok(Self(index))
    }

    /// Returns the numeric value of the index.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the suffix for `Power` commands, empty for index 0.
    #[must_use]
    pub fn command_suffix(&self) -> String {
        if self.0 == 0 {
            String::new()
        } else {
            self.0.to_string()
        }
    }
}

impl fmt::Display for PowerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "all")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_from_str_is_exact() {
        assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("OFF".parse::<PowerState>().unwrap(), PowerState::Off);
        assert!(matches!(
            "on".parse::<PowerState>(),
            Err(ValueError::InvalidPowerState(_))
        ));
        assert!("1".parse::<PowerState>().is_err());
        assert!("TOGGLE".parse::<PowerState>().is_err());
    }

    #[test]
    fn power_state_from_report() {
        assert_eq!(PowerState::from_report(b"ON"), PowerState::On);
        assert_eq!(PowerState::from_report(b"OFF"), PowerState::Off);
        assert_eq!(PowerState::from_report(b""), PowerState::Unknown);
        assert_eq!(PowerState::from_report(b"ON "), PowerState::Unknown);
        assert_eq!(PowerState::from_report(&[0xff, 0xfe]), PowerState::Unknown);
    }

    #[test]
    fn power_state_toggled_treats_unknown_as_off() {
        assert_eq!(PowerState::Off.toggled(), PowerState::On);
        assert_eq!(PowerState::On.toggled(), PowerState::Off);
        assert_eq!(PowerState::Unknown.toggled(), PowerState::On);
    }

    #[test]
    fn power_state_from_bool() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert_eq!(PowerState::from(false), PowerState::Off);
    }

    #[test]
    fn power_state_default_is_unknown() {
        assert_eq!(PowerState::default(), PowerState::Unknown);
        assert!(!PowerState::default().is_known());
    }

    #[test]
    fn power_index_bounds() {
        for i in 0..=8 {
            assert_eq!(PowerIndex::new(i).unwrap().value(), i);
        }
        assert!(PowerIndex::new(9).is_err());
    }

    #[test]
    fn power_index_command_suffix() {
        assert_eq!(PowerIndex::new(0).unwrap().command_suffix(), "");
        assert_eq!(PowerIndex::PRIMARY.command_suffix(), "1");
        assert_eq!(PowerIndex::SECONDARY.command_suffix(), "3");
        assert_eq!(PowerIndex::new(0).unwrap().to_string(), "all");
    }
}
