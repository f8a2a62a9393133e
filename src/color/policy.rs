// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Three-way classification and per-device color policy.

use std::fmt;

use super::PaletteColor;
use crate::device::DeviceRole;
use crate::types::PowerState;

/// Presentation class of a device tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Unknown, or waiting for the device to confirm a request.
    Neutral,
    /// Confirmed on.
    Positive,
    /// Confirmed off.
    Negative,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neutral => write!(f, "neutral"),
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Classifies a reconciled power state.
///
/// Neutral unless `observed` is known and equal to `expected`; otherwise the
/// observed value selects positive or negative. Total over all nine
/// combinations.
#[must_use]
pub const fn classify(observed: PowerState, expected: PowerState) -> Classification {
    match (observed, expected) {
        (PowerState::On, PowerState::On) => Classification::Positive,
        (PowerState::Off, PowerState::Off) => Classification::Negative,
        _ => Classification::Neutral,
    }
}

/// Classifies a device without a commanded state, such as a Shelly relay.
#[must_use]
pub const fn classify_observed(observed: PowerState) -> Classification {
    classify(observed, observed)
}

/// Which palette color backs each classification slot.
///
/// # Examples
///
/// ```
/// use smartpanel::color::{Classification, ColorPolicy, PaletteColor};
/// use smartpanel::device::DeviceRole;
///
/// let policy = ColorPolicy::for_role(DeviceRole::Repeater)
///     .with_overrides(None, Some("lilac"), None);
/// assert_eq!(policy.color_for(Classification::Positive), PaletteColor::Fresh);
/// assert_eq!(policy.color_for(Classification::Negative), PaletteColor::Tenacity);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorPolicy {
    /// Color for [`Classification::Positive`].
    pub positive: PaletteColor,
    /// Color for [`Classification::Negative`].
    pub negative: PaletteColor,
    /// Color for [`Classification::Neutral`].
    pub neutral: PaletteColor,
}

impl ColorPolicy {
    /// Green / red / grey.
    pub const THING: Self = Self {
        positive: PaletteColor::Hope,
        negative: PaletteColor::Beat,
        neutral: PaletteColor::Reboot,
    };

    /// Light blue / grey / grey.
    pub const REPEATER: Self = Self {
        positive: PaletteColor::Fresh,
        negative: PaletteColor::Reboot,
        neutral: PaletteColor::Reboot,
    };

    /// Returns the default policy for `role`.
    #[must_use]
    pub const fn for_role(role: DeviceRole) -> Self {
        match role {
            DeviceRole::Thing => Self::THING,
            DeviceRole::Repeater => Self::REPEATER,
        }
    }

    /// Replaces the slots for which a palette name is given.
    #[must_use]
    pub fn with_overrides(
        mut self,
        on: Option<&str>,
        off: Option<&str>,
        neutral: Option<&str>,
    ) -> Self {
        if let Some(name) = on {
            self.positive = PaletteColor::from_name(name);
        }
        if let Some(name) = off {
            self.negative = PaletteColor::from_name(name);
        }
        if let Some(name) = neutral {
            self.neutral = PaletteColor::from_name(name);
        }
        self
    }

    /// Returns the color backing `class`.
    #[must_use]
    pub const fn color_for(&self, class: Classification) -> PaletteColor {
        match class {
            Classification::Positive => self.positive,
            Classification::Negative => self.negative,
            Classification::Neutral => self.neutral,
        }
    }
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self::THING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [PowerState; 3] = [PowerState::On, PowerState::Off, PowerState::Unknown];

    #[test]
    fn classify_all_combinations() {
        let cases = [
            (PowerState::On, PowerState::On, Classification::Positive),
            (PowerState::On, PowerState::Off, Classification::Neutral),
            (PowerState::On, PowerState::Unknown, Classification::Neutral),
            (PowerState::Off, PowerState::On, Classification::Neutral),
            (PowerState::Off, PowerState::Off, Classification::Negative),
            (PowerState::Off, PowerState::Unknown, Classification::Neutral),
            (PowerState::Unknown, PowerState::On, Classification::Neutral),
            (PowerState::Unknown, PowerState::Off, Classification::Neutral),
            (PowerState::Unknown, PowerState::Unknown, Classification::Neutral),
        ];
        for (observed, expected, class) in cases {
            assert_eq!(
                classify(observed, expected),
                class,
                "observed={observed} expected={expected}"
            );
        }
    }

    #[test]
    fn classify_is_repeatable() {
        for observed in STATES {
            for expected in STATES {
                assert_eq!(classify(observed, expected), classify(observed, expected));
            }
        }
    }

    #[test]
    fn classify_observed_only() {
        assert_eq!(classify_observed(PowerState::On), Classification::Positive);
        assert_eq!(classify_observed(PowerState::Off), Classification::Negative);
        assert_eq!(classify_observed(PowerState::Unknown), Classification::Neutral);
    }

    #[test]
    fn role_defaults() {
        let thing = ColorPolicy::for_role(DeviceRole::Thing);
        assert_eq!(thing.color_for(Classification::Positive), PaletteColor::Hope);
        assert_eq!(thing.color_for(Classification::Negative), PaletteColor::Beat);
        assert_eq!(thing.color_for(Classification::Neutral), PaletteColor::Reboot);

        let repeater = ColorPolicy::for_role(DeviceRole::Repeater);
        assert_eq!(repeater.color_for(Classification::Positive), PaletteColor::Fresh);
        assert_eq!(repeater.color_for(Classification::Negative), PaletteColor::Reboot);
    }

    #[test]
    fn overrides_replace_named_slots_only() {
        let policy = ColorPolicy::THING.with_overrides(Some("yellow"), None, Some("base"));
        assert_eq!(policy.positive, PaletteColor::Glint);
        assert_eq!(policy.negative, PaletteColor::Beat);
        assert_eq!(policy.neutral, PaletteColor::Base);
    }
}
