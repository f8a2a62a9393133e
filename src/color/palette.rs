// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The panel's named color palette.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::ConnectionStatus;

/// A named palette color.
///
/// Every name has a descriptive alias (`hope` / `green`). Unknown names fall
/// back to [`PaletteColor::Reboot`].
///
/// # Examples
///
/// ```
/// use smartpanel::color::PaletteColor;
///
/// assert_eq!(PaletteColor::from_name("light blue"), PaletteColor::Fresh);
/// assert_eq!(PaletteColor::from_name("fresh").rgb(), (0, 132, 176));
/// assert_eq!(PaletteColor::from_name("mauve"), PaletteColor::Reboot);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaletteColor {
    /// `off` / `black`.
    Off,
    /// `fresh` / `light blue`.
    Fresh,
    /// `hope` / `green`.
    Hope,
    /// `glint` / `yellow`.
    Glint,
    /// `beat` / `red`.
    Beat,
    /// `tenacity` / `lilac`.
    Tenacity,
    /// `base` / `dark blue`.
    Base,
    /// `reboot` / `grey`; also the fallback.
    Reboot,
}

impl PaletteColor {
    /// All palette entries.
    pub const ALL: [Self; 8] = [
        Self::Off,
        Self::Fresh,
        Self::Hope,
        Self::Glint,
        Self::Beat,
        Self::Tenacity,
        Self::Base,
        Self::Reboot,
    ];

    /// Resolves a palette name or alias. Names are matched exactly.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "off" | "black" => Self::Off,
            "fresh" | "light blue" => Self::Fresh,
            "hope" | "green" => Self::Hope,
            "glint" | "yellow" => Self::Glint,
            "beat" | "red" => Self::Beat,
            "tenacity" | "lilac" => Self::Tenacity,
            "base" | "dark blue" => Self::Base,
            _ => Self::Reboot,
        }
    }

    /// Returns the palette name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Fresh => "fresh",
            Self::Hope => "hope",
            Self::Glint => "glint",
            Self::Beat => "beat",
            Self::Tenacity => "tenacity",
            Self::Base => "base",
            Self::Reboot => "reboot",
        }
    }

    /// Returns the 8-bit RGB components.
    #[must_use]
    pub const fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Off => (0, 0, 0),
            Self::Fresh => (0, 132, 176),
            Self::Hope => (0, 163, 86),
            Self::Glint => (249, 176, 0),
            Self::Beat => (228, 5, 41),
            Self::Tenacity => (68, 53, 126),
            Self::Base => (24, 56, 107),
            Self::Reboot => (77, 77, 76),
        }
    }

    /// Returns normalized RGBA components for a renderer.
    ///
    /// Color components are divided by 256, so full intensity stays just
    /// below `1.0`.
    #[must_use]
    pub fn rgba(&self, alpha: f32) -> [f32; 4] {
        let (r, g, b) = self.rgb();
        [
            f32::from(r) / 256.0,
            f32::from(g) / 256.0,
            f32::from(b) / 256.0,
            alpha,
        ]
    }

    /// Returns the broker status icon color.
    #[must_use]
    pub const fn for_connection(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => Self::Hope,
            ConnectionStatus::Disconnected => Self::Beat,
            ConnectionStatus::Pending => Self::Reboot,
        }
    }
}

impl From<String> for PaletteColor {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<PaletteColor> for String {
    fn from(value: PaletteColor) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
