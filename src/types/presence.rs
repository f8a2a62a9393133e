// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device reachability as announced by last-will messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Reachability of a device.
///
/// # Examples
///
/// ```
/// use smartpanel::types::Presence;
///
/// assert_eq!(Presence::from_lwt(b"Online"), Presence::Online);
/// assert_eq!(Presence::from_lwt(b"online"), Presence::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Presence {
    /// The device announced itself.
    Online,
    /// The broker published the device's last will.
    Offline,
    /// Nothing heard yet, or the last message was not understood.
    #[default]
    Unknown,
}

impl Presence {
    /// Returns the LWT literal, or `"Unknown"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Unknown => "Unknown",
        }
    }

    /// Resolves an LWT payload; anything but the exact literals is `Unknown`.
    #[must_use]
    pub fn from_lwt(payload: &[u8]) -> Self {
        std::str::from_utf8(payload)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Presence {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(Self::Online),
            "Offline" => Ok(Self::Offline),
            _ => Err(ValueError::InvalidPresence(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_literals() {
        assert_eq!(Presence::from_lwt(b"Online"), Presence::Online);
        assert_eq!(Presence::from_lwt(b"Offline"), Presence::Offline);
    }

    #[test]
    fn presence_other_payloads_are_unknown() {
        for payload in [&b"ONLINE"[..], b"offline", b"", b"Online\n", &[0xc3, 0x28]] {
            assert_eq!(Presence::from_lwt(payload), Presence::Unknown);
        }
    }

    #[test]
    fn presence_from_str_error() {
        let err = "maybe".parse::<Presence>().unwrap_err();
        assert_eq!(err, ValueError::InvalidPresence("maybe".to_string()));
    }
}
