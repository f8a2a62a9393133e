// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout of a Tasmota device.
//!
//! | Purpose | Topic |
//! |---|---|
//! | Presence | `<base>/LWT` |
//! | Power report | `<base>/POWER` or `<base>/POWER1` |
//! | Commands | `<base>/cmnd/Power<n>` |

use super::DeviceVariant;
use crate::command::Command;

/// Topics derived from a device's base topic.
///
/// # Examples
///
/// ```
/// use smartpanel::device::{DeviceTopics, DeviceVariant};
///
/// let topics = DeviceTopics::new("tasmota/desk", DeviceVariant::Relay);
/// assert_eq!(topics.presence(), "tasmota/desk/LWT");
/// assert_eq!(topics.power_report(), "tasmota/desk/POWER");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopics {
    base: String,
    presence: String,
    power_report: String,
}

impl DeviceTopics {
    /// Derives the topics for `base`.
    #[must_use]
    pub fn new(base: impl Into<String>, variant: DeviceVariant) -> Self {
        let base = base.into();
        Self {
            presence: format!("{base}/LWT"),
            power_report: format!("{base}/{}", variant.power_report_suffix()),
            base,
        }
    }

    /// Returns the base topic.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the last-will topic.
    #[must_use]
    pub fn presence(&self) -> &str {
        &self.presence
    }

    /// Returns the power report topic.
    #[must_use]
    pub fn power_report(&self) -> &str {
        &self.power_report
    }

    /// Returns the topic for `command`.
    #[must_use]
    pub fn command(&self, command: &impl Command) -> String {
        command.topic(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PowerCommand;
    use crate::types::PowerIndex;

    #[test]
    fn relay_topics() {
        let topics = DeviceTopics::new("plug", DeviceVariant::Relay);
        assert_eq!(topics.base(), "plug");
        assert_eq!(topics.presence(), "plug/LWT");
        assert_eq!(topics.power_report(), "plug/POWER");
    }

    #[test]
    fn multi_relay_reports_on_power1() {
        let topics = DeviceTopics::new("strip", DeviceVariant::MultiRelayLight);
        assert_eq!(topics.power_report(), "strip/POWER1");
        assert_eq!(
            topics.command(&PowerCommand::Toggle {
                index: PowerIndex::SECONDARY
            }),
            "strip/cmnd/Power3"
        );
    }
}
