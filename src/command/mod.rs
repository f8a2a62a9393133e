// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound command definitions.
//!
//! # Available Commands
//!
//! | Command Type | Topic | Payload |
//! |-------------|-------|---------|
//! | [`PowerCommand::Toggle`] | `<topic>/cmnd/Power<n>` | `TOGGLE` |
//! | [`PowerCommand::Query`] | `<topic>/cmnd/Power<n>` | `?` |
//! | [`RelayCommand::Toggle`] | `<topic>/relay/0/command` | `toggle` |
//!
//! # Examples
//!
//! ```
//! use smartpanel::command::{Command, PowerCommand};
//! use smartpanel::types::PowerIndex;
//!
//! let cmd = PowerCommand::Toggle { index: PowerIndex::PRIMARY };
//! assert_eq!(cmd.topic("living/plug"), "living/plug/cmnd/Power1");
//! assert_eq!(cmd.payload(), "TOGGLE");
//! ```

mod power;

pub use power::{PowerCommand, RelayCommand};

/// A command that can be published to a device.
pub trait Command {
    /// Returns the part of the topic after the device's base topic.
    fn topic_suffix(&self) -> String;

    /// Returns the message payload.
    fn payload(&self) -> &'static str;

    /// Returns the full topic for a device rooted at `base`.
    fn topic(&self, base: &str) -> String {
        format!("{base}/{}", self.topic_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PowerIndex;

    #[test]
    fn command_topic_joins_base() {
        let cmd = PowerCommand::Query {
            index: PowerIndex::PRIMARY,
        };
        assert_eq!(cmd.topic("tasmota/desk"), "tasmota/desk/cmnd/Power1");
        assert_eq!(RelayCommand::Toggle.topic("shellies/fan"), "shellies/fan/relay/0/command");
    }
}
