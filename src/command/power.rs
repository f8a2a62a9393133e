// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power control commands.

use crate::command::Command;
use crate::types::PowerIndex;

/// Command to a Tasmota relay.
///
/// # Examples
///
/// ```
/// use smartpanel::command::{Command, PowerCommand};
/// use smartpanel::types::PowerIndex;
///
/// let toggle = PowerCommand::Toggle { index: PowerIndex::SECONDARY };
/// assert_eq!(toggle.topic_suffix(), "cmnd/Power3");
///
/// let query = PowerCommand::Query { index: PowerIndex::PRIMARY };
/// assert_eq!(query.payload(), "?");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Ask the device to report its power state.
    Query {
        /// The relay index to query.
        index: PowerIndex,
    },
    /// Toggle the power state.
    Toggle {
        /// The relay index to toggle.
        index: PowerIndex,
    },
}

impl PowerCommand {
    /// Returns the relay index this command addresses.
    #[must_use]
    pub const fn index(&self) -> PowerIndex {
        match self {
            Self::Query { index } | Self::Toggle { index } => *index,
        }
    }
}

impl Command for PowerCommand {
    fn topic_suffix(&self) -> String {
        format!("cmnd/Power{}", self.index().command_suffix())
    }

    fn payload(&self) -> &'static str {
        match self {
            Self::Query { .. } => "?",
            Self::Toggle { .. } => "TOGGLE",
        }
    }
}

/// Command to a Shelly relay running the MQTT firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Toggle relay 0.
    Toggle,
}

impl Command for RelayCommand {
    fn topic_suffix(&self) -> String {
        "relay/0/command".to_string()
    }

    fn payload(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
        }
    }
}
