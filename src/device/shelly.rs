// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shelly relay button.
//!
//! | Topic | Payload |
//! |---|---|
//! | `<topic>/relay/0` | `on` / `off` |
//! | `<topic>/relay/0/power` | decimal watts |
//! | `<topic>/relay/0/command` | `toggle` (outbound) |

use std::fmt;
use std::sync::Arc;

use crate::color::{Classification, ColorPolicy, PaletteColor, classify_observed};
use crate::command::{Command, RelayCommand};
use crate::config::RelayConfig;
use crate::panel::{Mailbox, PanelEvent};
use crate::protocol::{Message, QoS, Transport, topic_matches};
use crate::state::{ChangeListener, notify};
use crate::types::PowerState;

/// Label shown before the first wattage report.
const NO_READING: &str = "--";

/// A Shelly relay with its power meter.
///
/// Unlike a Tasmota [`Device`](super::Device) the relay keeps no user
/// intent: its color follows the last report only.
pub struct ShellyRelay {
    key: String,
    name: String,
    state_topic: String,
    power_topic: String,
    base: String,
    observed: PowerState,
    watts: Option<i64>,
    label: String,
    colors: ColorPolicy,
    transport: Arc<dyn Transport>,
    listener: ChangeListener<ShellyRelay>,
}

impl ShellyRelay {
    /// Creates the relay and subscribes `<topic>/relay/0/#`.
    pub fn new(
        key: impl Into<String>,
        topic: impl Into<String>,
        transport: Arc<dyn Transport>,
        mailbox: &Mailbox,
    ) -> Self {
        let key = key.into();
        let base = topic.into();
        let relay = Self {
            name: key.clone(),
            state_topic: format!("{base}/relay/0"),
            power_topic: format!("{base}/relay/0/power"),
            key,
            base,
            observed: PowerState::Unknown,
            watts: None,
            label: NO_READING.to_string(),
            colors: ColorPolicy::THING,
            transport,
            listener: ChangeListener::new(),
        };

        let key = relay.key.clone();
        relay.transport.subscribe(
            &format!("{}/#", relay.state_topic),
            mailbox.handler(move |message| PanelEvent::Relay {
                key: key.clone(),
                message,
            }),
        );
        relay
    }

    /// Creates the relay from a configuration section.
    pub fn from_config(
        key: impl Into<String>,
        config: &RelayConfig,
        transport: Arc<dyn Transport>,
        mailbox: &Mailbox,
    ) -> Self {
        let mut relay = Self::new(key, config.topic.clone(), transport, mailbox);
        if let Some(name) = &config.name {
            relay.name.clone_from(name);
        }
        relay.colors = config.color_policy();
        relay
    }

    /// Installs the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut(&ShellyRelay) + Send + 'static) {
        self.listener.set(listener);
    }

    /// Applies a message from the fan-in subscription.
    ///
    /// Returns `true` if state or label changed.
    pub fn handle(&mut self, message: &Message) -> bool {
        let changed = if topic_matches(&self.state_topic, message.topic()) {
            self.apply_state(message.payload())
        } else if topic_matches(&self.power_topic, message.topic()) {
            self.apply_power(message)
        } else {
            tracing::trace!(relay = %self.key, topic = %message.topic(), "Ignoring relay message");
            false
        };

        if changed {
            notify!(self, listener);
        }
        changed
    }

    fn apply_state(&mut self, payload: &[u8]) -> bool {
        let state = match payload {
            b"on" => PowerState::On,
            b"off" => PowerState::Off,
            other => {
                tracing::warn!(
                    relay = %self.key,
                    payload = %String::from_utf8_lossy(other),
                    "Unexpected relay state payload"
                );
                PowerState::Unknown
            }
        };
        if state == self.observed {
            return false;
        }
        self.observed = state;
        true
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply_power(&mut self, message: &Message) -> bool {
        let watts = message
            .payload_str()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|w| w.is_finite())
            .map(|w| w.trunc() as i64);

        if watts.is_none() {
            tracing::warn!(
                relay = %self.key,
                payload = %message.payload_lossy(),
                "Unparseable relay power payload"
            );
        }

        let label = watts.map_or_else(|| NO_READING.to_string(), |w| format!("{w} W"));
        if watts == self.watts && label == self.label {
            return false;
        }
        self.watts = watts;
        self.label = label;
        true
    }

    /// Publishes `toggle` and clears the wattage label until the next report.
    pub fn toggle(&mut self) {
        let command = RelayCommand::Toggle;
        let topic = command.topic(&self.base);
        tracing::debug!(relay = %self.key, topic = %topic, "Toggling relay");
        self.transport
            .publish(&topic, command.payload(), QoS::ExactlyOnce);

        if !self.label.is_empty() {
            self.label.clear();
            notify!(self, listener);
        }
    }

    /// Returns the configuration key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the last reported relay state.
    #[must_use]
    pub fn observed(&self) -> PowerState {
        self.observed
    }

    /// Returns the last wattage reading.
    #[must_use]
    pub fn watts(&self) -> Option<i64> {
        self.watts
    }

    /// Returns the wattage label (`"12 W"`, `"--"`, or empty after a toggle).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the presentation class.
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify_observed(self.observed)
    }

    /// Returns the palette color for the current classification.
    #[must_use]
    pub fn color(&self) -> PaletteColor {
        self.colors.color_for(self.classification())
    }
}

impl fmt::Debug for ShellyRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellyRelay")
            .field("key", &self.key)
            .field("topic", &self.base)
            .field("observed", &self.observed)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LoopbackTransport;

    fn setup() -> (Arc<LoopbackTransport>, ShellyRelay) {
        let bus = Arc::new(LoopbackTransport::new());
        let (mailbox, _inbox) = Mailbox::channel();
        let relay = ShellyRelay::new("fan", "shellies/fan", bus.clone(), &mailbox);
        (bus, relay)
    }

    #[test]
    fn subscribes_fan_in_filter() {
        let (bus, relay) = setup();
        assert_eq!(bus.filters(), vec!["shellies/fan/relay/0/#"]);
        assert_eq!(relay.label(), "--");
        assert_eq!(relay.classification(), Classification::Neutral);
    }

    #[test]
    fn state_reports() {
        let (_bus, mut relay) = setup();

        assert!(relay.handle(&Message::new("shellies/fan/relay/0", "on")));
        assert_eq!(relay.observed(), PowerState::On);
        assert_eq!(relay.color(), PaletteColor::Hope);

        assert!(!relay.handle(&Message::new("shellies/fan/relay/0", "on")));

        assert!(relay.handle(&Message::new("shellies/fan/relay/0", "off")));
        assert_eq!(relay.color(), PaletteColor::Beat);

        assert!(relay.handle(&Message::new("shellies/fan/relay/0", "ON")));
        assert_eq!(relay.observed(), PowerState::Unknown);
        assert_eq!(relay.color(), PaletteColor::Reboot);
    }

    #[test]
    fn power_reports_truncate_to_watts() {
        let (_bus, mut relay) = setup();

        assert!(relay.handle(&Message::new("shellies/fan/relay/0/power", "42.9")));
        assert_eq!(relay.watts(), Some(42));
        assert_eq!(relay.label(), "42 W");

        assert!(!relay.handle(&Message::new("shellies/fan/relay/0/power", "42.1")));

        assert!(relay.handle(&Message::new("shellies/fan/relay/0/power", "n/a")));
        assert_eq!(relay.watts(), None);
        assert_eq!(relay.label(), "--");
    }

    #[test]
    fn other_subtopics_are_ignored() {
        let (_bus, mut relay) = setup();
        assert!(!relay.handle(&Message::new("shellies/fan/relay/0/energy", "1234")));
        assert!(!relay.handle(&Message::new("shellies/fan/relay/0/command", "toggle")));
    }

    #[test]
    fn toggle_publishes_and_clears_label() {
        let (bus, mut relay) = setup();
        relay.handle(&Message::new("shellies/fan/relay/0/power", "10"));

        relay.toggle();

        assert_eq!(bus.published_on("shellies/fan/relay/0/command"), vec!["toggle"]);
        assert_eq!(relay.label(), "");
    }

    #[test]
    fn from_config_uses_name_and_colors() {
        let bus = Arc::new(LoopbackTransport::new());
        let (mailbox, _inbox) = Mailbox::channel();
        let config = RelayConfig {
            topic: "shellies/pump".to_string(),
            name: Some("Pump".to_string()),
            color_on: Some("fresh".to_string()),
            color_off: None,
            color_neutral: None,
        };
        let mut relay = ShellyRelay::from_config("pump", &config, bus, &mailbox);
        assert_eq!(relay.name(), "Pump");

        relay.handle(&Message::new("shellies/pump/relay/0", "on"));
        assert_eq!(relay.color(), PaletteColor::Fresh);
    }
}
