// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device facades.
//!
//! A [`Device`] composes an [`OnlineState`] and a [`PowerReconciler`] with
//! the Tasmota command protocol and re-emits a single change notification.
//! A [`ShellyRelay`] is the simpler Shelly counterpart used for relay
//! buttons.
//!
//! Devices never block and never talk to the transport from a foreign
//! thread: inbound messages and timer expirations reach them as
//! [`DeviceInput`] values through the panel's [`Mailbox`].

mod shelly;
mod topics;
mod variant;

pub use shelly::ShellyRelay;
pub use topics::DeviceTopics;
pub use variant::{DeviceRole, DeviceVariant, WS2812_TYPE};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::color::{Classification, ColorPolicy, PaletteColor, classify};
use crate::command::{Command, PowerCommand};
use crate::config::DeviceConfig;
use crate::panel::{Mailbox, PanelEvent};
use crate::protocol::{Message, QoS, Transport};
use crate::state::{ChangeListener, Listener, OnlineState, PowerReconciler, notify};
use crate::types::{PowerIndex, PowerState, Presence};

/// Cool-down and secondary-command delay of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTiming {
    /// How long further toggles are ignored after an accepted one.
    pub throttle: Duration,
    /// Delay before the secondary relay toggle.
    pub secondary_delay: Duration,
}

impl Default for DeviceTiming {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(500),
            secondary_delay: Duration::from_secs(1),
        }
    }
}

/// Input for a [`Device`], delivered through the panel's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInput {
    /// A message on the presence topic.
    Presence(Message),
    /// A message on the power report topic.
    PowerReport(Message),
    /// The throttle window of the last accepted toggle has elapsed.
    ThrottleElapsed,
    /// Time to toggle the secondary relay.
    SecondaryToggle,
}

/// A Tasmota device tile.
///
/// Created with [`Device::builder`]. On build the device subscribes to its
/// presence and power report topics and asks the device for its power state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use smartpanel::device::Device;
/// use smartpanel::panel::Mailbox;
/// use smartpanel::protocol::LoopbackTransport;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = Arc::new(LoopbackTransport::new());
/// let (mailbox, _inbox) = Mailbox::channel();
///
/// let device = Device::builder("DeskLamp", "tasmota/desk").build(bus.clone(), mailbox);
/// assert_eq!(bus.published_on("tasmota/desk/cmnd/Power1"), vec!["?".to_string()]);
/// assert!(!device.matches());
/// # }
/// ```
pub struct Device {
    key: String,
    name: String,
    variant: DeviceVariant,
    role: DeviceRole,
    topics: DeviceTopics,
    timing: DeviceTiming,
    colors: ColorPolicy,
    online: OnlineState,
    power: PowerReconciler,
    throttled: bool,
    transport: Arc<dyn Transport>,
    mailbox: Mailbox,
    listener: ChangeListener<Device>,
}

impl Device {
    /// Starts building the device configured under `key` with base `topic`.
    #[must_use]
    pub fn builder(key: impl Into<String>, topic: impl Into<String>) -> DeviceBuilder {
        DeviceBuilder::new(key, topic)
    }

    /// Installs the change listener, replacing any previous one.
    ///
    /// The listener receives the whole device whenever presence or power
    /// state changes.
    pub fn on_change(&mut self, listener: impl FnMut(&Device) + Send + 'static) {
        self.listener.set(listener);
    }

    /// Requests the opposite power state.
    ///
    /// Ignored while throttled. Otherwise flips the user intent, publishes
    /// `TOGGLE` on the primary relay and, for multi-relay devices, schedules
    /// the secondary toggle.
    ///
    /// Returns `true` if the toggle was accepted.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime, since the cool-down and
    /// the secondary toggle are scheduled as tasks.
    pub fn toggle(&mut self) -> bool {
        if self.throttled {
            tracing::debug!(device = %self.key, "Toggle suppressed while throttled");
            return false;
        }

        self.throttled = true;
        self.mailbox
            .schedule(self.timing.throttle, self.event(DeviceInput::ThrottleElapsed));

        if self.power.toggle_user_intent() {
            notify!(self, listener);
        }

        self.send(&PowerCommand::Toggle {
            index: PowerIndex::PRIMARY,
        });

        if self.variant.secondary_relay().is_some() {
            self.mailbox.schedule(
                self.timing.secondary_delay,
                self.event(DeviceInput::SecondaryToggle),
            );
        }
        true
    }

    /// Applies an input from the event loop.
    ///
    /// Returns `true` if presence, power state or the throttle changed.
    pub fn handle(&mut self, input: DeviceInput) -> bool {
        let changed = match input {
            DeviceInput::Presence(message) => self.online.handle_message(message.payload()),
            DeviceInput::PowerReport(message) => self.power.handle_message(message.payload()),
            DeviceInput::ThrottleElapsed => std::mem::replace(&mut self.throttled, false),
            DeviceInput::SecondaryToggle => {
                if let Some(index) = self.variant.secondary_relay() {
                    self.send(&PowerCommand::Toggle { index });
                }
                false
            }
        };

        if changed {
            notify!(self, listener);
        }
        changed
    }

    fn send(&self, command: &impl Command) {
        let topic = self.topics.command(command);
        tracing::debug!(device = %self.key, topic = %topic, payload = command.payload(), "Sending command");
        self.transport.publish(&topic, command.payload(), QoS::ExactlyOnce);
    }

    fn event(&self, input: DeviceInput) -> PanelEvent {
        PanelEvent::Device {
            key: self.key.clone(),
            input,
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

    /// Returns the device variant.
    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// Returns the panel role.
    #[must_use]
    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// Returns the topic layout.
    #[must_use]
    pub fn topics(&self) -> &DeviceTopics {
        &self.topics
    }

    /// Returns the timing.
    #[must_use]
    pub fn timing(&self) -> DeviceTiming {
        self.timing
    }

    /// Returns the reachability tracker.
    #[must_use]
    pub fn online_state(&self) -> &OnlineState {
        &self.online
    }

    /// Returns the power reconciler.
    #[must_use]
    pub fn power_state(&self) -> &PowerReconciler {
        &self.power
    }

    /// Returns the current reachability.
    #[must_use]
    pub fn presence(&self) -> Presence {
        self.online.is_online()
    }

    /// Returns the last reported power state.
    #[must_use]
    pub fn observed(&self) -> PowerState {
        self.power.observed()
    }

    /// Returns the power state the user last asked for.
    #[must_use]
    pub fn expected(&self) -> PowerState {
        self.power.expected()
    }

    /// Returns `true` if the device confirmed the last request.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.power.matches()
    }

    /// Returns `true` while toggles are being ignored.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.throttled
    }

    /// Returns `true` if a tap on this device's tile should toggle it.
    #[must_use]
    pub fn accepts_taps(&self) -> bool {
        !self.role.requires_presence() || self.presence() == Presence::Online
    }

    /// Returns the color policy.
    #[must_use]
    pub fn color_policy(&self) -> ColorPolicy {
        self.colors
    }

    /// Returns the presentation class of the reconciled state.
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify(self.power.observed(), self.power.expected())
    }

    /// Returns the palette color for the current classification.
    #[must_use]
    pub fn color(&self) -> PaletteColor {
        self.colors.color_for(self.classification())
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("key", &self.key)
            .field("variant", &self.variant)
            .field("role", &self.role)
            .field("topic", &self.topics.base())
            .field("presence", &self.presence())
            .field("observed", &self.observed())
            .field("expected", &self.expected())
            .field("throttled", &self.throttled)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Device`].
pub struct DeviceBuilder {
    key: String,
    topic: String,
    name: Option<String>,
    variant: DeviceVariant,
    role: DeviceRole,
    timing: DeviceTiming,
    colors: Option<ColorPolicy>,
    listener: Option<Listener<Device>>,
}

impl DeviceBuilder {
    fn new(key: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            topic: topic.into(),
            name: None,
            variant: DeviceVariant::default(),
            role: DeviceRole::default(),
            timing: DeviceTiming::default(),
            colors: None,
            listener: None,
        }
    }

    /// Creates a builder from a configuration section.
    #[must_use]
    pub fn from_config(key: impl Into<String>, config: &DeviceConfig) -> Self {
        let mut builder = Self::new(key, config.topic.clone())
            .variant(config.variant)
            .role(config.role)
            .colors(config.color_policy());
        builder.name.clone_from(&config.name);
        builder
    }

    /// Sets the display name (default: the key).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the device variant (default: single relay).
    #[must_use]
    pub fn variant(mut self, variant: DeviceVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the panel role (default: thing).
    #[must_use]
    pub fn role(mut self, role: DeviceRole) -> Self {
        self.role = role;
        self
    }

    /// Sets throttle and secondary delay.
    #[must_use]
    pub fn timing(mut self, timing: DeviceTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the color policy (default: the role's policy).
    #[must_use]
    pub fn colors(mut self, colors: ColorPolicy) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Installs the change listener before the device subscribes.
    #[must_use]
    pub fn listener(mut self, listener: impl FnMut(&Device) + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Creates the device, subscribes its topics and publishes the power
    /// state query.
    pub fn build(self, transport: Arc<dyn Transport>, mailbox: Mailbox) -> Device {
        let topics = DeviceTopics::new(self.topic, self.variant);
        let mut listener = ChangeListener::new();
        if let Some(l) = self.listener {
            listener.set_boxed(l);
        }

        let device = Device {
            name: self.name.unwrap_or_else(|| self.key.clone()),
            key: self.key,
            variant: self.variant,
            role: self.role,
            topics,
            timing: self.timing,
            colors: self.colors.unwrap_or(ColorPolicy::for_role(self.role)),
            online: OnlineState::new(),
            power: PowerReconciler::new(),
            throttled: false,
            transport,
            mailbox,
            listener,
        };

        let key = device.key.clone();
        device.transport.subscribe(
            device.topics.presence(),
            device.mailbox.handler(move |message| PanelEvent::Device {
                key: key.clone(),
                input: DeviceInput::Presence(message),
            }),
        );
        let key = device.key.clone();
        device.transport.subscribe(
            device.topics.power_report(),
            device.mailbox.handler(move |message| PanelEvent::Device {
                key: key.clone(),
                input: DeviceInput::PowerReport(message),
            }),
        );

        tracing::debug!(
            device = %device.key,
            topic = %device.topics.base(),
            variant = %device.variant,
            "Device created, querying power state"
        );
        device.send(&PowerCommand::Query {
            index: PowerIndex::PRIMARY,
        });
        device
    }
}

impl fmt::Debug for DeviceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuilder")
            .field("key", &self.key)
            .field("topic", &self.topic)
            .field("variant", &self.variant)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
