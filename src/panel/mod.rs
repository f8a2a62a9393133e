// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The panel's cooperative event loop.
//!
//! A [`Panel`] owns every device, relay and sensor. All of them are mutated
//! in [`Panel::dispatch`], one [`PanelEvent`] at a time, so none of them
//! needs a lock.
//!
//! # Architecture
//!
//! ```text
//! transport task ──► handler ──┐
//! timer task ──► schedule ─────┼──► Mailbox ──► Inbox ──► Panel::dispatch
//! UI tap ──► Mailbox::send ────┘                               │
//!                                                              ▼
//!                                     Device / ShellyRelay / EnvironmentSensor
//!                                                              │
//!                                           listener ──► EventBus ──► renderer
//! ```

mod mailbox;

pub use mailbox::{Inbox, Mailbox, PanelEvent};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::PanelConfig;
use crate::device::{Device, DeviceBuilder, DeviceTiming, ShellyRelay};
use crate::environment::EnvironmentSensor;
use crate::error::ConfigError;
use crate::event::{DeviceSnapshot, EnvironmentSnapshot, EventBus, PanelUpdate, RelaySnapshot};
use crate::protocol::{ConnectionStatus, Transport};

/// Every configured tile plus the loop that drives them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use smartpanel::config::PanelConfig;
/// use smartpanel::panel::Panel;
/// use smartpanel::protocol::LoopbackTransport;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = PanelConfig::from_json_str(r#"{
///     "mqtt": { "host": "localhost" },
///     "devices": { "Desk": { "type": "TASMOTA", "topic": "tasmota/desk" } }
/// }"#).unwrap();
///
/// let bus = Arc::new(LoopbackTransport::new());
/// let mut panel = Panel::new(&config, bus.clone());
///
/// bus.inject("tasmota/desk/POWER", "OFF");
/// panel.process_pending();
/// assert!(panel.device("Desk").unwrap().matches());
/// # }
/// ```
pub struct Panel {
    devices: BTreeMap<String, Device>,
    relays: BTreeMap<String, ShellyRelay>,
    environment: Option<EnvironmentSensor>,
    connection: ConnectionStatus,
    transport: Arc<dyn Transport>,
    mailbox: Mailbox,
    inbox: Inbox,
    bus: EventBus,
}

impl Panel {
    /// Creates the panel with a fresh [`EventBus`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn new(config: &PanelConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_event_bus(config, transport, EventBus::new())
    }

    /// Creates the panel publishing on `bus`.
    ///
    /// Subscribe to `bus` first to receive the initial snapshots.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn with_event_bus(config: &PanelConfig, transport: Arc<dyn Transport>, bus: EventBus) -> Self {
        let (mailbox, inbox) = Mailbox::channel();
        let timing = DeviceTiming::from(config.timing);

        let mut devices = BTreeMap::new();
        for (key, device_config) in &config.devices {
            let updates = bus.clone();
            let device = DeviceBuilder::from_config(key.clone(), device_config)
                .timing(timing)
                .listener(move |device: &Device| {
                    updates.publish(PanelUpdate::Device(DeviceSnapshot::from(device)));
                })
                .build(Arc::clone(&transport), mailbox.clone());
            devices.insert(key.clone(), device);
        }

        let mut relays = BTreeMap::new();
        for (key, relay_config) in &config.relays {
            let mut relay =
                ShellyRelay::from_config(key.clone(), relay_config, Arc::clone(&transport), &mailbox);
            let updates = bus.clone();
            relay.on_change(move |relay: &ShellyRelay| {
                updates.publish(PanelUpdate::Relay(RelaySnapshot::from(relay)));
            });
            relays.insert(key.clone(), relay);
        }

        let environment = config.environment.as_ref().map(|env_config| {
            let mut sensor = EnvironmentSensor::new(env_config, &transport, &mailbox);
            let updates = bus.clone();
            sensor.on_change(move |sensor: &EnvironmentSensor| {
                updates.publish(PanelUpdate::Environment(EnvironmentSnapshot::from(sensor)));
            });
            sensor
        });

        mailbox.forward_status(transport.watch_status());

        tracing::info!(
            devices = devices.len(),
            relays = relays.len(),
            environment = environment.is_some(),
            "Panel created"
        );

        let panel = Self {
            devices,
            relays,
            environment,
            connection: transport.status(),
            transport,
            mailbox,
            inbox,
            bus,
        };
        panel.refresh();
        panel
    }

    /// Connects to the configured broker and creates the panel on it.
    ///
    /// A failed first connection is logged and not fatal: the broker keeps
    /// retrying in the background and the devices stay unknown meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if the broker host is empty.
    #[cfg(feature = "mqtt")]
    pub async fn connect(config: &PanelConfig) -> crate::Result<Self> {
        let broker = config.mqtt.broker_builder().build()?;
        if let Err(e) = broker.wait_connected(config.mqtt.connect_timeout()).await {
            tracing::warn!(
                host = %config.mqtt.host,
                port = config.mqtt.port,
                error = %e,
                "Broker not reachable, continuing with unknown device states"
            );
        }
        Ok(Self::new(config, Arc::new(broker)))
    }

    /// Returns a handle for posting events to this panel.
    #[must_use]
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Subscribes to panel updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PanelUpdate> {
        self.bus.subscribe()
    }

    /// Returns the update bus.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Publishes a snapshot of every tile and the connection status.
    pub fn refresh(&self) {
        for device in self.devices.values() {
            self.bus.publish(PanelUpdate::Device(DeviceSnapshot::from(device)));
        }
        for relay in self.relays.values() {
            self.bus.publish(PanelUpdate::Relay(RelaySnapshot::from(relay)));
        }
        if let Some(sensor) = &self.environment {
            self.bus
                .publish(PanelUpdate::Environment(EnvironmentSnapshot::from(sensor)));
        }
        self.bus.publish(PanelUpdate::connection(self.connection));
    }

    /// Handles a tap on the tile of device or relay `key`.
    ///
    /// A thing device ignores taps unless it is online; a repeater always
    /// accepts them. Returns `Ok(true)` if a command was sent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownDevice` if nothing is configured under
    /// `key`.
    pub fn tap(&mut self, key: &str) -> Result<bool, ConfigError> {
        if let Some(device) = self.devices.get_mut(key) {
            if !device.accepts_taps() {
                tracing::debug!(device = %key, presence = %device.presence(), "Tap ignored, device not online");
                return Ok(false);
            }
            return Ok(device.toggle());
        }
        if let Some(relay) = self.relays.get_mut(key) {
            relay.toggle();
            return Ok(true);
        }
        Err(ConfigError::UnknownDevice(key.to_string()))
    }

    /// Applies one event.
    pub fn dispatch(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Device { key, input } => match self.devices.get_mut(&key) {
                Some(device) => {
                    device.handle(input);
                }
                None => tracing::warn!(device = %key, "Event for unknown device"),
            },
            PanelEvent::Relay { key, message } => match self.relays.get_mut(&key) {
                Some(relay) => {
                    relay.handle(&message);
                }
                None => tracing::warn!(relay = %key, "Event for unknown relay"),
            },
            PanelEvent::Environment(message) => {
                if let Some(sensor) = self.environment.as_mut() {
                    sensor.handle(&message);
                }
            }
            PanelEvent::Tap(key) => {
                if let Err(e) = self.tap(&key) {
                    tracing::warn!(error = %e, "Tap rejected");
                }
            }
            PanelEvent::Connection(status) => {
                if status != self.connection {
                    tracing::info!(from = %self.connection, to = %status, "Broker connection status changed");
                    self.connection = status;
                    self.bus.publish(PanelUpdate::connection(status));
                }
            }
        }
    }

    /// Dispatches every event already queued, without waiting.
    ///
    /// Returns the number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next event and dispatches it.
    ///
    /// Returns `false` if the mailbox is closed.
    pub async fn step(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Runs the event loop.
    ///
    /// The panel keeps a mailbox itself, so this only returns when the task
    /// is cancelled.
    pub async fn run(&mut self) {
        tracing::debug!("Panel event loop started");
        while self.step().await {}
    }

    /// Returns the device configured under `key`.
    #[must_use]
    pub fn device(&self, key: &str) -> Option<&Device> {
        self.devices.get(key)
    }

    /// Returns every device in key order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Returns the relay configured under `key`.
    #[must_use]
    pub fn relay(&self, key: &str) -> Option<&ShellyRelay> {
        self.relays.get(key)
    }

    /// Returns every relay in key order.
    pub fn relays(&self) -> impl Iterator<Item = &ShellyRelay> {
        self.relays.values()
    }

    /// Returns the environment sensor, if configured.
    #[must_use]
    pub fn environment(&self) -> Option<&EnvironmentSensor> {
        self.environment.as_ref()
    }

    /// Returns the last known broker connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    /// Returns the transport shared by all tiles.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("devices", &self.devices)
            .field("relays", &self.relays)
            .field("environment", &self.environment)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{LoopbackTransport, Message};
    use crate::types::{PowerState, Presence};

    const CONFIG: &str = r#"{
        "mqtt": { "host": "localhost" },
        "devices": {
            "Desk": { "type": "TASMOTA", "topic": "tasmota/desk" },
            "Repeater": { "type": "TASMOTA", "topic": "tasmota/rep", "role": "repeater" }
        },
        "relays": { "Fan": { "topic": "shellies/fan" } },
        "environment": {
            "temperature": "room/temperature",
            "humidity": "room/humidity",
            "air_quality": "room/air_quality"
        }
    }"#;

    fn setup() -> (Arc<LoopbackTransport>, Panel) {
        let config = PanelConfig::from_json_str(CONFIG).unwrap();
        let bus = Arc::new(LoopbackTransport::new());
        let panel = Panel::new(&config, bus.clone());
        (bus, panel)
    }

    #[tokio::test]
    async fn construction_queries_every_device() {
        let (bus, panel) = setup();
        assert_eq!(bus.published_on("tasmota/desk/cmnd/Power1"), vec!["?"]);
        assert_eq!(bus.published_on("tasmota/rep/cmnd/Power1"), vec!["?"]);
        assert_eq!(panel.devices().count(), 2);
        assert_eq!(panel.relays().count(), 1);
        assert!(panel.environment().is_some());
        assert_eq!(panel.connection_status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn initial_snapshots_are_published() {
        let config = PanelConfig::from_json_str(CONFIG).unwrap();
        let transport = Arc::new(LoopbackTransport::new());
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let _panel = Panel::with_event_bus(&config, transport, bus);

        let mut devices = 0;
        let mut relays = 0;
        let mut environment = 0;
        let mut connection = 0;
        while let Ok(update) = rx.try_recv() {
            match update {
                PanelUpdate::Device(snapshot) => {
                    assert_eq!(snapshot.observed, PowerState::Unknown);
                    devices += 1;
                }
                PanelUpdate::Relay(_) => relays += 1,
                PanelUpdate::Environment(_) => environment += 1,
                PanelUpdate::Connection { .. } => connection += 1,
            }
        }
        assert_eq!((devices, relays, environment, connection), (2, 1, 1, 1));
    }

    #[tokio::test]
    async fn messages_reach_tiles_through_dispatch() {
        let (bus, mut panel) = setup();

        bus.inject("tasmota/desk/LWT", "Online");
        bus.inject("tasmota/desk/POWER", "ON");
        bus.inject("shellies/fan/relay/0", "on");
        bus.inject("room/temperature", "19.6");

        assert_eq!(panel.device("Desk").unwrap().presence(), Presence::Unknown);
        assert_eq!(panel.process_pending(), 4);

        let desk = panel.device("Desk").unwrap();
        assert_eq!(desk.presence(), Presence::Online);
        assert_eq!(desk.observed(), PowerState::On);
        assert_eq!(panel.relay("Fan").unwrap().observed(), PowerState::On);
        assert_eq!(panel.environment().unwrap().temperature_text(), "20");
    }

    #[tokio::test]
    async fn tap_on_unknown_key() {
        let (_bus, mut panel) = setup();
        assert!(matches!(
            panel.tap("Nope"),
            Err(ConfigError::UnknownDevice(ref key)) if key == "Nope"
        ));
    }

    #[tokio::test]
    async fn tap_event_is_dispatched() {
        let (bus, mut panel) = setup();
        bus.take_published();

        panel.mailbox().send(PanelEvent::Tap("Fan".to_string()));
        panel.process_pending();

        assert_eq!(bus.published_on("shellies/fan/relay/0/command"), vec!["toggle"]);
    }

    #[tokio::test]
    async fn connection_changes_are_forwarded() {
        let (bus, mut panel) = setup();
        let mut rx = panel.subscribe();

        bus.set_status(ConnectionStatus::Disconnected);
        assert!(panel.step().await);

        assert_eq!(panel.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(
            rx.try_recv().unwrap(),
            PanelUpdate::connection(ConnectionStatus::Disconnected)
        );
    }

    #[tokio::test]
    async fn events_for_unknown_keys_are_ignored() {
        let (_bus, mut panel) = setup();
        panel.dispatch(PanelEvent::Relay {
            key: "Ghost".to_string(),
            message: Message::new("x", "on"),
        });
        panel.dispatch(PanelEvent::Device {
            key: "Ghost".to_string(),
            input: crate::device::DeviceInput::ThrottleElapsed,
        });
        assert_eq!(panel.devices().count(), 2);
    }
}
