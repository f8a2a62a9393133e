// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `smartpanel` - device state for an always-on smart-home touch panel.
//!
//! The crate tracks Tasmota and Shelly devices over MQTT and turns their
//! state into what a renderer needs to draw: a color per tile and a few
//! labels. Rendering itself is left to the application.
//!
//! # Features
//!
//! - **Reconciliation**: user intent against reported power, with a
//!   tri-state that keeps `Unknown` explicit
//! - **Presence**: reachability from last-will messages
//! - **Throttling**: at most one toggle per cool-down window per device
//! - **Multi-relay lights**: the secondary relay toggle is a scheduled
//!   continuation, never a blocking sleep
//! - **Color policy**: neutral / positive / negative, configurable per device
//!
//! # Quick Start
//!
//! ```no_run
//! use smartpanel::config::PanelConfig;
//! use smartpanel::event::PanelUpdate;
//! use smartpanel::panel::Panel;
//!
//! #[tokio::main]
//! async fn main() -> smartpanel::Result<()> {
//!     let json = std::fs::read_to_string("panel.json").expect("panel.json");
//!     let config = PanelConfig::from_json_str(&json)?;
//!     let mut panel = Panel::connect(&config).await?;
//!
//!     let mut updates = panel.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(update) = updates.recv().await {
//!             if let PanelUpdate::Device(tile) = update {
//!                 println!("{} is {:?}", tile.name, tile.color);
//!             }
//!         }
//!     });
//!
//!     // Touch handlers post taps through the mailbox.
//!     let mailbox = panel.mailbox();
//!     mailbox.send(smartpanel::panel::PanelEvent::Tap("DeskLamp".to_string()));
//!
//!     panel.run().await;
//!     Ok(())
//! }
//! ```

pub mod color;
pub mod command;
pub mod config;
pub mod device;
pub mod environment;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod types;

pub use color::{Classification, ColorPolicy, PaletteColor, classify};
pub use command::{Command, PowerCommand, RelayCommand};
pub use config::PanelConfig;
pub use device::{Device, DeviceBuilder, DeviceRole, DeviceVariant, ShellyRelay};
pub use error::{ConfigError, ConnectionError, Error, ProtocolError, Result, ValueError};
pub use event::{EventBus, PanelUpdate};
pub use panel::{Mailbox, Panel, PanelEvent};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder};
pub use protocol::{ConnectionStatus, LoopbackTransport, Message, QoS, Transport};
pub use state::{OnlineState, PowerReconciler};
pub use types::{PowerIndex, PowerState, Presence};
