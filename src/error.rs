// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the panel core.
//!
//! The device state machines never fail: a malformed bus payload becomes the
//! `Unknown` member of the relevant tri-state. The types in this module only
//! surface from configuration loading and from the broker connection.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The panel configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A power report payload other than `ON` / `OFF`.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// A presence payload other than `Online` / `Offline`.
    #[error("invalid presence: {0}")]
    InvalidPresence(String),
}

/// Failure to establish a broker connection.
///
/// None of these are fatal: the transport keeps retrying in the background and
/// devices stay `Unknown` until a connection succeeds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The broker actively refused the TCP connection.
    #[error("connection to {host}:{port} refused")]
    Refused {
        /// Broker host.
        host: String,
        /// Broker port.
        port: u16,
    },

    /// The broker host name could not be resolved.
    #[error("host {host} could not be resolved")]
    HostUnresolvable {
        /// Broker host.
        host: String,
    },

    /// Any other connection failure.
    #[error("connection failed: {0}")]
    Failed(String),
}

/// Errors related to MQTT communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The MQTT client rejected a request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// No connection outcome within the given time.
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors in the static panel configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the expected shape.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// A required value is missing or empty.
    #[error("missing value for {section}.{key}")]
    MissingValue {
        /// Section holding the value.
        section: String,
        /// Key within the section.
        key: String,
    },

    /// A value is present but not acceptable.
    #[error("invalid value for {section}.{key}: {reason}")]
    Invalid {
        /// Section holding the value.
        section: String,
        /// Key within the section.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A tap or lookup named a device that is not configured.
    #[error("unknown device: {0}")]
    UnknownDevice(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
