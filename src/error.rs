// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the fleet controller.
//!
//! Errors only surface from construction (configuration, broker connection,
//! initial store load) and from explicit device actions. The message routing
//! path never returns errors: anything malformed there is logged and dropped.

use thiserror::Error;

use crate::device::DeviceId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A topic template could not be compiled.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The device store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// No device with this identifier is registered.
    #[error("device not found: {0}")]
    DeviceNotFound(DeviceId),
}

/// Errors raised when compiling a topic template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The template has no `%topic%` placeholder, so no device can be
    /// identified from it.
    #[error("template {0:?} has no %topic% placeholder")]
    MissingTopic(String),

    /// The template expanded to an invalid expression.
    #[error("template {template:?} is invalid: {message}")]
    Invalid {
        /// The offending template.
        template: String,
        /// Why the expression was rejected.
        message: String,
    },
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
}

/// Errors related to MQTT communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transport is not connected.
    #[error("transport is not connected")]
    NotConnected,
}

/// Errors related to payload parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not JSON.
    #[error("payload is not JSON")]
    NotJson,
}

/// Errors raised by a [`DeviceStore`](crate::store::DeviceStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that was read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
