// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet controller configuration.
//!
//! Configuration is a JSON document; every field is optional and falls back
//! to the defaults below.
//!
//! ```json
//! {
//!   "patterns": ["%prefix%/%topic%/", "%topic%/%prefix%/"],
//!   "subscriptions": ["tele/#", "stat/#"],
//!   "broker": { "host": "192.168.1.50", "username": "fleet", "password": "secret" },
//!   "store_path": "/var/lib/tasmota_fleet/devices.json"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pattern::TopicTemplate;
use crate::protocol::default_subscriptions;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Templates tried against unmatched last-will topics.
    #[serde(default = "TopicTemplate::defaults")]
    pub patterns: Vec<TopicTemplate>,
    /// Topic filters the controller subscribes to.
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<String>,
    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Where discovered devices are persisted. `None` keeps them in memory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            patterns: TopicTemplate::defaults(),
            subscriptions: default_subscriptions(),
            broker: BrokerConfig::default(),
            store_path: None,
        }
    }
}

impl FleetConfig {
    /// Reads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or is not valid
    /// configuration JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(
            path = %path.display(),
            patterns = config.patterns.len(),
            "Loaded fleet configuration"
        );
        Ok(config)
    }

    /// Parses configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username, if the broker requires authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for `username`.
    #[serde(default)]
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// How long to wait for the broker to acknowledge the connection.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    10
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive(),
            connection_timeout_secs: default_connection_timeout(),
        }
    }
}

impl BrokerConfig {
    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}
