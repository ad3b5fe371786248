// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tasmota commands and their publication.
//!
//! Commands travel as MQTT messages on the device's command topic: the
//! device template built with prefix `cmnd`, the device identifier as topic
//! and the command name as suffix, e.g. `cmnd/lamp1/teleperiod`.
//!
//! # Available Commands
//!
//! | Command Type | Purpose | Example |
//! |-------------|---------|---------|
//! | [`DeviceCommand`] | Device settings, maintenance and status queries | Restart, `DeviceName`, status 0 |
//! | [`INITIAL_COMMANDS`] | Bootstrap query burst for new devices | `gpio`, `pulsetime1` |
//!
//! # Examples
//!
//! ```
//! use tasmota_fleet::command::{Command, DeviceCommand};
//! use tasmota_fleet::types::TelePeriod;
//!
//! let cmd = DeviceCommand::TelePeriod(TelePeriod::new(300).unwrap());
//! assert_eq!(cmd.name(), "teleperiod");
//! assert_eq!(cmd.payload(), Some("300".to_string()));
//!
//! let status = DeviceCommand::Status(0);
//! assert_eq!(status.mqtt_topic_suffix(), "status");
//! assert_eq!(status.mqtt_payload(), "0");
//! ```

mod device;
mod initial;
mod publisher;

pub use device::DeviceCommand;
pub use initial::INITIAL_COMMANDS;
pub use publisher::CommandPublisher;

/// A command that can be sent to a Tasmota device.
pub trait Command {
    /// Returns the command name, e.g. `"status"` or `"teleperiod"`.
    fn name(&self) -> String;

    /// Returns the command payload, if any.
    ///
    /// - `restart 1` has payload `Some("1")`
    /// - `FullTopic` (query) has payload `None`
    fn payload(&self) -> Option<String>;

    /// Returns the MQTT topic suffix for this command.
    ///
    /// This is the part after the device's command topic.
    fn mqtt_topic_suffix(&self) -> String {
        self.name()
    }

    /// Returns the MQTT payload for this command.
    ///
    /// Returns empty string for query commands.
    fn mqtt_payload(&self) -> String {
        self.payload().unwrap_or_default()
    }
}
