// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device maintenance commands.

use crate::command::Command;
use crate::types::TelePeriod;

/// Settings and maintenance commands available on every Tasmota device.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::command::{Command, DeviceCommand};
///
/// let cmd = DeviceCommand::DeviceName("Kitchen".to_string());
/// assert_eq!(cmd.name(), "DeviceName");
/// assert_eq!(cmd.payload(), Some("Kitchen".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Reboot the device.
    Restart,
    /// Set the device name shown in the web UI and discovery.
    DeviceName(String),
    /// Set the telemetry interval.
    TelePeriod(TelePeriod),
    /// Ask the device for its `FullTopic` template.
    FullTopic,
    /// Request a status section; `0` asks for all of them.
    Status(u8),
}

impl Command for DeviceCommand {
    fn name(&self) -> String {
        match self {
            Self::Restart => "restart",
            Self::DeviceName(_) => "DeviceName",
            Self::TelePeriod(_) => "teleperiod",
            Self::FullTopic => "FullTopic",
            Self::Status(_) => "status",
        }
        .to_string()
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Restart => Some("1".to_string()),
            Self::DeviceName(name) => Some(name.clone()),
            Self::TelePeriod(period) => Some(period.to_string()),
            Self::FullTopic => None,
            Self::Status(section) => Some(section.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart() {
        assert_eq!(DeviceCommand::Restart.name(), "restart");
        assert_eq!(DeviceCommand::Restart.payload(), Some("1".to_string()));
    }

    #[test]
    fn tele_period() {
        let cmd = DeviceCommand::TelePeriod(TelePeriod::MIN);
        assert_eq!(cmd.name(), "teleperiod");
        assert_eq!(cmd.payload(), Some("10".to_string()));
    }

    #[test]
    fn full_topic_is_a_query() {
        assert_eq!(DeviceCommand::FullTopic.payload(), None);
    }

    #[test]
    fn status_section() {
        let cmd = DeviceCommand::Status(0);
        assert_eq!(cmd.mqtt_topic_suffix(), "status");
        assert_eq!(cmd.mqtt_payload(), "0");
        assert_eq!(DeviceCommand::Status(5).payload(), Some("5".to_string()));
    }
}
