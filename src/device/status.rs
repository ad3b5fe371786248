// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed view over the attributes a device has reported.
//!
//! Devices answer `status 0` with one large JSON document split into
//! `Status`, `StatusPRM`, `StatusFWR`, `StatusLOG`, `StatusNET`, … sections,
//! and report `Uptime` in periodic telemetry. The collected attributes are
//! decoded into [`DeviceStatus`] section by section: a section that does not
//! have the expected shape is left empty without affecting the others.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Status sections collected for a device.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::device::DeviceStatus;
///
/// let json = r#"{
///     "Status": {"DeviceName": "Desk", "FriendlyName": ["Desk lamp"]},
///     "StatusFWR": {"Version": "13.1.0(tasmota)"},
///     "StatusNET": {"Hostname": "desk", "IPAddress": "192.168.1.40"}
/// }"#;
/// let status: DeviceStatus = serde_json::from_str(json).unwrap();
/// assert_eq!(status.friendly_name(), Some("Desk lamp"));
/// assert_eq!(status.firmware_version(), Some("13.1.0"));
/// assert_eq!(status.ip_address(), Some("192.168.1.40"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceStatus {
    /// Device parameters (`Status 1`).
    #[serde(rename = "Status", default, deserialize_with = "section")]
    pub device: Option<StatusDevice>,

    /// Parameter settings.
    #[serde(rename = "StatusPRM", default, deserialize_with = "section")]
    pub parameters: Option<StatusParameters>,

    /// Firmware information.
    #[serde(rename = "StatusFWR", default, deserialize_with = "section")]
    pub firmware: Option<StatusFirmware>,

    /// Logging settings.
    #[serde(rename = "StatusLOG", default, deserialize_with = "section")]
    pub logging: Option<StatusLogging>,

    /// Network information.
    #[serde(rename = "StatusNET", default, deserialize_with = "section")]
    pub network: Option<StatusNetwork>,

    /// Uptime from telemetry, e.g. `1T02:03:04`.
    #[serde(rename = "Uptime", default, deserialize_with = "section")]
    pub uptime: Option<String>,
}

/// Decodes one section, turning a malformed section into `None`.
fn section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl DeviceStatus {
    /// Returns the first friendly name.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.device
            .as_ref()
            .and_then(|d| d.friendly_name.first())
            .map(String::as_str)
    }

    /// Returns the device name.
    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        self.device
            .as_ref()
            .map(|d| d.device_name.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Returns the firmware version without its build suffix.
    ///
    /// `13.1.0(tasmota)` becomes `13.1.0`.
    #[must_use]
    pub fn firmware_version(&self) -> Option<&str> {
        let version = self.firmware.as_ref()?.version.as_str();
        let version = version.split_once('(').map_or(version, |(head, _)| head);
        (!version.is_empty()).then_some(version)
    }

    /// Returns the IP address.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.network
            .as_ref()
            .map(|n| n.ip_address.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Returns the hostname.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.network
            .as_ref()
            .map(|n| n.hostname.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Returns the boot count.
    #[must_use]
    pub fn boot_count(&self) -> Option<u32> {
        self.parameters.as_ref().map(|p| p.boot_count)
    }

    /// Returns the uptime string.
    #[must_use]
    pub fn uptime(&self) -> Option<&str> {
        self.uptime
            .as_deref()
            .or_else(|| self.parameters.as_ref().map(|p| p.uptime.as_str()))
            .filter(|s| !s.is_empty())
    }

    /// Returns the telemetry period in seconds.
    #[must_use]
    pub fn tele_period(&self) -> Option<u16> {
        self.logging.as_ref().map(|l| l.tele_period)
    }
}

/// Device parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusDevice {
    /// Device name.
    #[serde(default)]
    pub device_name: String,

    /// Friendly names for each relay.
    #[serde(default)]
    pub friendly_name: Vec<String>,

    /// The device's own topic.
    #[serde(default)]
    pub topic: String,
}

/// Parameter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusParameters {
    /// Group topic.
    #[serde(default)]
    pub group_topic: String,

    /// Uptime.
    #[serde(default)]
    pub uptime: String,

    /// Boot count.
    #[serde(default)]
    pub boot_count: u32,
}

/// Firmware information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusFirmware {
    /// Firmware version string.
    #[serde(default)]
    pub version: String,

    /// Build date and time.
    #[serde(default)]
    pub build_date_time: String,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusLogging {
    /// Telemetry period in seconds.
    #[serde(default, rename = "TelePeriod")]
    pub tele_period: u16,
}

/// Network information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusNetwork {
    /// Hostname.
    #[serde(default)]
    pub hostname: String,

    /// IP address.
    #[serde(default, rename = "IPAddress")]
    pub ip_address: String,

    /// MAC address.
    #[serde(default)]
    pub mac: String,
}
