// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telemetry period type.

use std::fmt;
use std::time::Duration;

use crate::error::ValueError;

/// Interval between telemetry messages, in seconds (10-3600).
///
/// # Examples
///
/// ```
/// use tasmota_fleet::types::TelePeriod;
///
/// let period = TelePeriod::new(300).unwrap();
/// assert_eq!(period.seconds(), 300);
///
/// assert!(TelePeriod::new(5).is_err());
/// assert!(TelePeriod::new(7200).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TelePeriod(u16);

impl TelePeriod {
    /// Shortest accepted period.
    pub const MIN: Self = Self(10);

    /// Longest accepted period.
    pub const MAX: Self = Self(3600);

    /// Creates a telemetry period.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `seconds` is outside 10-3600.
    pub fn new(seconds: u16) -> Result<Self, ValueError> {
        if !(Self::MIN.0..=Self::MAX.0).contains(&seconds) {
            return Err(ValueError::OutOfRange {
                min: Self::MIN.0,
                max: Self::MAX.0,
                actual: seconds,
            });
        }
        Ok(Self(seconds))
    }

    /// Returns the period in seconds.
    #[must_use]
    pub const fn seconds(&self) -> u16 {
        self.0
    }

    /// Returns the period as a duration.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl fmt::Display for TelePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for TelePeriod {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
