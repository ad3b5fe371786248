// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence of discovered devices.
//!
//! Only [`DeviceRecord`]s are stored: the device topic and its `FullTopic`
//! template. Everything else a device carries is rebuilt from live traffic.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::device::DeviceRecord;
use crate::error::StoreError;

/// Storage backend for device records.
///
/// `save` is an upsert keyed by the record identifier.
pub trait DeviceStore: Send + Sync {
    /// Inserts or replaces a record, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record cannot be written.
    fn save(&self, record: &DeviceRecord) -> Result<DeviceRecord, StoreError>;

    /// Returns every stored record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be read.
    fn find_all(&self) -> Result<Vec<DeviceRecord>, StoreError>;

    /// Returns the record with the given identifier, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing storage cannot be read.
    fn get(&self, id: &str) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self
            .find_all()?
            .into_iter()
            .find(|record| record.id == id))
    }
}
