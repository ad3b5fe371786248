// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::device::{DeviceId, DeviceRecord};
use crate::error::StoreError;

use super::DeviceStore;

/// Store that keeps records in memory only.
///
/// Counts successful saves, which makes it handy for checking that a
/// record is written exactly once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<DeviceId, DeviceRecord>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with records. Preloading is not counted as
    /// saving.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let store = Self::new();
        store.records.lock().extend(
            records
                .into_iter()
                .map(|record| (record.id.clone(), record)),
        );
        store
    }

    /// Returns how many times [`DeviceStore::save`] succeeded.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DeviceStore for MemoryStore {
    fn save(&self, record: &DeviceRecord) -> Result<DeviceRecord, StoreError> {
        self.records.lock().insert(record.id.clone(), record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    fn find_all(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self.records.lock().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_is_upsert() {
        let store = MemoryStore::new();
        store
            .save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();
        store
            .save(&DeviceRecord::new("lamp1", "%topic%/%prefix%/"))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.save_count(), 2);
        assert_eq!(
            store.get("lamp1").unwrap().unwrap().full_topic.as_str(),
            "%topic%/%prefix%/"
        );
    }

    #[test]
    fn preloaded_records_are_not_counted() {
        let store = MemoryStore::with_records([
            DeviceRecord::new("lamp1", "%prefix%/%topic%/"),
            DeviceRecord::new("plug", "%prefix%/%topic%/"),
        ]);
        assert_eq!(store.find_all().unwrap().len(), 2);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn get_missing() {
        assert!(MemoryStore::new().get("lamp1").unwrap().is_none());
    }
}
