// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device store backed by a JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::device::DeviceRecord;
use crate::error::StoreError;

use super::DeviceStore;

/// Store that keeps all records in one pretty-printed JSON array.
///
/// The whole file is rewritten on every save. Parent directories are
/// created as needed; a missing file reads as an empty store.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::device::DeviceRecord;
/// use tasmota_fleet::store::{DeviceStore, JsonFileStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = JsonFileStore::new(dir.path().join("devices.json"));
///
/// store.save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/")).unwrap();
/// assert_eq!(store.find_all().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store writing to `path`. Nothing is touched until the first
    /// read or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl DeviceStore for JsonFileStore {
    fn save(&self, record: &DeviceRecord) -> Result<DeviceRecord, StoreError> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => existing.clone_from(record),
            None => records.push(record.clone()),
        }
        self.write(&records)?;

        tracing::debug!(
            device = %record.id,
            path = %self.path.display(),
            "Saved device record"
        );
        Ok(record.clone())
    }

    fn find_all(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        let _guard = self.lock.lock();
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("devices.json"));
        assert!(store.find_all().unwrap().is_empty());
        assert!(store.get("lamp1").unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("devices.json");
        let store = JsonFileStore::new(&path);

        store
            .save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("devices.json"));

        store
            .save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();
        store
            .save(&DeviceRecord::new("plug", "%prefix%/%topic%/"))
            .unwrap();
        store
            .save(&DeviceRecord::new("lamp1", "%topic%/%prefix%/"))
            .unwrap();

        let records = store.find_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            store.get("lamp1").unwrap().unwrap().full_topic.as_str(),
            "%topic%/%prefix%/"
        );
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        JsonFileStore::new(&path)
            .save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.find_all().unwrap(),
            vec![DeviceRecord::new("lamp1", "%prefix%/%topic%/")]
        );
    }

    #[test]
    fn file_format_is_plain_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        JsonFileStore::new(&path)
            .save(&DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["id"], "lamp1");
        assert_eq!(value[0]["full_topic"], "%prefix%/%topic%/");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).find_all().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
