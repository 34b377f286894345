//! JSON-based device storage.
//!
//! Stores each device as a separate JSON file for simplicity and durability,
//! plus a single `groups.json` holding group membership.

use super::{groups_of, DeviceStore, GroupMap};
use crate::error::{StorageError, StorageResult};
use crate::types::{Device, DeviceId};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// JSON file-based device storage.
#[derive(Debug)]
pub struct JsonDeviceStore {
    devices_dir: PathBuf,
    groups_file: PathBuf,
    /// Serializes read-modify-write cycles on `groups.json`.
    groups_lock: Mutex<()>,
}

impl JsonDeviceStore {
    /// Open (and create if needed) a store rooted at `data_dir`.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let devices_dir = data_dir.join("devices");
        fs::create_dir_all(&devices_dir)
            .map_err(|e| StorageError::DirectoryError(e.to_string()))?;

        Ok(Self {
            devices_dir,
            groups_file: data_dir.join("groups.json"),
            groups_lock: Mutex::new(()),
        })
    }

    /// Get the file path for a device.
    ///
    /// Colons are not portable in file names, so MAC ids use dashes on disk.
    fn device_file(&self, id: &DeviceId) -> PathBuf {
        self.devices_dir
            .join(format!("{}.json", id.as_str().replace(':', "-")))
    }

    fn read_groups(&self) -> StorageResult<GroupMap> {
        if !self.groups_file.exists() {
            return Ok(GroupMap::new());
        }
        let content = fs::read_to_string(&self.groups_file)
            .map_err(|e| StorageError::LoadFailed(e.to_string()))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_groups(&self, groups: &GroupMap) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(groups)?;
        fs::write(&self.groups_file, content).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    fn modify_groups(&self, f: impl FnOnce(&mut GroupMap)) -> StorageResult<()> {
        let _guard = self.groups_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut groups = self.read_groups()?;
        f(&mut groups);
        self.write_groups(&groups)
    }
}

impl DeviceStore for JsonDeviceStore {
    fn load_all_devices(&self) -> StorageResult<Vec<Device>> {
        let mut devices = Vec::new();

        for entry in
            fs::read_dir(&self.devices_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "json") {
                let parsed = fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|content| {
                        serde_json::from_str::<Device>(&content).map_err(|e| e.to_string())
                    });
                match parsed {
                    Ok(device) => devices.push(device),
                    Err(reason) => {
                        tracing::warn!(path = %path.display(), %reason, "skipping unreadable device record")
                    }
                }
            }
        }

        Ok(devices)
    }

    fn save_device(&self, device: &Device) -> StorageResult<()> {
        let file = self.device_file(&device.id);
        let content = serde_json::to_string_pretty(device)?;

        fs::write(&file, content).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    fn delete_device(&self, id: &DeviceId) -> StorageResult<()> {
        let file = self.device_file(id);

        if !file.exists() {
            return Ok(());
        }

        fs::remove_file(&file).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    fn delete_stale(&self, threshold: chrono::Duration) -> StorageResult<usize> {
        let cutoff = Utc::now() - threshold;
        let mut deleted = 0;

        for device in self.load_all_devices()? {
            if device.last_seen < cutoff {
                self.delete_device(&device.id)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    fn add_device_to_group(&self, group: &str, id: &DeviceId) -> StorageResult<()> {
        self.modify_groups(|groups| {
            groups.entry(group.to_string()).or_default().insert(id.clone());
        })
    }

    fn remove_device_from_group(&self, group: &str, id: &DeviceId) -> StorageResult<()> {
        self.modify_groups(|groups| {
            if let Some(members) = groups.get_mut(group) {
                members.remove(id);
                if members.is_empty() {
                    groups.remove(group);
                }
            }
        })
    }

    fn device_groups(&self, id: &DeviceId) -> StorageResult<BTreeSet<String>> {
        Ok(groups_of(&self.read_groups()?, id))
    }

    fn group_devices(&self, group: &str) -> StorageResult<BTreeSet<DeviceId>> {
        Ok(self.read_groups()?.remove(group).unwrap_or_default())
    }

    fn list_groups(&self) -> StorageResult<GroupMap> {
        self.read_groups()
    }
}
