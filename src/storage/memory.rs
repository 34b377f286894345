//! In-memory device store.

use super::{groups_of, DeviceStore, GroupMap};
use crate::error::StorageResult;
use crate::types::{Device, DeviceId};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: Mutex<HashMap<DeviceId, Device>>,
    groups: Mutex<GroupMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with devices.
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let store = Self::new();
        store
            .devices()
            .extend(devices.into_iter().map(|d| (d.id.clone(), d)));
        store
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn groups(&self) -> MutexGuard<'_, GroupMap> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceStore for MemoryStore {
    fn load_all_devices(&self) -> StorageResult<Vec<Device>> {
        Ok(self.devices().values().cloned().collect())
    }

    fn save_device(&self, device: &Device) -> StorageResult<()> {
        self.devices().insert(device.id.clone(), device.clone());
        Ok(())
    }

    fn delete_device(&self, id: &DeviceId) -> StorageResult<()> {
        self.devices().remove(id);
        Ok(())
    }

    fn delete_stale(&self, threshold: chrono::Duration) -> StorageResult<usize> {
        let cutoff = Utc::now() - threshold;
        let mut devices = self.devices();
        let before = devices.len();
        devices.retain(|_, d| d.last_seen >= cutoff);
        Ok(before - devices.len())
    }

    fn add_device_to_group(&self, group: &str, id: &DeviceId) -> StorageResult<()> {
        self.groups()
            .entry(group.to_string())
            .or_default()
            .insert(id.clone());
        Ok(())
    }

    fn remove_device_from_group(&self, group: &str, id: &DeviceId) -> StorageResult<()> {
        let mut groups = self.groups();
        if let Some(members) = groups.get_mut(group) {
            members.remove(id);
            if members.is_empty() {
                groups.remove(group);
            }
        }
        Ok(())
    }

    fn device_groups(&self, id: &DeviceId) -> StorageResult<BTreeSet<String>> {
        Ok(groups_of(&self.groups(), id))
    }

    fn group_devices(&self, group: &str) -> StorageResult<BTreeSet<DeviceId>> {
        Ok(self.groups().get(group).cloned().unwrap_or_default())
    }

    fn list_groups(&self) -> StorageResult<GroupMap> {
        Ok(self.groups().clone())
    }
}
