//! Device record persistence.
//!
//! The registry talks to storage only through [`DeviceStore`]. Two
//! implementations ship: JSON files on disk and an in-memory map for
//! ephemeral runs and tests.

mod json_store;
mod memory;

pub use json_store::JsonDeviceStore;
pub use memory::MemoryStore;

use crate::error::StorageResult;
use crate::types::{Device, DeviceId};
use std::collections::{BTreeMap, BTreeSet};

/// Group name to member device ids.
pub type GroupMap = BTreeMap<String, BTreeSet<DeviceId>>;

/// Key-value store for device records and group membership.
///
/// Implementations serialize their own writes; callers may share one store
/// across tasks.
pub trait DeviceStore: Send + Sync {
    /// Every persisted device.
    fn load_all_devices(&self) -> StorageResult<Vec<Device>>;

    /// Insert or replace a device by id.
    fn save_device(&self, device: &Device) -> StorageResult<()>;

    /// Remove a device record. Missing records are not an error.
    fn delete_device(&self, id: &DeviceId) -> StorageResult<()>;

    /// Remove records last seen longer than `threshold` ago.
    ///
    /// This is the store's own retention sweep; it is independent of registry
    /// eviction. Returns the number of records removed.
    fn delete_stale(&self, threshold: chrono::Duration) -> StorageResult<usize>;

    fn add_device_to_group(&self, group: &str, id: &DeviceId) -> StorageResult<()>;

    fn remove_device_from_group(&self, group: &str, id: &DeviceId) -> StorageResult<()>;

    /// Groups a device belongs to.
    fn device_groups(&self, id: &DeviceId) -> StorageResult<BTreeSet<String>>;

    /// Members of a group. Unknown groups are empty.
    fn group_devices(&self, group: &str) -> StorageResult<BTreeSet<DeviceId>>;

    /// All groups with their members.
    fn list_groups(&self) -> StorageResult<GroupMap>;
}

/// Groups containing `id`, computed from a full membership map.
pub(crate) fn groups_of(groups: &GroupMap, id: &DeviceId) -> BTreeSet<String> {
    groups
        .iter()
        .filter(|(_, members)| members.contains(id))
        .map(|(name, _)| name.clone())
        .collect()
}
