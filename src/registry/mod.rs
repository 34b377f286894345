//! The authoritative in-memory view of known devices.
//!
//! All mutations go through a single write lock held only for the in-memory
//! change. Persistence happens afterwards, outside the lock: a failed write is
//! logged and never rolls back what the running process believes.

mod merge;

pub use merge::{feature_count, reconcile, should_replace, MergeOutcome};

use crate::error::StorageResult;
use crate::storage::DeviceStore;
use crate::types::{Device, DeviceId, DevicePatch};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default age after which a device is evicted.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Registry of known devices backed by a [`DeviceStore`].
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Device>>,
    store: Arc<dyn DeviceStore>,
    stale_after: chrono::Duration,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new(store: Arc<dyn DeviceStore>, stale_after: Duration) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            store,
            stale_after: to_chrono(stale_after),
        }
    }

    /// Create a registry populated from everything in `store`.
    pub fn load(store: Arc<dyn DeviceStore>, stale_after: Duration) -> StorageResult<Self> {
        let groups = store.list_groups()?;
        let mut devices = HashMap::new();
        for mut device in store.load_all_devices()? {
            device.groups = crate::storage::groups_of(&groups, &device.id);
            devices.insert(device.id.clone(), device);
        }
        info!(devices = devices.len(), "loaded device registry");

        Ok(Self {
            devices: RwLock::new(devices),
            store,
            stale_after: to_chrono(stale_after),
        })
    }

    /// Staleness threshold.
    pub fn stale_after(&self) -> chrono::Duration {
        self.stale_after
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn DeviceStore> {
        &self.store
    }

    /// Reconcile a freshly observed candidate, timestamped now.
    pub async fn merge_candidate(&self, candidate: Device) -> MergeOutcome {
        self.merge_candidate_at(candidate, Utc::now()).await
    }

    /// Reconcile a candidate as of `now`.
    ///
    /// When the candidate is identified by MAC and a synthetic `ip-<addr>`
    /// record exists for the same address, that record is folded into the
    /// merge and retired, so one physical device never keeps two entries.
    pub async fn merge_candidate_at(&self, candidate: Device, now: DateTime<Utc>) -> MergeOutcome {
        let (outcome, retired) = {
            let mut devices = self.devices.write().await;

            let retired = if candidate.id.is_synthetic() {
                None
            } else {
                let synthetic = DeviceId::synthetic(candidate.ip);
                devices.remove(&synthetic)
            };

            let existing = match (devices.get(&candidate.id), &retired) {
                (Some(existing), Some(old)) => {
                    Some(merge::union(existing, &rekeyed(old, &candidate.id), now))
                }
                (Some(existing), None) => Some(existing.clone()),
                (None, Some(old)) => Some(rekeyed(old, &candidate.id)),
                (None, None) => None,
            };

            let outcome = match existing {
                Some(base) if retired.is_some() => {
                    // the migrated record counts as an update, never as new
                    match reconcile(Some(&base), candidate, now) {
                        MergeOutcome::Refreshed(d) => MergeOutcome::Replaced(d),
                        other => other,
                    }
                }
                Some(base) => reconcile(Some(&base), candidate, now),
                None => reconcile(None, candidate, now),
            };

            let device = outcome.device().clone();
            devices.insert(device.id.clone(), device);
            (outcome, retired)
        };

        let device = outcome.device();
        debug!(
            id = %device.id,
            ip = %device.ip,
            confidence = %device.confidence,
            new = outcome.is_new(),
            "merged candidate"
        );

        if let Some(old) = retired {
            info!(from = %old.id, to = %device.id, "migrated synthetic identity");
            self.persist_migration(&old, device);
        }
        self.persist(device);
        outcome
    }

    /// Snapshot of every device, ordered by address.
    pub async fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.ip.cmp(&b.ip).then_with(|| a.id.cmp(&b.id)));
        devices
    }

    pub async fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.read().await.get(id).cloned()
    }

    /// Find a device by id or by current address.
    pub async fn find(&self, query: &str) -> Option<Device> {
        let id = DeviceId::parse(query);
        let devices = self.devices.read().await;
        if let Some(device) = devices.get(&id) {
            return Some(device.clone());
        }
        let ip: Ipv4Addr = query.trim().parse().ok()?;
        devices.values().find(|d| d.ip == ip).cloned()
    }

    /// Number of known devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Apply a shallow patch and refresh `last_seen`.
    ///
    /// Returns the updated record, or `None` if the id is unknown.
    pub async fn update(&self, id: &DeviceId, patch: DevicePatch) -> Option<Device> {
        let device = {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(id)?;

            if let Some(ip) = patch.ip {
                device.ip = ip;
            }
            if let Some(mac) = patch.mac {
                device.mac = Some(mac);
            }
            if let Some(rssi) = patch.rssi {
                device.rssi = Some(rssi);
            }
            if let Some(confidence) = patch.confidence {
                device.confidence = device.confidence.max(confidence);
            }
            if let Some(state) = patch.state {
                device.state = state.clamped();
            }
            device.last_seen = device.last_seen.max(Utc::now());
            device.clone()
        };

        self.persist(&device);
        Some(device)
    }

    /// Evict every device older than the staleness threshold.
    pub async fn remove_stale(&self) -> Vec<DeviceId> {
        self.remove_stale_at(Utc::now()).await
    }

    /// Evict every device whose `last_seen` is older than the threshold at `now`.
    ///
    /// Only the in-memory view is affected; the store keeps its history.
    pub async fn remove_stale_at(&self, now: DateTime<Utc>) -> Vec<DeviceId> {
        self.remove_older_than(self.stale_after, now).await
    }

    /// Evict every device older than `threshold` at `now`.
    pub async fn remove_older_than(
        &self,
        threshold: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Vec<DeviceId> {
        let mut removed: Vec<DeviceId> = {
            let mut devices = self.devices.write().await;
            let stale: Vec<DeviceId> = devices
                .values()
                .filter(|d| d.age(now) > threshold)
                .map(|d| d.id.clone())
                .collect();
            for id in &stale {
                devices.remove(id);
            }
            stale
        };
        removed.sort();

        if !removed.is_empty() {
            info!(count = removed.len(), "evicted stale devices");
        }
        removed
    }

    /// Add a device to a group.
    pub async fn add_to_group(&self, group: &str, id: &DeviceId) -> StorageResult<bool> {
        let known = {
            let mut devices = self.devices.write().await;
            match devices.get_mut(id) {
                Some(device) => {
                    device.groups.insert(group.to_string());
                    true
                }
                None => false,
            }
        };
        if known {
            self.store.add_device_to_group(group, id)?;
        }
        Ok(known)
    }

    /// Remove a device from a group.
    pub async fn remove_from_group(&self, group: &str, id: &DeviceId) -> StorageResult<()> {
        if let Some(device) = self.devices.write().await.get_mut(id) {
            device.groups.remove(group);
        }
        self.store.remove_device_from_group(group, id)
    }

    /// Currently known members of a group.
    ///
    /// Members that were evicted are skipped.
    pub async fn group_members(&self, group: &str) -> StorageResult<Vec<Device>> {
        let ids = self.store.group_devices(group)?;
        let devices = self.devices.read().await;
        Ok(ids.iter().filter_map(|id| devices.get(id).cloned()).collect())
    }

    fn persist(&self, device: &Device) {
        if let Err(e) = self.store.save_device(device) {
            warn!(id = %device.id, error = %e, "failed to persist device");
        }
    }

    fn persist_migration(&self, old: &Device, new: &Device) {
        if let Err(e) = self.store.delete_device(&old.id) {
            warn!(id = %old.id, error = %e, "failed to delete migrated record");
        }
        for group in &old.groups {
            let moved = self
                .store
                .remove_device_from_group(group, &old.id)
                .and_then(|_| self.store.add_device_to_group(group, &new.id));
            if let Err(e) = moved {
                warn!(%group, error = %e, "failed to move group membership");
            }
        }
    }
}

/// Periodically evict stale devices, sending each non-empty batch of removed
/// ids to `listener`. Stops once the listener is dropped.
pub fn spawn_sweeper(
    registry: Arc<DeviceRegistry>,
    every: Duration,
    listener: mpsc::Sender<Vec<DeviceId>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = registry.remove_stale().await;
            if removed.is_empty() {
                continue;
            }
            if listener.send(removed).await.is_err() {
                debug!("eviction listener closed, stopping sweeper");
                break;
            }
        }
    })
}

fn rekeyed(device: &Device, id: &DeviceId) -> Device {
    let mut device = device.clone();
    device.id = id.clone();
    device
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{GroupMap, MemoryStore};
    use crate::types::{Confidence, DeviceState, MacAddress};
    use std::collections::BTreeSet;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    fn candidate(last: u8, mac_str: Option<&str>) -> Device {
        Device::new(
            Ipv4Addr::new(192, 168, 1, last),
            mac_str.map(mac),
            Confidence::High,
            Utc::now(),
        )
        .with_state(DeviceState {
            power: true,
            brightness: Some(50),
            ..Default::default()
        })
    }

    fn registry(store: Arc<dyn DeviceStore>) -> DeviceRegistry {
        DeviceRegistry::new(store, DEFAULT_STALE_AFTER)
    }

    /// A store whose every write fails.
    struct BrokenStore;

    impl DeviceStore for BrokenStore {
        fn load_all_devices(&self) -> StorageResult<Vec<Device>> {
            Ok(Vec::new())
        }
        fn save_device(&self, _: &Device) -> StorageResult<()> {
            Err(StorageError::SaveFailed("disk full".into()))
        }
        fn delete_device(&self, _: &DeviceId) -> StorageResult<()> {
            Err(StorageError::SaveFailed("disk full".into()))
        }
        fn delete_stale(&self, _: chrono::Duration) -> StorageResult<usize> {
            Ok(0)
        }
        fn add_device_to_group(&self, _: &str, _: &DeviceId) -> StorageResult<()> {
            Err(StorageError::SaveFailed("disk full".into()))
        }
        fn remove_device_from_group(&self, _: &str, _: &DeviceId) -> StorageResult<()> {
            Err(StorageError::SaveFailed("disk full".into()))
        }
        fn device_groups(&self, _: &DeviceId) -> StorageResult<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }
        fn group_devices(&self, _: &str) -> StorageResult<BTreeSet<DeviceId>> {
            Ok(BTreeSet::new())
        }
        fn list_groups(&self) -> StorageResult<GroupMap> {
            Ok(GroupMap::new())
        }
    }

    #[tokio::test]
    async fn test_insert_then_refresh_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        let first = registry
            .merge_candidate(candidate(20, Some("a8:bb:50:00:00:01")))
            .await;
        assert!(first.is_new());
        let seen = first.device().last_seen;

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = registry
            .merge_candidate(candidate(20, Some("a8:bb:50:00:00:01")))
            .await;
        assert!(matches!(second, MergeOutcome::Refreshed(_)));
        assert!(second.device().last_seen > seen);
        assert_eq!(registry.len().await, 1);
        assert_eq!(store.load_all_devices().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_memory() {
        let registry = registry(Arc::new(BrokenStore));
        let outcome = registry.merge_candidate(candidate(20, None)).await;
        assert!(outcome.is_new());
        assert!(registry.get(&outcome.device().id).await.is_some());
    }

    #[tokio::test]
    async fn test_stale_eviction() {
        let now = Utc::now();
        let mut old = candidate(20, Some("a8:bb:50:00:00:01"));
        old.last_seen = now - chrono::Duration::minutes(6);
        let mut fresh = candidate(21, Some("a8:bb:50:00:00:02"));
        fresh.last_seen = now - chrono::Duration::minutes(1);

        let store = Arc::new(MemoryStore::with_devices([old.clone(), fresh.clone()]));
        let registry = DeviceRegistry::load(store.clone(), DEFAULT_STALE_AFTER).unwrap();

        let removed = registry.remove_stale_at(now).await;
        assert_eq!(removed, vec![old.id.clone()]);

        let remaining: Vec<DeviceId> = registry.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(remaining, vec![fresh.id]);
        // store history is untouched by eviction
        assert_eq!(store.load_all_devices().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_identity_migration() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        let synthetic = registry.merge_candidate(candidate(30, None)).await;
        let old_id = synthetic.device().id.clone();
        registry.add_to_group("hall", &old_id).await.unwrap();

        let migrated = registry
            .merge_candidate(candidate(30, Some("A8:BB:50:00:00:30")))
            .await;
        assert!(!migrated.is_new());
        let device = migrated.device();
        assert_eq!(device.id.as_str(), "a8:bb:50:00:00:30");
        assert!(device.groups.contains("hall"));

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&old_id).await.is_none());

        let persisted: Vec<DeviceId> = store
            .load_all_devices()
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(persisted, vec![device.id.clone()]);
        assert!(store.group_devices("hall").unwrap().contains(&device.id));
    }

    #[tokio::test]
    async fn test_update_refreshes_and_clamps() {
        let registry = registry(Arc::new(MemoryStore::new()));
        let mut device = candidate(40, None);
        device.last_seen = Utc::now() - chrono::Duration::minutes(3);
        let inserted = registry
            .merge_candidate_at(device.clone(), device.last_seen)
            .await;
        let id = inserted.device().id.clone();

        let updated = registry
            .update(
                &id,
                DevicePatch::state(DeviceState {
                    power: false,
                    color_temp: Some(100),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert!(!updated.state.power);
        assert_eq!(updated.state.color_temp, Some(2200));
        assert!(updated.last_seen > device.last_seen);

        assert!(registry
            .update(&DeviceId::parse("ip-1.2.3.4"), DevicePatch::default())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_find_by_ip_or_id() {
        let registry = registry(Arc::new(MemoryStore::new()));
        registry
            .merge_candidate(candidate(50, Some("a8:bb:50:00:00:50")))
            .await;

        assert!(registry.find("192.168.1.50").await.is_some());
        assert!(registry.find("A8-BB-50-00-00-50").await.is_some());
        assert!(registry.find("192.168.1.51").await.is_none());
    }

    #[tokio::test]
    async fn test_group_members_skip_unknown() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());
        let outcome = registry.merge_candidate(candidate(60, None)).await;
        registry
            .add_to_group("office", &outcome.device().id)
            .await
            .unwrap();
        store
            .add_device_to_group("office", &DeviceId::parse("ip-192.168.1.99"))
            .unwrap();

        let members = registry.group_members("office").await.unwrap();
        assert_eq!(members.len(), 1);
        assert!(!registry
            .add_to_group("office", &DeviceId::parse("ip-10.9.9.9"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_sweeper_reports_batches() {
        let mut old = candidate(70, None);
        old.last_seen = Utc::now() - chrono::Duration::minutes(10);
        let store = Arc::new(MemoryStore::with_devices([old.clone()]));
        let registry = Arc::new(DeviceRegistry::load(store, DEFAULT_STALE_AFTER).unwrap());

        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_sweeper(registry.clone(), Duration::from_millis(10), tx);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch, vec![old.id]);
        assert!(registry.is_empty().await);

        drop(rx);
        handle.abort();
    }
}
