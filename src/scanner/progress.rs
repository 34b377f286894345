//! Scan progress snapshots and the observer slot.

use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};

/// Emit a snapshot after this many completed probes.
pub const PROGRESS_INTERVAL: usize = 10;

/// Point-in-time view of a running scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// Hosts probed so far. Never decreases within a pass.
    pub scanned: usize,
    pub total: usize,
    /// Devices inserted or updated so far.
    pub found: usize,
    pub percentage: u8,
    /// Most recently completed address, not necessarily the highest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ip: Option<Ipv4Addr>,
    pub scanning: bool,
}

impl ScanProgress {
    pub(crate) fn running(
        scanned: usize,
        total: usize,
        found: usize,
        current_ip: Option<Ipv4Addr>,
    ) -> Self {
        Self {
            scanned,
            total,
            found,
            percentage: percentage(scanned, total),
            current_ip,
            scanning: true,
        }
    }

    pub(crate) fn finished(scanned: usize, total: usize, found: usize, current_ip: Option<Ipv4Addr>) -> Self {
        Self {
            scanned,
            total,
            found,
            percentage: 100,
            current_ip,
            scanning: false,
        }
    }
}

fn percentage(scanned: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((scanned.min(total) * 100) / total) as u8
}

/// Callback invoked with every snapshot.
pub type ProgressObserver = Arc<dyn Fn(&ScanProgress) + Send + Sync>;

/// Holds at most one registered observer.
#[derive(Default)]
pub(crate) struct ObserverSlot {
    inner: Mutex<Option<ProgressObserver>>,
}

impl ObserverSlot {
    pub(crate) fn set(&self, observer: ProgressObserver) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    pub(crate) fn clear(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Invoke the observer outside the slot lock so it may re-register.
    pub(crate) fn emit(&self, progress: &ScanProgress) {
        let observer = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_percentage() {
        assert_eq!(ScanProgress::running(10, 254, 0, None).percentage, 3);
        assert_eq!(ScanProgress::running(254, 254, 0, None).percentage, 100);
        assert_eq!(ScanProgress::running(0, 0, 0, None).percentage, 100);
        assert!(!ScanProgress::finished(2, 2, 1, None).scanning);
    }

    #[test]
    fn test_observer_slot() {
        let slot = ObserverSlot::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        slot.set(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let progress = ScanProgress::running(1, 2, 0, None);
        slot.emit(&progress);
        slot.clear();
        slot.emit(&progress);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
