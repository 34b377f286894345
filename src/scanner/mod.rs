//! Scanner module - drives discovery passes over a subnet.
//!
//! A pass enumerates the hosts of a CIDR block, takes one neighbor-table
//! snapshot, then probes hosts in ascending batches. Probes inside a batch run
//! concurrently and each reply is merged into the registry as soon as it
//! arrives. Per-host failures never abort a pass; only setup failures do, and
//! those surface before any probe is sent or any progress is reported.

mod candidate;
mod progress;
mod traits;

pub use candidate::build_candidate;
pub use progress::{ProgressObserver, ScanProgress, PROGRESS_INTERVAL};
pub use traits::{DeviceProber, SharedProber};

use crate::arp::NeighborResolver;
use crate::error::{ScanError, ScanResult};
use crate::protocol::DEFAULT_TIMEOUT;
use crate::registry::DeviceRegistry;
use crate::subnet;
use crate::types::{Device, DeviceId, ScanId};
use crate::vendor::VendorClassifier;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use progress::ObserverSlot;
use serde::Serialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, Instrument};

/// Default number of concurrent probes per batch.
pub const DEFAULT_CONCURRENCY: usize = 20;
/// Smallest accepted batch size.
pub const MIN_CONCURRENCY: usize = 5;
/// Largest accepted batch size.
pub const MAX_CONCURRENCY: usize = 50;
/// Pause between batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(10);

/// Options for one scan pass.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// CIDR to scan; auto-detected when absent.
    pub subnet: Option<String>,
    /// Probes per batch, clamped to 5..=50.
    pub concurrency: usize,
    /// Per-probe reply timeout.
    pub timeout: Duration,
    pub batch_delay: Duration,
    /// Once this flips to `true` no further batches are dispatched.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            subnet: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            batch_delay: DEFAULT_BATCH_DELAY,
            cancel: None,
        }
    }
}

impl ScanOptions {
    /// Set the subnet.
    pub fn with_subnet(mut self, subnet: impl Into<String>) -> Self {
        self.subnet = Some(subnet.into());
        self
    }

    /// Set the batch size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the inter-batch delay.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Effective batch size.
    pub fn batch_size(&self) -> usize {
        self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |rx| *rx.borrow())
    }
}

/// Outcome of a completed pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub scan_id: ScanId,
    pub subnet: String,
    pub hosts_scanned: usize,
    pub total_hosts: usize,
    /// Devices that did not exist before this pass.
    pub new_devices: usize,
    pub duration_ms: u64,
    pub cancelled: bool,
    /// Devices inserted or updated during the pass, ordered by address.
    pub devices: Vec<Device>,
}

/// Coordinates scan passes against a shared registry.
pub struct Scanner {
    registry: Arc<DeviceRegistry>,
    prober: SharedProber,
    neighbors: Arc<dyn NeighborResolver>,
    classifier: Arc<VendorClassifier>,
    scanning: AtomicBool,
    observer: ObserverSlot,
}

/// Clears the scanning flag on every exit path.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scanner {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        prober: SharedProber,
        neighbors: Arc<dyn NeighborResolver>,
        classifier: Arc<VendorClassifier>,
    ) -> Self {
        Self {
            registry,
            prober,
            neighbors,
            classifier,
            scanning: AtomicBool::new(false),
            observer: ObserverSlot::default(),
        }
    }

    /// The registry this scanner feeds.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Whether a pass is running right now.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Register the progress observer, replacing any previous one.
    pub fn on_progress(&self, observer: impl Fn(&ScanProgress) + Send + Sync + 'static) {
        self.observer.set(Arc::new(observer));
    }

    /// Drop the registered observer.
    pub fn clear_progress_observer(&self) {
        self.observer.clear();
    }

    /// Run one scan pass.
    ///
    /// Fails immediately with [`ScanError::ScanInProgress`] if another pass is
    /// running, and with a subnet error if the block is invalid or too large.
    pub async fn scan(&self, options: ScanOptions) -> ScanResult<ScanSummary> {
        let _guard = self.begin()?;

        let subnet = options
            .subnet
            .clone()
            .unwrap_or_else(subnet::auto_detect_subnet);
        let hosts = subnet::enumerate_hosts(&subnet)?;

        let scan_id = ScanId::new();
        let span = tracing::info_span!("scan", id = %scan_id.short(), %subnet);
        self.run(scan_id, subnet, hosts, options).instrument(span).await
    }

    fn begin(&self) -> ScanResult<ScanGuard<'_>> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScanError::ScanInProgress)?;
        Ok(ScanGuard(&self.scanning))
    }

    async fn run(
        &self,
        scan_id: ScanId,
        subnet: String,
        hosts: Vec<Ipv4Addr>,
        options: ScanOptions,
    ) -> ScanResult<ScanSummary> {
        let started = Instant::now();
        let total = hosts.len();
        let batch_size = options.batch_size();
        info!(hosts = total, batch_size, "starting scan");

        let neighbors = self.neighbors.resolve_neighbor_table().await;
        debug!(entries = neighbors.len(), "neighbor snapshot");

        let mut touched: HashMap<DeviceId, Device> = HashMap::new();
        let mut new_devices = 0;
        let mut scanned = 0;
        let mut current_ip = None;
        let mut cancelled = false;

        for (index, batch) in hosts.chunks(batch_size).enumerate() {
            if options.is_cancelled() {
                info!(scanned, "scan cancelled");
                cancelled = true;
                break;
            }
            if index > 0 && !options.batch_delay.is_zero() {
                tokio::time::sleep(options.batch_delay).await;
            }

            let mut replies = stream::iter(batch.iter().copied())
                .map(|ip| {
                    let prober = Arc::clone(&self.prober);
                    let timeout = options.timeout;
                    async move { (ip, prober.probe(ip, timeout).await) }
                })
                .buffer_unordered(batch.len());

            while let Some((ip, reply)) = replies.next().await {
                scanned += 1;
                current_ip = Some(ip);

                if let Some(pilot) = reply {
                    let candidate = build_candidate(
                        ip,
                        &pilot,
                        neighbors.get(&ip).copied(),
                        &self.classifier,
                        Utc::now(),
                    );
                    let outcome = self.registry.merge_candidate(candidate).await;
                    if outcome.is_new() {
                        new_devices += 1;
                    }
                    let device = outcome.into_device();
                    debug!(%ip, id = %device.id, confidence = %device.confidence, "device answered");
                    touched.insert(device.id.clone(), device);
                }

                if scanned % PROGRESS_INTERVAL == 0 {
                    self.observer.emit(&ScanProgress::running(
                        scanned,
                        total,
                        touched.len(),
                        current_ip,
                    ));
                }
            }
        }

        self.observer.emit(&ScanProgress::finished(
            scanned,
            total,
            touched.len(),
            current_ip,
        ));

        let mut devices: Vec<Device> = touched.into_values().collect();
        devices.sort_by(|a, b| a.ip.cmp(&b.ip).then_with(|| a.id.cmp(&b.id)));

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            found = devices.len(),
            new = new_devices,
            scanned,
            duration_ms,
            "scan complete"
        );

        Ok(ScanSummary {
            scan_id,
            subnet,
            hosts_scanned: scanned,
            total_hosts: total,
            new_devices,
            duration_ms,
            cancelled,
            devices,
        })
    }
}
