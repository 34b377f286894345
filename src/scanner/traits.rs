//! Prober trait abstraction.
//!
//! The scanner only needs "does something answer at this address, and what
//! did it say". Keeping that behind a trait lets tests drive a whole scan pass
//! without touching the network.

use crate::protocol::{Pilot, WizClient};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Checks a single address for a controllable light.
///
/// # Example
///
/// ```ignore
/// use lumiscan::scanner::DeviceProber;
///
/// async fn answers<P: DeviceProber>(prober: &P, ip: Ipv4Addr) -> bool {
///     prober.probe(ip, Duration::from_millis(500)).await.is_some()
/// }
/// ```
#[async_trait]
pub trait DeviceProber: Send + Sync {
    /// Probe `ip`, waiting at most `timeout` for a reply.
    ///
    /// Implementations must swallow per-host failures and return `None`.
    async fn probe(&self, ip: Ipv4Addr, timeout: Duration) -> Option<Pilot>;
}

#[async_trait]
impl DeviceProber for WizClient {
    async fn probe(&self, ip: Ipv4Addr, timeout: Duration) -> Option<Pilot> {
        WizClient::probe(self, ip, Some(timeout)).await
    }
}

/// A shared prober for dynamic dispatch.
pub type SharedProber = std::sync::Arc<dyn DeviceProber>;
