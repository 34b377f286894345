//! The device record and its identity.

use super::mac::MacAddress;
use super::state::DeviceState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Prefix used for identities of devices whose MAC is not known.
const SYNTHETIC_PREFIX: &str = "ip-";

/// Stable registry key for a device.
///
/// The normalized MAC when known, otherwise `ip-<address>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Identity for a device with a known MAC.
    pub fn from_mac(mac: &MacAddress) -> Self {
        Self(mac.to_string())
    }

    /// Identity for a device only known by its address.
    pub fn synthetic(ip: Ipv4Addr) -> Self {
        Self(format!("{}{}", SYNTHETIC_PREFIX, ip))
    }

    /// Wrap an identity string as read back from storage or user input.
    ///
    /// MAC-shaped input is normalized so `A8-BB-50-...` and `a8:bb:50:...`
    /// name the same device.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<MacAddress>() {
            Ok(mac) => Self::from_mac(&mac),
            Err(_) => Self(raw.trim().to_string()),
        }
    }

    /// Whether this identity was derived from an IP address.
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How strongly the evidence says this is a controllable light.
///
/// Ordering is `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Weak signals only, e.g. ARP plus vendor match with no protocol reply.
    Low,
    /// Answered the protocol, but the MAC vendor is not a known light vendor.
    Medium,
    /// Answered the protocol directly.
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A discovered light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub ip: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    pub confidence: Confidence,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub state: DeviceState,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub groups: BTreeSet<String>,
}

impl Device {
    /// Create a record with empty state, seen at `last_seen`.
    ///
    /// The identity is derived from `mac` when given.
    pub fn new(
        ip: Ipv4Addr,
        mac: Option<MacAddress>,
        confidence: Confidence,
        last_seen: DateTime<Utc>,
    ) -> Self {
        let id = mac
            .as_ref()
            .map(DeviceId::from_mac)
            .unwrap_or_else(|| DeviceId::synthetic(ip));
        Self {
            id,
            ip,
            mac,
            confidence,
            last_seen,
            rssi: None,
            state: DeviceState::default(),
            groups: BTreeSet::new(),
        }
    }

    /// Set the state.
    pub fn with_state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }

    /// Set the signal strength.
    pub fn with_rssi(mut self, rssi: Option<i32>) -> Self {
        self.rssi = rssi;
        self
    }

    /// Age of this record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_seen
    }
}

/// A shallow set of field replacements for an existing device.
///
/// Used by callers that obtained fresh information outside a scan, such as a
/// direct state query.
#[derive(Debug, Clone, Default)]
pub struct DevicePatch {
    pub ip: Option<Ipv4Addr>,
    pub mac: Option<MacAddress>,
    pub rssi: Option<i32>,
    pub confidence: Option<Confidence>,
    pub state: Option<DeviceState>,
}

impl DevicePatch {
    /// Patch that replaces only the state.
    pub fn state(state: DeviceState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_mac() {
        let mac: MacAddress = "A8:BB:50:01:02:03".parse().unwrap();
        let device = Device::new(
            Ipv4Addr::new(192, 168, 1, 20),
            Some(mac),
            Confidence::High,
            Utc::now(),
        );
        assert_eq!(device.id.as_str(), "a8:bb:50:01:02:03");
        assert!(!device.id.is_synthetic());
    }

    #[test]
    fn test_synthetic_identity() {
        let device = Device::new(
            Ipv4Addr::new(10, 0, 0, 7),
            None,
            Confidence::High,
            Utc::now(),
        );
        assert_eq!(device.id.as_str(), "ip-10.0.0.7");
        assert!(device.id.is_synthetic());
    }

    #[test]
    fn test_parse_normalizes_mac_ids() {
        assert_eq!(
            DeviceId::parse("A8-BB-50-01-02-03").as_str(),
            "a8:bb:50:01:02:03"
        );
        assert_eq!(DeviceId::parse("ip-10.0.0.7").as_str(), "ip-10.0.0.7");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(
            serde_json::to_string(&Confidence::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_device_json_shape() {
        let device = Device::new(
            Ipv4Addr::new(192, 168, 1, 5),
            None,
            Confidence::Medium,
            Utc::now(),
        );
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["ip"], "192.168.1.5");
        assert!(json.get("lastSeen").is_some());
        assert!(json.get("mac").is_none());
        let back: Device = serde_json::from_value(json).unwrap();
        assert_eq!(back, device);
    }
}
