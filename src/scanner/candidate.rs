//! Turning a probe reply into a candidate record.

use crate::protocol::Pilot;
use crate::types::{Confidence, Device, MacAddress};
use crate::vendor::VendorClassifier;
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;

/// Build the candidate for a host that answered a probe.
///
/// The MAC comes from the reply when it carries one, else from the neighbor
/// table. A reply is direct protocol evidence, so the candidate starts at
/// `high`; it drops to `medium` when a MAC is known and its vendor is not on
/// the allow-list.
pub fn build_candidate(
    ip: Ipv4Addr,
    pilot: &Pilot,
    arp_hint: Option<MacAddress>,
    classifier: &VendorClassifier,
    now: DateTime<Utc>,
) -> Device {
    let mac = pilot.mac_address().or(arp_hint);
    let verdict = classifier.classify(mac.as_ref());

    let confidence = match mac {
        Some(_) if !verdict.is_known_vendor => Confidence::Medium,
        _ => Confidence::High,
    };

    Device::new(ip, mac, confidence, now)
        .with_rssi(pilot.rssi)
        .with_state(pilot.to_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pilot(value: serde_json::Value) -> Pilot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_known_vendor_is_high() {
        let reply = pilot(json!({"mac": "a8bb50010203", "state": true, "dimming": 40, "rssi": -61}));
        let device = build_candidate(
            Ipv4Addr::new(192, 168, 1, 7),
            &reply,
            None,
            &VendorClassifier::default(),
            Utc::now(),
        );
        assert_eq!(device.id.as_str(), "a8:bb:50:01:02:03");
        assert_eq!(device.confidence, Confidence::High);
        assert_eq!(device.rssi, Some(-61));
        assert_eq!(device.state.brightness, Some(40));
    }

    #[test]
    fn test_unknown_vendor_is_medium() {
        let hint: MacAddress = "A8:FA:E0:01:02:03".parse().unwrap();
        let device = build_candidate(
            Ipv4Addr::new(192, 168, 1, 7),
            &pilot(json!({"state": true})),
            Some(hint),
            &VendorClassifier::default(),
            Utc::now(),
        );
        assert_eq!(device.mac, Some(hint));
        assert_eq!(device.confidence, Confidence::Medium);
    }

    #[test]
    fn test_no_mac_is_high_and_synthetic() {
        let device = build_candidate(
            Ipv4Addr::new(10, 0, 0, 9),
            &pilot(json!({"state": false})),
            None,
            &VendorClassifier::default(),
            Utc::now(),
        );
        assert!(device.id.is_synthetic());
        assert_eq!(device.confidence, Confidence::High);
    }
}
