//! JSON output formatting.

use serde::Serialize;
use std::io::{self, Write};

/// Write any serializable value as pretty JSON.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    writeln!(out, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, Device};
    use chrono::Utc;
    use std::net::Ipv4Addr;

    #[test]
    fn test_device_json_uses_camel_case() {
        let device = Device::new(Ipv4Addr::new(10, 0, 0, 2), None, Confidence::Medium, Utc::now());
        let mut buf = Vec::new();
        write_json(&mut buf, &[device]).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["id"], "ip-10.0.0.2");
        assert_eq!(value[0]["confidence"], "medium");
        assert!(value[0]["lastSeen"].is_string());
    }
}
