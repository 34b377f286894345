//! CSV output formatting.

use crate::types::Device;
use std::io::{self, Write};

/// Write devices in CSV format.
pub fn write_csv<W: Write>(out: W, devices: &[Device]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record([
        "id",
        "ip",
        "mac",
        "confidence",
        "last_seen",
        "rssi",
        "power",
        "brightness",
        "color_temp",
        "scene_id",
        "groups",
    ])?;

    for device in devices {
        let state = &device.state;
        let optional = |v: Option<String>| v.unwrap_or_default();
        wtr.write_record([
            device.id.to_string(),
            device.ip.to_string(),
            optional(device.mac.map(|m| m.to_string())),
            device.confidence.to_string(),
            device.last_seen.to_rfc3339(),
            optional(device.rssi.map(|r| r.to_string())),
            if state.power { "on" } else { "off" }.to_string(),
            optional(state.brightness.map(|b| b.to_string())),
            optional(state.color_temp.map(|t| t.to_string())),
            optional(state.scene_id.map(|s| s.to_string())),
            device.groups.iter().cloned().collect::<Vec<_>>().join(";"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, DeviceState};
    use chrono::Utc;
    use std::net::Ipv4Addr;

    #[test]
    fn test_csv_rows() {
        let mut device = Device::new(Ipv4Addr::new(10, 0, 0, 2), None, Confidence::High, Utc::now())
            .with_state(DeviceState {
                power: true,
                brightness: Some(55),
                ..Default::default()
            });
        device.groups.insert("den".to_string());
        device.groups.insert("all".to_string());

        let mut buf = Vec::new();
        write_csv(&mut buf, &[device]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,ip,mac"));
        assert!(lines[1].starts_with("ip-10.0.0.2,10.0.0.2,,high,"));
        assert!(lines[1].ends_with(",on,55,,,all;den"));
    }
}
