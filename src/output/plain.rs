//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::ScanSummary;
use crate::storage::GroupMap;
use crate::types::{Confidence, Device, DeviceState};
use chrono::{DateTime, Utc};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "───────────────────────────────────────────────────────────────────────────";

/// Print a device table in human-readable plain text format.
pub fn write_devices<W: Write>(out: &mut W, devices: &[Device], now: DateTime<Utc>) -> io::Result<()> {
    if devices.is_empty() {
        writeln!(out, "  {}", style("No devices known.").dim())?;
        return Ok(());
    }

    writeln!(out, "  {}", style(RULE).dim())?;
    writeln!(
        out,
        "  {:<17}  {:<15}  {:<6}  {:<5}  {:<26}  {}",
        style("ID").bold(),
        style("IP").bold(),
        style("CONF").bold(),
        style("RSSI").bold(),
        style("STATE").bold(),
        style("SEEN").bold()
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;

    for device in devices {
        let confidence_style = match device.confidence {
            Confidence::High => Style::new().green().bold(),
            Confidence::Medium => Style::new().yellow(),
            Confidence::Low => Style::new().red(),
        };
        let rssi = device.rssi.map(|r| r.to_string()).unwrap_or_default();

        writeln!(
            out,
            "  {:<17}  {:<15}  {:<6}  {:<5}  {:<26}  {}",
            truncate_string(device.id.as_str(), 17),
            device.ip,
            confidence_style.apply_to(device.confidence.to_string()),
            rssi,
            describe_state(&device.state),
            style(format_age(now - device.last_seen)).dim()
        )?;
    }

    writeln!(out, "  {}", style(RULE).dim())?;
    writeln!(out, "  {} device(s)", style(devices.len()).bold())?;
    Ok(())
}

/// Print the summary line block of a finished scan followed by its devices.
pub fn write_scan_summary<W: Write>(out: &mut W, summary: &ScanSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} {}",
        style("Subnet:").bold(),
        summary.subnet
    )?;
    writeln!(
        out,
        "  {} {}",
        style("Scan ID:").bold(),
        style(summary.scan_id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {} of {} hosts probed in {:.2}s{}",
        style("Statistics:").bold(),
        summary.hosts_scanned,
        summary.total_hosts,
        summary.duration_ms as f64 / 1000.0,
        if summary.cancelled { " (cancelled)" } else { "" }
    )?;
    writeln!(
        out,
        "               {} found, {} new",
        style(summary.devices.len()).green().bold(),
        style(summary.new_devices).cyan()
    )?;
    writeln!(out)?;
    write_devices(out, &summary.devices, Utc::now())?;
    writeln!(out)?;
    Ok(())
}

/// Print groups and their members.
pub fn write_groups<W: Write>(out: &mut W, groups: &GroupMap) -> io::Result<()> {
    if groups.is_empty() {
        writeln!(out, "  {}", style("No groups defined.").dim())?;
        return Ok(());
    }
    for (name, members) in groups {
        writeln!(out, "  {} ({})", style(name).cyan().bold(), members.len())?;
        for id in members {
            writeln!(out, "    {} {}", style("•").dim(), id)?;
        }
    }
    Ok(())
}

/// Compact one-line rendering of a light state.
pub fn describe_state(state: &DeviceState) -> String {
    let mut parts = vec![if state.power { "on" } else { "off" }.to_string()];
    if let Some(brightness) = state.brightness {
        parts.push(format!("{}%", brightness));
    }
    if let Some(temp) = state.color_temp {
        parts.push(format!("{}K", temp));
    }
    if let Some(rgb) = state.rgb {
        parts.push(format!("rgb({})", rgb));
    }
    if let Some(scene) = state.scene_id {
        match crate::scenes::scene_name(scene) {
            Some(name) => parts.push(name.to_string()),
            None => parts.push(format!("scene {}", scene)),
        }
    }
    parts.join(" ")
}

fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rgb, MacAddress};
    use std::net::Ipv4Addr;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_describe_state() {
        let state = DeviceState {
            power: true,
            brightness: Some(80),
            color_temp: Some(4000),
            rgb: Some(Rgb::new(255, 0, 10)),
            scene_id: Some(5),
            ..Default::default()
        };
        assert_eq!(describe_state(&state), "on 80% 4000K rgb(255,0,10) Fireplace");
        assert_eq!(describe_state(&DeviceState::default()), "off");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(5)), "5s ago");
        assert_eq!(format_age(chrono::Duration::minutes(6)), "6m ago");
        assert_eq!(format_age(chrono::Duration::hours(2)), "2h ago");
    }

    #[test]
    fn test_write_devices() {
        let now = Utc::now();
        let mac: MacAddress = "a8:bb:50:00:00:01".parse().unwrap();
        let device = Device::new(Ipv4Addr::new(192, 168, 1, 9), Some(mac), Confidence::High, now);

        let mut buf = Vec::new();
        write_devices(&mut buf, &[device], now).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("a8:bb:50:00:00:01"));
        assert!(text.contains("192.168.1.9"));

        let mut buf = Vec::new();
        write_devices(&mut buf, &[], now).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("No devices"));
    }
}
