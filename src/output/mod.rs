//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of device lists
//! and scan summaries.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{
    describe_state, print_error, print_info, print_success, print_warning, write_devices,
    write_groups, write_scan_summary,
};

use crate::cli::OutputFormat;
use crate::scanner::ScanSummary;
use crate::types::Device;
use chrono::Utc;
use std::io;

/// Format and print a device list according to the specified format.
pub fn format_devices(devices: &[Device], format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Plain => plain::write_devices(&mut out, devices, Utc::now()),
        OutputFormat::Json => json_format::write_json(&mut out, devices),
        OutputFormat::Csv => csv_format::write_csv(out, devices),
    }
}

/// Format and print a finished scan according to the specified format.
pub fn format_summary(summary: &ScanSummary, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Plain => plain::write_scan_summary(&mut out, summary),
        OutputFormat::Json => json_format::write_json(&mut out, summary),
        OutputFormat::Csv => csv_format::write_csv(out, &summary.devices),
    }
}
