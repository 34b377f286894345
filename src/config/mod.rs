//! Configuration management for lumiscan.
//!
//! Provides XDG-compliant configuration storage and the settings that seed
//! scans, registry lifecycle and vendor classification.

mod settings;

pub use settings::{AppSettings, Paths, RegistrySettings, ScanSettings, VendorSettings};
