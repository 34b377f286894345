//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and data.

use crate::error::{ConfigError, ConfigResult};
use crate::protocol::DEFAULT_TIMEOUT;
use crate::registry::DEFAULT_STALE_AFTER;
use crate::scanner::{ScanOptions, DEFAULT_BATCH_DELAY, DEFAULT_CONCURRENCY};
use crate::vendor::{VendorClassifier, DEFAULT_ALLOW_LIST};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/lumiscan)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/lumiscan)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve paths using XDG directories, creating them if needed.
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "lumiscan", "lumiscan")
            .ok_or(ConfigError::DirectoryNotFound)?;
        Self::at(project.config_dir(), project.data_dir())
    }

    /// Use explicit directories, creating them if needed.
    pub fn at(config_dir: &Path, data_dir: &Path) -> ConfigResult<Self> {
        fs::create_dir_all(config_dir)?;
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Root of the device store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

/// Scan defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Subnet to scan when none is given; auto-detected when unset.
    pub subnet: Option<String>,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub batch_delay_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            subnet: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            batch_delay_ms: DEFAULT_BATCH_DELAY.as_millis() as u64,
        }
    }
}

/// Registry lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Devices unseen for longer than this are evicted.
    pub stale_after_secs: u64,
    /// How often monitor mode sweeps for stale devices.
    pub sweep_interval_secs: u64,
    /// How often monitor mode rescans.
    pub rescan_interval_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            stale_after_secs: DEFAULT_STALE_AFTER.as_secs(),
            sweep_interval_secs: 60,
            rescan_interval_secs: 120,
        }
    }
}

impl RegistrySettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_secs(self.rescan_interval_secs.max(1))
    }
}

/// Vendor classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorSettings {
    /// IEEE `oui.csv` loaded on top of the built-in table.
    pub oui_csv: Option<PathBuf>,
    pub allow_list: Vec<String>,
}

impl Default for VendorSettings {
    fn default() -> Self {
        Self {
            oui_csv: None,
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl VendorSettings {
    /// Build the classifier these settings describe.
    pub fn classifier(&self) -> ConfigResult<VendorClassifier> {
        let mut classifier = VendorClassifier::new(self.allow_list.iter().cloned());
        if let Some(path) = &self.oui_csv {
            classifier.load_csv(path)?;
        }
        Ok(classifier)
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub scan: ScanSettings,
    pub registry: RegistrySettings,
    pub vendor: VendorSettings,
}

impl AppSettings {
    /// Load settings from the default location, or defaults if absent.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Save settings to the default location.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        self.save_to(&paths.settings_file())
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Scan options seeded from these defaults.
    pub fn scan_options(&self) -> ScanOptions {
        let mut options = ScanOptions::default()
            .with_concurrency(self.scan.concurrency)
            .with_timeout(Duration::from_millis(self.scan.timeout_ms))
            .with_batch_delay(Duration::from_millis(self.scan.batch_delay_ms));
        options.subnet = self.scan.subnet.clone();
        options
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.scan.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.scan.concurrency, 20);
        assert_eq!(settings.scan.timeout_ms, 2000);
        assert_eq!(settings.registry.stale_after(), Duration::from_secs(300));
        assert_eq!(settings.vendor.allow_list.len(), 4);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, r#"{"scan": {"subnet": "10.0.0.0/24"}}"#).unwrap();

        let settings = AppSettings::load_from(&file).unwrap();
        assert_eq!(settings.scan.subnet.as_deref(), Some("10.0.0.0/24"));
        assert_eq!(settings.scan.concurrency, 20);
        assert_eq!(settings.registry, RegistrySettings::default());

        let options = settings.scan_options();
        assert_eq!(options.subnet.as_deref(), Some("10.0.0.0/24"));
        assert_eq!(options.batch_size(), 20);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(&dir.path().join("config"), &dir.path().join("data")).unwrap();

        let mut settings = AppSettings::default();
        settings.registry.stale_after_secs = 900;
        settings.save(&paths).unwrap();

        assert_eq!(AppSettings::load(&paths).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(&dir.path().join("c"), &dir.path().join("d")).unwrap();
        assert_eq!(AppSettings::load(&paths).unwrap(), AppSettings::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, "not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(&file),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
