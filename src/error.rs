//! Error types for lumiscan.
//!
//! Uses `thiserror` for ergonomic error definitions. Each concern gets its own
//! enum so callers can tell setup failures apart from per-host network noise.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from CIDR parsing and host enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubnetError {
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("invalid prefix length in '{0}' (expected 0-32)")]
    InvalidPrefix(String),

    #[error("subnet {cidr} too large: {addresses} addresses (max: {max})")]
    TooLarge {
        cidr: String,
        addresses: u64,
        max: u64,
    },
}

/// Result type alias for subnet operations.
pub type SubnetResult<T> = Result<T, SubnetError>;

/// Errors from a single request/response exchange with a device.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("no reply within {0} ms")]
    Timeout(u64),

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("device returned error {code}: {message}")]
    Device { code: i64, message: String },

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Whether this failure just means "nothing answered at that address".
    ///
    /// Timeouts and transport errors are the normal outcome when probing an
    /// empty address, so the scanner treats them as absence.
    pub fn is_expected_absence(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that abort a scan pass before any probing starts.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error(transparent)]
    Subnet(#[from] SubnetError),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors from the device store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage directory error: {0}")]
    DirectoryError(String),

    #[error("failed to save record: {0}")]
    SaveFailed(String),

    #[error("failed to load record: {0}")]
    LoadFailed(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directories")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("failed to load OUI database {path}: {reason}")]
    OuiDatabase { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by CLI command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Subnet(#[from] SubnetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("no device matches '{0}'")]
    UnknownDevice(String),

    #[error("group '{0}' has no members")]
    EmptyGroup(String),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_absence() {
        assert!(ProtocolError::Timeout(2000).is_expected_absence());
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert!(ProtocolError::Network(refused).is_expected_absence());
        assert!(!ProtocolError::Malformed("x".into()).is_expected_absence());
    }

    #[test]
    fn test_scan_in_progress_message() {
        assert_eq!(
            ScanError::ScanInProgress.to_string(),
            "a scan is already in progress"
        );
    }
}
