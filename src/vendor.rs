//! MAC vendor classification.
//!
//! Maps the OUI of a MAC address to a manufacturer name and checks that name
//! against an allow-list of vendors known to ship the bulbs' radio modules.
//! A built-in table covers the common light vendors; a full IEEE `oui.csv`
//! can be loaded on top of it.

use crate::error::{ConfigError, ConfigResult};
use crate::types::MacAddress;
use std::collections::HashMap;
use std::path::Path;

/// Substrings of vendor names treated as genuine light hardware.
pub const DEFAULT_ALLOW_LIST: &[&str] = &["wiz", "signify", "philips", "espressif"];

/// Small built-in OUI table.
const BUILTIN_OUIS: &[([u8; 3], &str)] = &[
    ([0xa8, 0xbb, 0x50], "WiZ IoT Company Limited"),
    ([0x44, 0x4f, 0x8e], "WiZ IoT Company Limited"),
    ([0xd8, 0xa0, 0x11], "WiZ IoT Company Limited"),
    ([0x6c, 0x29, 0x90], "WiZ Connected Lighting Company Limited"),
    ([0x00, 0x17, 0x88], "Philips Lighting BV"),
    ([0x24, 0x0a, 0xc4], "Espressif Inc."),
    ([0x24, 0x62, 0xab], "Espressif Inc."),
    ([0x30, 0xae, 0xa4], "Espressif Inc."),
    ([0x60, 0x01, 0x94], "Espressif Inc."),
    ([0x84, 0xf3, 0xeb], "Espressif Inc."),
    ([0xa4, 0xcf, 0x12], "Espressif Inc."),
    ([0xbc, 0xdd, 0xc2], "Espressif Inc."),
    ([0xcc, 0x50, 0xe3], "Espressif Inc."),
    ([0xdc, 0x4f, 0x22], "Espressif Inc."),
    ([0xec, 0xfa, 0xbc], "Espressif Inc."),
    ([0xb8, 0x27, 0xeb], "Raspberry Pi Foundation"),
    ([0xdc, 0xa6, 0x32], "Raspberry Pi Trading Ltd"),
    ([0xf0, 0x9f, 0xc2], "Ubiquiti Inc"),
    ([0x50, 0xc7, 0xbf], "TP-LINK TECHNOLOGIES CO.,LTD."),
];

/// Outcome of classifying a MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VendorVerdict {
    /// The vendor matched the allow-list.
    pub is_known_vendor: bool,
    /// Vendor name from the OUI table, when found.
    pub vendor_name: Option<String>,
}

/// OUI lookup plus allow-list matching.
#[derive(Debug, Clone)]
pub struct VendorClassifier {
    ouis: HashMap<[u8; 3], String>,
    allow_list: Vec<String>,
}

impl Default for VendorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()))
    }
}

impl VendorClassifier {
    /// Create a classifier over the built-in table with a custom allow-list.
    pub fn new(allow_list: impl IntoIterator<Item = String>) -> Self {
        let ouis = BUILTIN_OUIS
            .iter()
            .map(|(oui, name)| (*oui, name.to_string()))
            .collect();
        Self {
            ouis,
            allow_list: allow_list
                .into_iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Add or override a single OUI entry.
    pub fn insert(&mut self, oui: [u8; 3], vendor: impl Into<String>) {
        self.ouis.insert(oui, vendor.into());
    }

    /// Number of known OUIs.
    pub fn len(&self) -> usize {
        self.ouis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ouis.is_empty()
    }

    /// Load entries from an IEEE-format `oui.csv`.
    ///
    /// Expected columns: `Registry,Assignment,Organization Name,...` where
    /// `Assignment` is six hex digits. Rows that do not parse are skipped.
    /// Returns the number of entries added.
    pub fn load_csv(&mut self, path: &Path) -> ConfigResult<usize> {
        let oui_error = |reason: String| ConfigError::OuiDatabase {
            path: path.to_path_buf(),
            reason,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| oui_error(e.to_string()))?;

        let mut added = 0;
        for record in reader.records() {
            let record = record.map_err(|e| oui_error(e.to_string()))?;
            let (Some(assignment), Some(name)) = (record.get(1), record.get(2)) else {
                continue;
            };
            if let Some(oui) = parse_oui(assignment) {
                self.ouis.insert(oui, name.trim().to_string());
                added += 1;
            }
        }

        tracing::debug!(path = %path.display(), added, "loaded OUI database");
        Ok(added)
    }

    /// Look up the vendor name for a MAC.
    pub fn vendor_name(&self, mac: &MacAddress) -> Option<&str> {
        self.ouis.get(&mac.oui()).map(String::as_str)
    }

    /// Classify a MAC. A missing MAC or unknown OUI is simply not a known vendor.
    pub fn classify(&self, mac: Option<&MacAddress>) -> VendorVerdict {
        let Some(name) = mac.and_then(|mac| self.vendor_name(mac)) else {
            return VendorVerdict::default();
        };
        let lowered = name.to_lowercase();
        VendorVerdict {
            is_known_vendor: self.allow_list.iter().any(|s| lowered.contains(s.as_str())),
            vendor_name: Some(name.to_string()),
        }
    }
}

/// Parse `A8BB50`, `A8-BB-50` or `a8:bb:50`.
fn parse_oui(raw: &str) -> Option<[u8; 3]> {
    let hex: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let mut oui = [0u8; 3];
    for (i, slot) in oui.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(oui)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_known_vendor() {
        let classifier = VendorClassifier::default();
        let verdict = classifier.classify(Some(&mac("A8:BB:50:06:03:3D")));
        assert!(verdict.is_known_vendor);
        assert_eq!(verdict.vendor_name.as_deref(), Some("WiZ IoT Company Limited"));
    }

    #[test]
    fn test_listed_but_not_allowed() {
        let classifier = VendorClassifier::default();
        let verdict = classifier.classify(Some(&mac("b8:27:eb:00:00:01")));
        assert!(!verdict.is_known_vendor);
        assert_eq!(verdict.vendor_name.as_deref(), Some("Raspberry Pi Foundation"));
    }

    #[test]
    fn test_unknown_or_missing_mac() {
        let classifier = VendorClassifier::default();
        assert_eq!(
            classifier.classify(Some(&mac("a8:fa:e0:01:02:03"))),
            VendorVerdict::default()
        );
        assert_eq!(classifier.classify(None), VendorVerdict::default());
    }

    #[test]
    fn test_allow_list_case_insensitive() {
        let classifier = VendorClassifier::new(vec!["RASPBERRY".to_string()]);
        assert!(classifier
            .classify(Some(&mac("b8:27:eb:00:00:01")))
            .is_known_vendor);
        assert!(!classifier
            .classify(Some(&mac("a8:bb:50:00:00:01")))
            .is_known_vendor);
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Registry,Assignment,Organization Name,Organization Address").unwrap();
        writeln!(file, "MA-L,A8FAE0,\"Example Lighting Espressif Partner\",\"Somewhere\"").unwrap();
        writeln!(file, "MA-L,XYZ,Broken,Nowhere").unwrap();
        file.flush().unwrap();

        let mut classifier = VendorClassifier::default();
        let before = classifier.len();
        assert_eq!(classifier.load_csv(file.path()).unwrap(), 1);
        assert_eq!(classifier.len(), before + 1);
        assert!(classifier
            .classify(Some(&mac("a8:fa:e0:01:02:03")))
            .is_known_vendor);
    }

    #[test]
    fn test_parse_oui_forms() {
        assert_eq!(parse_oui("A8BB50"), Some([0xa8, 0xbb, 0x50]));
        assert_eq!(parse_oui("a8-bb-50"), Some([0xa8, 0xbb, 0x50]));
        assert_eq!(parse_oui("a8bb5"), None);
    }
}
