//! Hardware address newtype.
//!
//! Neighbor tables and device firmware disagree on MAC formatting: `arp -a`
//! on BSD-derived systems drops leading zeros (`a8:bb:50:1:2:3`), Windows uses
//! dashes, and the bulbs themselves report twelve bare hex digits. All of them
//! parse into the same `MacAddress`, which always prints in the canonical
//! lowercase, colon-separated, zero-padded form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated 48-bit MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Create a MAC address from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The organizationally unique identifier (first three octets).
    pub const fn oui(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// All-zero addresses show up for incomplete neighbor entries.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Broadcast address `ff:ff:ff:ff:ff:ff`.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Error type for MAC address parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || MacParseError(s.to_string());
        let mut octets = [0u8; 6];

        if trimmed.contains([':', '-']) {
            let parts: Vec<&str> = trimmed.split([':', '-']).collect();
            if parts.len() != 6 {
                return Err(err());
            }
            for (slot, part) in octets.iter_mut().zip(parts) {
                if part.is_empty() || part.len() > 2 {
                    return Err(err());
                }
                *slot = u8::from_str_radix(part, 16).map_err(|_| err())?;
            }
        } else {
            if trimmed.len() != 12 || !trimmed.is_ascii() {
                return Err(err());
            }
            for (i, slot) in octets.iter_mut().enumerate() {
                *slot = u8::from_str_radix(&trimmed[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
            }
        }

        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}
