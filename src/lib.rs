//! # lumiscan - discovery and control of smart lights
//!
//! lumiscan finds WiZ-style bulbs on the local network, keeps a registry of
//! what it has seen, and talks to them over their UDP JSON protocol.
//!
//! ## Features
//!
//! - **Subnet Scanning**: Batched, bounded-concurrency probing of a CIDR block
//! - **Confidence Scoring**: Protocol replies weighed against MAC vendor data
//! - **Reconciliation**: New observations merged into known records without
//!   ever losing information or downgrading confidence
//! - **Control**: Power, brightness, color temperature, RGB and scenes
//! - **Persistence**: Devices and groups stored as JSON on disk
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use lumiscan::protocol::WizClient;
//! use std::net::Ipv4Addr;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = WizClient::default();
//!     let ip = Ipv4Addr::new(192, 168, 1, 42);
//!
//!     if let Some(state) = client.get_state(ip).await {
//!         println!("power: {}", state.power);
//!     }
//!     client.set_power(ip, true).await;
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`subnet`] - CIDR arithmetic and local interface inspection
//! - [`protocol`] - Wire messages and the UDP request/reply client
//! - [`arp`] - Neighbor table lookup for MAC hints
//! - [`vendor`] - OUI to vendor classification
//! - [`registry`] - The device map and its merge policy
//! - [`scanner`] - Scan pass orchestration and progress reporting
//! - [`storage`] - Device and group persistence
//! - [`config`] - Settings and XDG paths
//! - [`error`] - Error types per concern

pub mod arp;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod protocol;
pub mod registry;
pub mod scanner;
pub mod scenes;
pub mod storage;
pub mod subnet;
pub mod types;
pub mod vendor;

// Re-export commonly used types
pub use error::{CliError, ProtocolError, ScanError, StorageError, SubnetError};
pub use protocol::WizClient;
pub use registry::{DeviceRegistry, MergeOutcome};
pub use scanner::{ScanOptions, ScanProgress, ScanSummary, Scanner};
pub use types::{Confidence, Device, DeviceId, DeviceState, MacAddress, ScanId, StateUpdate};
