//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `lumiscan scan [subnet]` - Discover lights on a subnet
//! - `lumiscan devices` - List known lights
//! - `lumiscan status|power|set|scene|info <device>` - Talk to a light
//! - `lumiscan group add|remove|list` - Manage groups
//! - `lumiscan monitor` - Rescan periodically and evict stale lights

mod context;
mod control;
mod devices;
mod groups;
mod monitor;
mod scan;

pub use context::{Context, Target};
pub use control::{InfoCommand, PowerCommand, PowerState, SceneCommand, SetCommand, StatusCommand};
pub use devices::{DevicesCommand, PruneCommand, ScenesCommand};
pub use groups::{GroupAction, GroupCommand};
pub use monitor::MonitorCommand;
pub use scan::ScanCommand;

use crate::error::CliResult;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// lumiscan - discover and control smart lights on the local network.
///
/// Finds bulbs that speak the WiZ UDP protocol, keeps a registry of what it
/// has seen, and sends them power, color and scene commands.
#[derive(Parser, Debug)]
#[command(name = "lumiscan")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover and control smart lights", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH", env = "LUMISCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the device store
    #[arg(long, global = true, value_name = "DIR", env = "LUMISCAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep devices in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a subnet for lights
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// List known lights
    #[command(alias = "ls")]
    Devices(DevicesCommand),

    /// Query the current state of lights
    Status(StatusCommand),

    /// Turn lights on or off
    Power(PowerCommand),

    /// Set brightness, color temperature or color
    Set(SetCommand),

    /// Start a built-in scene
    Scene(SceneCommand),

    /// List built-in scenes
    Scenes(ScenesCommand),

    /// Show firmware and module details
    Info(InfoCommand),

    /// Evict stale lights
    Prune(PruneCommand),

    /// Manage groups
    #[command(alias = "g")]
    Group(GroupCommand),

    /// Rescan periodically and evict stale lights
    Monitor(MonitorCommand),
}

/// Which lights a control command addresses.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Device id, MAC or IP address
    #[arg(value_name = "DEVICE", required_unless_present = "group")]
    pub device: Option<String>,

    /// Address every member of a group instead
    #[arg(short, long, conflicts_with = "device")]
    pub group: Option<String>,
}

impl Cli {
    /// Dispatch to the selected subcommand.
    pub async fn execute(&self) -> CliResult<()> {
        if let Commands::Scenes(cmd) = &self.command {
            return cmd.execute();
        }

        let ctx = Context::build(self)?;
        let quiet = self.quiet;

        match &self.command {
            Commands::Scan(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Devices(cmd) => cmd.execute(&ctx).await,
            Commands::Status(cmd) => cmd.execute(&ctx).await,
            Commands::Power(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Set(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Scene(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Info(cmd) => cmd.execute(&ctx).await,
            Commands::Prune(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Group(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Monitor(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Scenes(cmd) => cmd.execute(),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_power_group() {
        let cli = Cli::try_parse_from(["lumiscan", "power", "on", "--group", "hall"]).unwrap();
        match cli.command {
            Commands::Power(cmd) => {
                assert_eq!(cmd.state, PowerState::On);
                assert_eq!(cmd.target.group.as_deref(), Some("hall"));
                assert!(cmd.target.device.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_target_required() {
        assert!(Cli::try_parse_from(["lumiscan", "status"]).is_err());
        assert!(Cli::try_parse_from(["lumiscan", "status", "10.0.0.2", "-g", "x"]).is_err());
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from(["lumiscan", "--ephemeral", "scan", "10.0.0.0/24", "-c", "40"])
            .unwrap();
        assert!(cli.ephemeral);
        match cli.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.subnet.as_deref(), Some("10.0.0.0/24"));
                assert_eq!(cmd.concurrency, Some(40));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
