//! Registry inspection subcommands.

use super::{Context, OutputFormat};
use crate::error::CliResult;
use crate::output;
use crate::scenes::SCENES;
use crate::types::Confidence;
use clap::Parser;
use serde_json::json;
use std::io;
use tracing::debug;

/// List known lights.
#[derive(Parser, Debug)]
pub struct DevicesCommand {
    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Only show members of this group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Hide devices below this confidence
    #[arg(long, value_enum, ignore_case = true)]
    pub min_confidence: Option<Confidence>,
}

impl DevicesCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let mut devices = match &self.group {
            Some(group) => ctx.registry.group_members(group).await?,
            None => ctx.registry.list().await,
        };
        if let Some(min) = self.min_confidence {
            devices.retain(|d| d.confidence >= min);
        }

        output::format_devices(&devices, self.output)?;
        Ok(())
    }
}

/// Forget lights not seen within the staleness threshold.
///
/// Removes them from the registry and deletes their stored records, so they
/// stay gone until a scan finds them again.
#[derive(Parser, Debug)]
pub struct PruneCommand {
    /// Override the staleness threshold, in seconds
    #[arg(long, value_name = "SECS")]
    pub older_than: Option<u64>,
}

impl PruneCommand {
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        let threshold = match self.older_than {
            Some(secs) => chrono::Duration::from_std(std::time::Duration::from_secs(secs))
                .unwrap_or_else(|_| chrono::Duration::days(36_500)),
            None => ctx.registry.stale_after(),
        };
        let evicted = ctx
            .registry
            .remove_older_than(threshold, chrono::Utc::now())
            .await;

        let deleted = ctx.registry.store().delete_stale(threshold)?;
        debug!(evicted = evicted.len(), deleted, "pruned stale devices");

        if !quiet {
            output::print_info(&format!("pruned {} device(s)", evicted.len()));
            for id in &evicted {
                println!("  {}", id);
            }
        }
        Ok(())
    }
}

/// List built-in scenes.
#[derive(Parser, Debug)]
pub struct ScenesCommand {
    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl ScenesCommand {
    pub fn execute(&self) -> CliResult<()> {
        match self.output {
            OutputFormat::Json => {
                let value: Vec<_> = SCENES
                    .iter()
                    .map(|(id, name)| json!({"id": id, "name": name}))
                    .collect();
                output::write_json(&mut io::stdout().lock(), &value)?;
            }
            OutputFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(io::stdout().lock());
                wtr.write_record(["id", "name"]).map_err(io::Error::from)?;
                for (id, name) in SCENES {
                    wtr.write_record([id.to_string().as_str(), *name])
                        .map_err(io::Error::from)?;
                }
                wtr.flush()?;
            }
            OutputFormat::Plain => {
                for (id, name) in SCENES {
                    println!("  {:>4}  {}", id, name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::config::AppSettings;
    use crate::storage::{DeviceStore, JsonDeviceStore};
    use crate::types::Device;
    use chrono::{Duration, Utc};
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_min_confidence_flag() {
        let cli = Cli::try_parse_from(["lumiscan", "devices", "--min-confidence", "HIGH"]).unwrap();
        match cli.command {
            Commands::Devices(cmd) => assert_eq!(cmd.min_confidence, Some(Confidence::High)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["lumiscan", "devices", "--min-confidence", "certain"]).is_err());
    }

    #[tokio::test]
    async fn test_prune_survives_restart() {
        let dir = TempDir::new().unwrap();
        let stale = Device::new(
            Ipv4Addr::new(10, 0, 0, 7),
            None,
            Confidence::High,
            Utc::now() - Duration::hours(2),
        );
        let fresh = Device::new(Ipv4Addr::new(10, 0, 0, 8), None, Confidence::High, Utc::now());
        {
            let store = JsonDeviceStore::open(dir.path()).unwrap();
            store.save_device(&stale).unwrap();
            store.save_device(&fresh).unwrap();
        }

        let open = || {
            Context::with_store(
                AppSettings::default(),
                Arc::new(JsonDeviceStore::open(dir.path()).unwrap()),
            )
            .unwrap()
        };

        let ctx = open();
        PruneCommand { older_than: None }
            .execute(&ctx, true)
            .await
            .unwrap();
        assert!(ctx.registry.get(&stale.id).await.is_none());

        let reopened = open();
        let ids: Vec<_> = reopened.registry.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![fresh.id]);
    }
}
