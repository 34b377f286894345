//! Monitor subcommand.
//!
//! Rescans on a fixed interval while a background sweeper evicts lights that
//! stopped answering. Runs until interrupted.

use super::Context;
use crate::error::{CliResult, ScanError};
use crate::output;
use crate::registry::spawn_sweeper;
use clap::Parser;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Rescan periodically and evict stale lights.
#[derive(Parser, Debug)]
pub struct MonitorCommand {
    /// Subnet to scan (CIDR); auto-detected when omitted
    #[arg(value_name = "SUBNET")]
    pub subnet: Option<String>,

    /// Seconds between scans
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Probes per batch (5-50)
    #[arg(short, long)]
    pub concurrency: Option<usize>,
}

impl MonitorCommand {
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        let registry_settings = &ctx.settings.registry;
        let interval = self
            .interval
            .map(|s| Duration::from_secs(s.max(1)))
            .unwrap_or_else(|| registry_settings.rescan_interval());

        let (evicted_tx, mut evicted_rx) = mpsc::channel(16);
        let sweeper = spawn_sweeper(
            ctx.registry.clone(),
            registry_settings.sweep_interval(),
            evicted_tx,
        );

        let mut cancel_rx = super::scan::cancel_on_ctrl_c();
        let scan_cancel = cancel_rx.clone();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        if !quiet {
            output::print_info(&format!(
                "monitoring every {}s, press Ctrl-C to stop",
                interval.as_secs()
            ));
        }

        loop {
            tokio::select! {
                _ = cancel_rx.changed() => break,
                Some(ids) = evicted_rx.recv() => {
                    for id in &ids {
                        info!(%id, "device went stale");
                    }
                    if !quiet {
                        output::print_warning(&format!("{} device(s) went stale", ids.len()));
                    }
                }
                _ = ticker.tick() => {
                    let mut options = ctx.settings.scan_options().with_cancel(scan_cancel.clone());
                    if let Some(subnet) = &self.subnet {
                        options.subnet = Some(subnet.clone());
                    }
                    if let Some(concurrency) = self.concurrency {
                        options.concurrency = concurrency;
                    }

                    match ctx.scanner.scan(options).await {
                        Ok(summary) => {
                            if !quiet {
                                output::print_info(&format!(
                                    "{} light(s) answered, {} new",
                                    summary.devices.len(),
                                    summary.new_devices
                                ));
                            }
                        }
                        Err(ScanError::ScanInProgress) => warn!("previous scan still running"),
                        Err(e) => {
                            sweeper.abort();
                            return Err(e.into());
                        }
                    }
                }
            }
        }

        sweeper.abort();
        info!("monitor stopped");
        Ok(())
    }
}
