//! Scan subcommand implementation.
//!
//! Handles the `lumiscan scan [subnet]` command.

use super::{Context, OutputFormat};
use crate::error::CliResult;
use crate::output;
use crate::subnet;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Scan a subnet for lights.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Subnet to scan in CIDR notation
    ///
    /// Examples:
    ///   192.168.1.0/24     One home network
    ///   10.0.0.0/16        The largest accepted block
    ///
    /// Auto-detected from local interfaces when omitted.
    #[arg(value_name = "SUBNET")]
    pub subnet: Option<String>,

    /// Probes per batch (5-50)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-probe reply timeout in milliseconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Don't draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        let mut options = ctx.settings.scan_options().with_cancel(cancel_on_ctrl_c());
        if let Some(subnet) = &self.subnet {
            options.subnet = Some(subnet.clone());
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            options.timeout = Duration::from_millis(timeout);
        }
        if options.subnet.is_none() {
            options.subnet = Some(subnet::auto_detect_subnet());
        }

        // Print scan header (unless JSON/CSV output for clean parsing)
        let plain = self.output == OutputFormat::Plain;
        if !quiet && plain {
            output::print_info(&format!(
                "Scanning {} ({} probes per batch)",
                options.subnet.as_deref().unwrap_or_default(),
                options.batch_size()
            ));
        }

        let progress = (!quiet && plain && !self.no_progress).then(|| {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        });

        if let Some(pb) = &progress {
            let pb = pb.clone();
            ctx.scanner.on_progress(move |p| {
                pb.set_length(p.total as u64);
                pb.set_position(p.scanned as u64);
                pb.set_message(format!("{} found", p.found));
            });
        }

        let result = ctx.scanner.scan(options).await;
        ctx.scanner.clear_progress_observer();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let summary = result?;
        output::format_summary(&summary, self.output)?;
        Ok(())
    }
}

/// A flag that flips to `true` on the first Ctrl-C.
pub(super) fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                // keep the sender alive so the flag simply never flips
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}
