//! Group management subcommand.
//!
//! Handles `lumiscan group add|remove|list`.

use super::{Context, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::types::DeviceId;
use clap::{Parser, Subcommand};
use std::io;

/// Manage groups.
#[derive(Parser, Debug)]
pub struct GroupCommand {
    #[command(subcommand)]
    pub action: GroupAction,
}

/// Group management actions.
#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Add devices to a group, creating it if needed
    Add {
        /// Group name
        group: String,

        /// Device ids, MACs or IP addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Remove devices from a group
    Remove {
        /// Group name
        group: String,

        /// Device ids, MACs or IP addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// List groups and their members
    List {
        /// Output format for results
        #[arg(short, long, value_enum, default_value = "plain")]
        output: OutputFormat,
    },
}

impl GroupCommand {
    /// Execute the group command.
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        match &self.action {
            GroupAction::Add { group, devices } => {
                for query in devices {
                    let device = ctx
                        .registry
                        .find(query)
                        .await
                        .ok_or_else(|| CliError::UnknownDevice(query.clone()))?;
                    ctx.registry.add_to_group(group, &device.id).await?;
                    if !quiet {
                        output::print_success(&format!("{} added to {}", device.id, group));
                    }
                }
                Ok(())
            }
            GroupAction::Remove { group, devices } => {
                for query in devices {
                    // evicted devices can still be removed by id
                    let id = match ctx.registry.find(query).await {
                        Some(device) => device.id,
                        None => DeviceId::parse(query),
                    };
                    ctx.registry.remove_from_group(group, &id).await?;
                    if !quiet {
                        output::print_success(&format!("{} removed from {}", id, group));
                    }
                }
                Ok(())
            }
            GroupAction::List { output: format } => {
                let groups = ctx.registry.store().list_groups()?;
                let stdout = io::stdout();
                let mut out = stdout.lock();
                match format {
                    OutputFormat::Json => output::write_json(&mut out, &groups)?,
                    _ => output::write_groups(&mut out, &groups)?,
                }
                Ok(())
            }
        }
    }
}
