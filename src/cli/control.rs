//! Device control subcommands.
//!
//! Every command resolves its targets (one device or a whole group), talks to
//! them concurrently, and reports one line per light.

use super::{Context, OutputFormat, Target, TargetArgs};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scenes;
use crate::types::{DeviceState, Rgb, StateUpdate};
use clap::Parser;
use futures::future::join_all;
use serde_json::json;
use std::io;
use tracing::debug;

/// Query the current state of lights.
#[derive(Parser, Debug)]
pub struct StatusCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let targets = ctx.resolve_targets(&self.target).await?;
        let states = join_all(targets.iter().map(|t| ctx.client.get_state(t.ip))).await;

        let mut rows = Vec::with_capacity(targets.len());
        for (target, state) in targets.iter().zip(states) {
            if let Some(state) = &state {
                ctx.record_state(target, state.clone()).await;
            }
            rows.push((target, state));
        }

        if self.output == OutputFormat::Json {
            let value: Vec<_> = rows
                .iter()
                .map(|(t, s)| json!({"device": t.label(), "ip": t.ip, "state": s}))
                .collect();
            output::write_json(&mut io::stdout().lock(), &value)?;
        } else {
            for (target, state) in &rows {
                match state {
                    Some(state) => println!("{}  {}", target.label(), output::describe_state(state)),
                    None => output::print_warning(&format!("{} did not answer", target.label())),
                }
            }
        }

        ensure_any(&rows.iter().map(|(_, s)| s.is_some()).collect::<Vec<_>>())
    }
}

/// Desired power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PowerState {
    On,
    Off,
    /// Invert the last known state
    Toggle,
}

impl PowerState {
    /// The concrete on/off value, given what is known about the light.
    pub fn apply(self, current: Option<&DeviceState>) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => current.map_or(true, |state| !state.power),
        }
    }

    /// Like [`apply`](Self::apply), asking the light itself when a toggle
    /// targets a device with no recorded state.
    async fn resolve(self, ctx: &Context, target: &Target) -> bool {
        match (self, &target.state) {
            (Self::Toggle, None) => self.apply(ctx.client.get_state(target.ip).await.as_ref()),
            (_, current) => self.apply(current.as_ref()),
        }
    }
}

/// Turn lights on or off.
#[derive(Parser, Debug)]
pub struct PowerCommand {
    /// on, off or toggle
    #[arg(value_enum)]
    pub state: PowerState,

    #[command(flatten)]
    pub target: TargetArgs,
}

impl PowerCommand {
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        let targets = ctx.resolve_targets(&self.target).await?;
        let results = join_all(targets.iter().map(|t| async move {
            let on = self.state.resolve(ctx, t).await;
            (on, ctx.client.set_power(t.ip, on).await)
        }))
        .await;

        let outcomes: Vec<bool> = results.iter().map(|(_, ok)| *ok).collect();
        confirm_states(ctx, &targets, &outcomes).await;
        for (target, (on, ok)) in targets.iter().zip(results) {
            report(target, ok, &format!("power {}", if on { "on" } else { "off" }), quiet);
        }
        ensure_any(&outcomes)
    }
}

/// Set brightness, color temperature or color.
#[derive(Parser, Debug)]
pub struct SetCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Brightness percentage (10-100)
    #[arg(short, long)]
    pub brightness: Option<u8>,

    /// Color temperature in kelvin (2200-6500)
    #[arg(short = 'k', long)]
    pub temp: Option<u16>,

    /// Color as r,g,b
    #[arg(long, value_name = "R,G,B")]
    pub rgb: Option<Rgb>,

    /// Animation speed (0-200)
    #[arg(long)]
    pub speed: Option<u8>,

    /// Also switch the light on, off, or invert it
    #[arg(long, value_enum)]
    pub power: Option<PowerState>,
}

impl SetCommand {
    /// The update these flags describe for a light in state `current`.
    pub fn update(&self, current: Option<&DeviceState>) -> StateUpdate {
        StateUpdate {
            power: self.power.map(|p| p.apply(current)),
            brightness: self.brightness,
            color_temp: self.temp,
            rgb: self.rgb,
            speed: self.speed,
            scene_id: None,
        }
    }

    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        if self.update(None).is_empty() {
            return Err(CliError::Other(
                "nothing to set; pass --brightness, --temp, --rgb, --speed or --power".to_string(),
            ));
        }

        let targets = ctx.resolve_targets(&self.target).await?;
        let results = join_all(targets.iter().map(|t| async move {
            let mut update = self.update(t.state.as_ref()).clamped();
            if let Some(power) = self.power {
                update.power = Some(power.resolve(ctx, t).await);
            }
            ctx.client.set_state(t.ip, &update).await
        }))
        .await;

        confirm_states(ctx, &targets, &results).await;
        for (target, ok) in targets.iter().zip(&results) {
            report(target, *ok, "state updated", quiet);
        }
        ensure_any(&results)
    }
}

/// Start a built-in scene.
#[derive(Parser, Debug)]
pub struct SceneCommand {
    /// Scene id or name (see `lumiscan scenes`)
    pub scene: String,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Animation speed (0-200)
    #[arg(long)]
    pub speed: Option<u8>,
}

impl SceneCommand {
    pub async fn execute(&self, ctx: &Context, quiet: bool) -> CliResult<()> {
        let scene_id = scenes::resolve(&self.scene)
            .ok_or_else(|| CliError::Other(format!("unknown scene '{}'", self.scene)))?;

        let targets = ctx.resolve_targets(&self.target).await?;
        let results = join_all(
            targets
                .iter()
                .map(|t| ctx.client.set_scene(t.ip, scene_id, self.speed)),
        )
        .await;

        confirm_states(ctx, &targets, &results).await;
        let name = scenes::scene_name(scene_id).unwrap_or("scene");
        for (target, ok) in targets.iter().zip(&results) {
            report(target, *ok, name, quiet);
        }
        ensure_any(&results)
    }
}

/// Show firmware and module details.
#[derive(Parser, Debug)]
pub struct InfoCommand {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl InfoCommand {
    pub async fn execute(&self, ctx: &Context) -> CliResult<()> {
        let targets = ctx.resolve_targets(&self.target).await?;
        let configs = join_all(targets.iter().map(|t| ctx.client.get_system_config(t.ip))).await;

        let value: Vec<_> = targets
            .iter()
            .zip(&configs)
            .map(|(t, c)| json!({"device": t.label(), "ip": t.ip, "config": c}))
            .collect();
        output::write_json(&mut io::stdout().lock(), &value)?;

        ensure_any(&configs.iter().map(Option::is_some).collect::<Vec<_>>())
    }
}

/// Read back the state of every acknowledged, known light and record it.
///
/// An acknowledgement only says a reply arrived, so the registry is updated
/// from what the light reports afterwards rather than from what was asked.
async fn confirm_states(ctx: &Context, targets: &[Target], acknowledged: &[bool]) {
    let known = targets
        .iter()
        .zip(acknowledged)
        .filter(|(t, ok)| **ok && t.id.is_some())
        .map(|(t, _)| t);
    let states = join_all(known.map(|t| async move { (t, ctx.client.get_state(t.ip).await) })).await;

    for (target, state) in states {
        match state {
            Some(state) => ctx.record_state(target, state).await,
            None => debug!(device = %target.label(), "no state after acknowledged command"),
        }
    }
}

fn report(target: &Target, ok: bool, what: &str, quiet: bool) {
    if ok {
        if !quiet {
            output::print_success(&format!("{}: {}", target.label(), what));
        }
    } else {
        output::print_error(&format!("{}: no acknowledgement", target.label()));
    }
}

/// Fail the command only when no light at all responded.
fn ensure_any(outcomes: &[bool]) -> CliResult<()> {
    if outcomes.iter().any(|ok| *ok) {
        Ok(())
    } else {
        Err(CliError::Other("no device responded".to_string()))
    }
}
