//! Shared state for command handlers.

use super::{Cli, TargetArgs};
use crate::arp::SystemNeighborResolver;
use crate::config::{AppSettings, Paths};
use crate::error::{CliError, CliResult};
use crate::protocol::WizClient;
use crate::registry::DeviceRegistry;
use crate::scanner::Scanner;
use crate::storage::{DeviceStore, JsonDeviceStore, MemoryStore};
use crate::types::{DeviceId, DevicePatch, DeviceState};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// A light a command will talk to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Registry id, when the light is known.
    pub id: Option<DeviceId>,
    pub ip: Ipv4Addr,
    /// Last known state, when the light is known.
    pub state: Option<DeviceState>,
}

impl Target {
    /// Human-facing name: the id when known, else the address.
    pub fn label(&self) -> String {
        self.id
            .as_ref()
            .map_or_else(|| self.ip.to_string(), ToString::to_string)
    }
}

/// Everything a handler needs: settings, registry, and a protocol client.
pub struct Context {
    pub settings: AppSettings,
    pub registry: Arc<DeviceRegistry>,
    pub client: WizClient,
    pub scanner: Arc<Scanner>,
}

impl Context {
    /// Wire up settings, store, registry and scanner from the global flags.
    pub fn build(cli: &Cli) -> CliResult<Self> {
        let needs_paths = cli.config.is_none() || (!cli.ephemeral && cli.data_dir.is_none());
        let paths = if needs_paths {
            Some(Paths::resolve()?)
        } else {
            None
        };

        let settings = match (&cli.config, &paths) {
            (Some(file), _) => AppSettings::load_from(file)?,
            (None, Some(paths)) => AppSettings::load(paths)?,
            (None, None) => AppSettings::default(),
        };

        let store: Arc<dyn DeviceStore> = if cli.ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            let dir = match (&cli.data_dir, &paths) {
                (Some(dir), _) => dir.clone(),
                (None, Some(paths)) => paths.store_dir(),
                (None, None) => return Err(CliError::Other("no data directory".to_string())),
            };
            debug!(dir = %dir.display(), "opening device store");
            Arc::new(JsonDeviceStore::open(&dir)?)
        };

        Self::with_store(settings, store)
    }

    /// Build a context over an explicit store.
    pub fn with_store(settings: AppSettings, store: Arc<dyn DeviceStore>) -> CliResult<Self> {
        let registry = Arc::new(DeviceRegistry::load(store, settings.registry.stale_after())?);
        let client = WizClient::new(settings.probe_timeout());
        let classifier = Arc::new(settings.vendor.classifier()?);

        let scanner = Arc::new(Scanner::new(
            Arc::clone(&registry),
            Arc::new(client.clone()),
            Arc::new(SystemNeighborResolver),
            classifier,
        ));

        Ok(Self {
            settings,
            registry,
            client,
            scanner,
        })
    }

    /// Resolve a device argument or a group into concrete addresses.
    ///
    /// A bare IPv4 address that the registry does not know is still a valid
    /// target; it is simply not recorded afterwards.
    pub async fn resolve_targets(&self, args: &TargetArgs) -> CliResult<Vec<Target>> {
        if let Some(group) = &args.group {
            let members = self.registry.group_members(group).await?;
            if members.is_empty() {
                return Err(CliError::EmptyGroup(group.clone()));
            }
            return Ok(members
                .into_iter()
                .map(|d| Target {
                    id: Some(d.id),
                    ip: d.ip,
                    state: Some(d.state),
                })
                .collect());
        }

        let query = args.device.as_deref().unwrap_or_default();
        if let Some(device) = self.registry.find(query).await {
            return Ok(vec![Target {
                id: Some(device.id),
                ip: device.ip,
                state: Some(device.state),
            }]);
        }

        match query.trim().parse::<Ipv4Addr>() {
            Ok(ip) => Ok(vec![Target {
                id: None,
                ip,
                state: None,
            }]),
            Err(_) => Err(CliError::UnknownDevice(query.to_string())),
        }
    }

    /// Record a state the light just reported or accepted.
    pub async fn record_state(&self, target: &Target, state: DeviceState) {
        if let Some(id) = &target.id {
            self.registry.update(id, DevicePatch::state(state)).await;
        }
    }
}
