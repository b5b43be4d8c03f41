//! Wiring from the loaded config to a running gate.
//!
//! Builds the provider registry, the connectivity source selected by
//! `--connectivity`, and the [`LoginGate`] that ties them together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sessiongate_config::{self as config, Config};
use sessiongate_core::{
    Connectivity, ConnectivityMonitor, HttpProvider, LoginGate, ProviderRegistry, RelogFlag,
    RelogPolicy, StaticConnectivity,
};

use crate::cli::{ConnectivityMode, GlobalOpts};
use crate::error::CliError;

/// The config file honoring `--config` / `SESSIONGATE_CONFIG`.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(config::load_config_from(&config_file(global))?)
}

/// Per-command overrides of the `[gate]` section.
#[derive(Debug, Default)]
pub struct GateOverrides {
    pub recheck_delay_secs: Option<u64>,
    pub force_relogin: bool,
}

enum ConnectivitySource {
    Fixed {
        state: Arc<StaticConnectivity>,
        // Kept so subscribers see an open channel that never changes.
        updates: watch::Sender<bool>,
    },
    Monitored(Arc<ConnectivityMonitor>),
}

/// Everything a long-running command needs.
pub struct GateRuntime {
    pub gate: LoginGate,
    pub registry: Arc<ProviderRegistry>,
    connectivity: ConnectivitySource,
    cancel: CancellationToken,
}

impl GateRuntime {
    pub async fn build(
        global: &GlobalOpts,
        cfg: &Config,
        overrides: &GateOverrides,
    ) -> Result<Self, CliError> {
        let registry = Arc::new(build_registry(cfg)?);
        if registry.is_empty() {
            return Err(CliError::NoProviders {
                path: config_file(global).display().to_string(),
            });
        }

        let mut gate_cfg = config::gate_config(&cfg.gate)?;
        if let Some(secs) = overrides.recheck_delay_secs {
            if secs == 0 {
                return Err(CliError::Validation {
                    field: "--recheck-delay".into(),
                    reason: "must be at least 1 second".into(),
                });
            }
            gate_cfg.recheck_delay = Duration::from_secs(secs);
        }

        let cancel = CancellationToken::new();
        let connectivity = match global.connectivity {
            ConnectivityMode::Auto => {
                let monitor = ConnectivityMonitor::start(
                    config::connectivity_config(&cfg.connectivity),
                    cancel.child_token(),
                )
                .await;
                ConnectivitySource::Monitored(monitor)
            }
            mode => {
                let online = mode == ConnectivityMode::Online;
                ConnectivitySource::Fixed {
                    state: Arc::new(StaticConnectivity::new(online)),
                    updates: watch::Sender::new(online),
                }
            }
        };

        let relog: Arc<dyn RelogPolicy> = Arc::new(RelogFlag::new(
            cfg.gate.force_relogin || overrides.force_relogin,
        ));
        let connected: Arc<dyn Connectivity> = match &connectivity {
            ConnectivitySource::Fixed { state, .. } => state.clone(),
            ConnectivitySource::Monitored(m) => m.clone(),
        };
        let gate = LoginGate::new(gate_cfg, connected, relog);

        debug!(providers = registry.len(), "gate runtime ready");
        Ok(Self {
            gate,
            registry,
            connectivity,
            cancel,
        })
    }

    /// Reachability updates, for the reconnect watcher.
    pub fn connectivity_updates(&self) -> watch::Receiver<bool> {
        match &self.connectivity {
            ConnectivitySource::Fixed { updates, .. } => updates.subscribe(),
            ConnectivitySource::Monitored(m) => m.subscribe(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match &self.connectivity {
            ConnectivitySource::Fixed { state, .. } => state.is_connected(),
            ConnectivitySource::Monitored(m) => m.is_connected(),
        }
    }

    pub fn shutdown(&self) {
        self.gate.shutdown();
        self.cancel.cancel();
    }
}

/// One [`HttpProvider`] per enabled profile.
pub fn build_registry(cfg: &Config) -> Result<ProviderRegistry, CliError> {
    let registry = ProviderRegistry::new();
    for (name, profile) in config::enabled_providers(cfg) {
        let provider_cfg = config::profile_to_provider_config(profile, name)?;
        let provider = HttpProvider::new(&provider_cfg)?;
        registry.register(Arc::new(provider));
    }
    Ok(registry)
}
