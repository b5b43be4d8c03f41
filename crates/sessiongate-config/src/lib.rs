//! Shared configuration for sessiongate.
//!
//! TOML file + `SESSIONGATE_` environment overlay, password resolution
//! (env + keyring + plaintext), and translation into the runtime types of
//! `sessiongate_core`. Core never reads config files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sessiongate_api::SessionEndpoints;
use sessiongate_core::{
    BatchAccounting, ConnectivityConfig, GateConfig, ProviderConfig, TlsVerification,
};

/// Keyring service name for stored provider passwords.
pub const KEYRING_SERVICE: &str = "sessiongate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for provider '{provider}'")]
    NoCredentials { provider: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gate: GateSection,

    #[serde(default)]
    pub connectivity: ConnectivitySection,

    /// Session providers, keyed by name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GateSection {
    #[serde(default = "default_recheck_delay")]
    pub recheck_delay_secs: u64,

    /// `all-providers` or `dispatched-only`.
    #[serde(default = "default_accounting")]
    pub accounting: String,

    /// Drop existing sessions before the first login batch.
    #[serde(default)]
    pub force_relogin: bool,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            recheck_delay_secs: default_recheck_delay(),
            accounting: default_accounting(),
            force_relogin: false,
        }
    }
}

fn default_recheck_delay() -> u64 {
    10
}
fn default_accounting() -> String {
    BatchAccounting::AllProviders.to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectivitySection {
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConnectivitySection {
    fn default() -> Self {
        Self {
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            interval_secs: default_interval(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_probe_host() -> String {
    "1.1.1.1".into()
}
fn default_probe_port() -> u16 {
    443
}
fn default_interval() -> u64 {
    15
}
fn default_probe_timeout() -> u64 {
    3
}

/// A named session provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderProfile {
    /// Endpoint base URL (e.g., "https://www.geocaching.com").
    pub url: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Optional session status endpoint.
    pub status_path: Option<String>,

    pub username: Option<String>,

    /// Plaintext password; prefer the keyring or `password_env`.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

fn default_login_path() -> String {
    "/api/login".into()
}
fn default_logout_path() -> String {
    "/api/logout".into()
}
fn default_enabled() -> bool {
    true
}

impl ProviderProfile {
    /// A profile with default paths and no credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            status_path: None,
            username: None,
            password: None,
            password_env: None,
            enabled: true,
            timeout: None,
            insecure: false,
            ca_cert: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sessiongate", "sessiongate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sessiongate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment.
///
/// A missing file yields the defaults. Environment variables use a
/// double underscore to separate nesting levels, e.g.
/// `SESSIONGATE_GATE__RECHECK_DELAY_SECS=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SESSIONGATE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent dirs.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring entry name for a provider password.
pub fn keyring_key(provider_name: &str) -> String {
    format!("{provider_name}/password")
}

/// Resolve a provider password: `password_env` → keyring → plaintext.
pub fn resolve_password(
    profile: &ProviderProfile,
    provider_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(provider_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        provider: provider_name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// Build a `ProviderConfig` from a profile, resolving its password.
pub fn profile_to_provider_config(
    profile: &ProviderProfile,
    provider_name: &str,
) -> Result<ProviderConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: format!("providers.{provider_name}.url"),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let username = profile
        .username
        .clone()
        .ok_or_else(|| ConfigError::NoCredentials {
            provider: provider_name.into(),
        })?;
    let password = resolve_password(profile, provider_name)?;

    let tls = if profile.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ProviderConfig {
        id: provider_name.into(),
        url,
        endpoints: SessionEndpoints {
            login_path: profile.login_path.clone(),
            logout_path: profile.logout_path.clone(),
            status_path: profile.status_path.clone(),
        },
        username,
        password,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(30)),
    })
}

/// Enabled providers in name order.
pub fn enabled_providers(cfg: &Config) -> impl Iterator<Item = (&String, &ProviderProfile)> {
    cfg.providers.iter().filter(|(_, p)| p.enabled)
}

/// Build the gate configuration, rejecting unknown accounting modes.
pub fn gate_config(section: &GateSection) -> Result<GateConfig, ConfigError> {
    let accounting =
        BatchAccounting::parse(&section.accounting).map_err(|e| ConfigError::Validation {
            field: "gate.accounting".into(),
            reason: e.to_string(),
        })?;

    if section.recheck_delay_secs == 0 {
        return Err(ConfigError::Validation {
            field: "gate.recheck_delay_secs".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    Ok(GateConfig {
        recheck_delay: Duration::from_secs(section.recheck_delay_secs),
        accounting,
    })
}

pub fn connectivity_config(section: &ConnectivitySection) -> ConnectivityConfig {
    ConnectivityConfig {
        probe_addr: format!("{}:{}", section.probe_host, section.probe_port),
        interval: Duration::from_secs(section.interval_secs.max(1)),
        timeout: Duration::from_secs(section.timeout_secs.max(1)),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
