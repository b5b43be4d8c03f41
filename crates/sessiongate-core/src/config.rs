// ── Runtime gate configuration ──
//
// These types describe how the gate behaves and how to reach each
// session provider. They carry credential data but never touch disk.
// The CLI builds them (via sessiongate-config) and hands them in.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use sessiongate_api::{SessionEndpoints, TlsMode, TransportConfig};

use crate::error::CoreError;

/// Delay between starting a login batch and re-checking provider state.
pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_secs(10);

/// How the in-flight counter is seeded when a login batch starts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BatchAccounting {
    /// Seed with the number of providers in the batch. Providers that are
    /// skipped never decrement, so the counter only drains when every
    /// provider was dispatched.
    #[default]
    AllProviders,
    /// Seed with the number of dispatched tasks; the counter always drains.
    DispatchedOnly,
}

impl BatchAccounting {
    /// Parse an accounting mode name, rejecting anything unknown.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::from_str(name).map_err(|_| CoreError::Validation {
            message: format!(
                "unknown batch accounting '{name}' (expected 'all-providers' or 'dispatched-only')"
            ),
        })
    }
}

/// Behaviour knobs for a [`LoginGate`](crate::LoginGate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// How long a deferred re-check waits after a batch is started.
    pub recheck_delay: Duration,
    /// Counter seeding for login batches.
    pub accounting: BatchAccounting,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            recheck_delay: DEFAULT_RECHECK_DELAY,
            accounting: BatchAccounting::default(),
        }
    }
}

/// TLS verification strategy for a provider endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed test servers).
    DangerAcceptInvalid,
}

/// Everything needed to build an HTTP session provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Stable provider name, used as registry key and in logs.
    pub id: String,
    /// Endpoint base URL.
    pub url: Url,
    pub endpoints: SessionEndpoints,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Build a [`TransportConfig`] for this provider.
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
            cookie_jar: None, // SessionClient::new adds one automatically
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
