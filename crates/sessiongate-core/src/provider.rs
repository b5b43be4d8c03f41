// ── Session providers ──
//
// A session provider is any remote endpoint that can report and change
// its logged-in status. The gate only ever asks `is_logged_in()`; login
// and logout results are logged but never interpreted.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use secrecy::SecretString;
use tracing::debug;

use sessiongate_api::SessionClient;

use crate::config::ProviderConfig;
use crate::error::CoreError;

/// Boxed future returned by provider login/logout.
pub type ProviderFuture<'a> = BoxFuture<'a, Result<(), CoreError>>;

/// An external authentication endpoint.
pub trait SessionProvider: Send + Sync {
    /// Stable identifier, used for logs and registry keys.
    fn id(&self) -> &str;

    /// Non-blocking query of the current session state.
    fn is_logged_in(&self) -> bool;

    fn login(&self) -> ProviderFuture<'_>;

    fn logout(&self) -> ProviderFuture<'_>;
}

/// Anything that can enumerate the currently active providers.
///
/// Queried afresh for every check, so the set may change between calls.
pub trait ProviderSource: Send + Sync {
    fn active(&self) -> Vec<Arc<dyn SessionProvider>>;
}

impl ProviderSource for Vec<Arc<dyn SessionProvider>> {
    fn active(&self) -> Vec<Arc<dyn SessionProvider>> {
        self.clone()
    }
}

// ── HttpProvider ─────────────────────────────────────────────────────

/// [`SessionProvider`] backed by a cookie-session HTTP endpoint.
pub struct HttpProvider {
    id: String,
    client: SessionClient,
    username: String,
    password: SecretString,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, CoreError> {
        let client = SessionClient::new(
            config.url.clone(),
            config.endpoints.clone(),
            &config.transport(),
        )?;
        Ok(Self::with_client(
            config.id.clone(),
            client,
            config.username.clone(),
            config.password.clone(),
        ))
    }

    pub fn with_client(
        id: String,
        client: SessionClient,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            id,
            client,
            username,
            password,
        }
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Verify the session against the remote status endpoint.
    pub async fn probe(&self) -> Result<(), CoreError> {
        self.client.probe().await.map_err(CoreError::from)
    }
}

impl SessionProvider for HttpProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_logged_in(&self) -> bool {
        self.client.is_logged_in()
    }

    fn login(&self) -> ProviderFuture<'_> {
        Box::pin(async move {
            self.client
                .login(&self.username, &self.password)
                .await
                .map_err(CoreError::from)
        })
    }

    fn logout(&self) -> ProviderFuture<'_> {
        Box::pin(async move { self.client.logout().await.map_err(CoreError::from) })
    }
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ── ProviderRegistry ─────────────────────────────────────────────────

struct Registration {
    provider: Arc<dyn SessionProvider>,
    enabled: bool,
}

/// Named set of providers that can be toggled at runtime.
///
/// [`active()`](ProviderSource::active) snapshots the enabled providers
/// sorted by id, so consumers see a stable order.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: DashMap<String, Registration>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider under its own id, enabled.
    ///
    /// Returns the provider previously registered under that id.
    pub fn register(&self, provider: Arc<dyn SessionProvider>) -> Option<Arc<dyn SessionProvider>> {
        let id = provider.id().to_owned();
        debug!(provider = %id, "registering session provider");
        self.entries
            .insert(
                id,
                Registration {
                    provider,
                    enabled: true,
                },
            )
            .map(|old| old.provider)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<dyn SessionProvider>> {
        self.entries.remove(id).map(|(_, reg)| reg.provider)
    }

    /// Enable or disable a provider. Returns `false` if the id is unknown.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(mut reg) => {
                reg.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries.get(id).map(|reg| reg.enabled)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SessionProvider>> {
        self.entries.get(id).map(|reg| Arc::clone(&reg.provider))
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProviderSource for ProviderRegistry {
    fn active(&self) -> Vec<Arc<dyn SessionProvider>> {
        let mut active: Vec<Arc<dyn SessionProvider>> = self
            .entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.provider))
            .collect();
        active.sort_by(|a, b| a.id().cmp(b.id()));
        active
    }
}
