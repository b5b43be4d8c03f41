// Cookie-based session client
//
// Login/logout against a single remote endpoint. The login endpoint sets
// a session cookie in the client's jar; an optional status endpoint lets
// callers verify the session is still alive.

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// The HTTP client type session clients are built on.
pub type HttpClient = reqwest::Client;

/// Paths of the session endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoints {
    pub login_path: String,
    pub logout_path: String,
    /// Optional endpoint that answers 2xx while the session is valid
    /// and 401/403 once it is gone.
    pub status_path: Option<String>,
}

impl Default for SessionEndpoints {
    fn default() -> Self {
        Self {
            login_path: "/api/login".into(),
            logout_path: "/api/logout".into(),
            status_path: None,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP client holding one authenticated session.
///
/// `is_logged_in` is a local flag: set by a successful login or probe,
/// cleared by logout, a rejected login, or an expired probe. It never
/// touches the network.
pub struct SessionClient {
    http: HttpClient,
    base_url: Url,
    endpoints: SessionEndpoints,
    logged_in: AtomicBool,
}

impl SessionClient {
    /// Create a new session client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies).
    pub fn new(
        base_url: Url,
        endpoints: SessionEndpoints,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self::with_client(http, base_url, endpoints))
    }

    /// Create a session client with a pre-built `reqwest::Client`.
    pub fn with_client(http: HttpClient, base_url: Url, endpoints: SessionEndpoints) -> Self {
        Self {
            http,
            base_url,
            endpoints,
            logged_in: AtomicBool::new(false),
        }
    }

    /// Whether the last login or probe established a session.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    fn set_logged_in(&self, value: bool) {
        self.logged_in.store(value, Ordering::Release);
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    /// Authenticate with username/password.
    ///
    /// On success the session cookie is stored in the client's cookie jar
    /// and used for all subsequent requests.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint_url(&self.endpoints.login_path)?;
        debug!("logging in at {}", url);

        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };

        let resp = match self.http.post(url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.set_logged_in(false);
                return Err(Error::Transport(e));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            self.set_logged_in(false);
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        self.set_logged_in(true);
        debug!("login successful");
        Ok(())
    }

    /// End the current session.
    ///
    /// The local session flag is cleared even when the request fails:
    /// a half-closed session is treated as gone.
    pub async fn logout(&self) -> Result<(), Error> {
        self.set_logged_in(false);

        let url = self.endpoint_url(&self.endpoints.logout_path)?;
        debug!("logging out at {}", url);

        let resp = self.http.post(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!("logout complete");
        Ok(())
    }

    /// Ask the status endpoint whether the session is still valid.
    ///
    /// Without a configured status endpoint this only reports the local
    /// flag. 401/403 clears the flag and yields [`Error::SessionExpired`].
    pub async fn probe(&self) -> Result<(), Error> {
        let Some(ref status_path) = self.endpoints.status_path else {
            return if self.is_logged_in() {
                Ok(())
            } else {
                Err(Error::SessionExpired)
            };
        };

        let url = self.endpoint_url(status_path)?;
        debug!("probing session at {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status.is_success() {
            self.set_logged_in(true);
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.set_logged_in(false);
            return Err(Error::SessionExpired);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url.as_str())
            .field("endpoints", &self.endpoints)
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}
