// ── Core error types ──
//
// User-facing errors from sessiongate-core. Consumers never see HTTP
// status codes directly; the `From<sessiongate_api::Error>` impl
// translates transport-layer errors into domain variants.
//
// The gate itself never returns these: its health signal is binary.
// They surface from provider construction, login/logout calls and
// configuration parsing.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Provider errors ──────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    #[error("Request timed out")]
    Timeout,

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sessiongate_api::Error> for CoreError {
    fn from(err: sessiongate_api::Error) -> Self {
        match err {
            sessiongate_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sessiongate_api::Error::SessionExpired => CoreError::SessionExpired,
            sessiongate_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            sessiongate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sessiongate_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            sessiongate_api::Error::UnexpectedStatus { status, body } => CoreError::Api {
                message: body,
                status: Some(status),
            },
        }
    }
}
