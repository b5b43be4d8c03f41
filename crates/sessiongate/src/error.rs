//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sessiongate_config::ConfigError;
use sessiongate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const LOGIN_ISSUE: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Login state ──────────────────────────────────────────────────

    #[error("Login issue: none of {total} provider(s) has a session")]
    #[diagnostic(
        code(sessiongate::login_issue),
        help(
            "Check credentials with: sessiongate providers --test\n\
             Run with -v to see each login attempt."
        )
    )]
    LoginIssue { total: usize },

    // ── Providers ────────────────────────────────────────────────────

    #[error("No session providers are configured")]
    #[diagnostic(
        code(sessiongate::no_providers),
        help(
            "Add one with: sessiongate config init\n\
             Expected config at: {path}"
        )
    )]
    NoProviders { path: String },

    #[error("No credentials configured for provider '{provider}'")]
    #[diagnostic(
        code(sessiongate::no_credentials),
        help(
            "Set username and password_env in the provider section, or run:\n\
             sessiongate config set-password --provider {provider}"
        )
    )]
    NoCredentials { provider: String },

    #[error("Provider '{provider}' not found in configuration")]
    #[diagnostic(
        code(sessiongate::provider_not_found),
        help("Run: sessiongate providers to see configured providers")
    )]
    ProviderNotFound { provider: String },

    #[error("Could not reach {url}")]
    #[diagnostic(
        code(sessiongate::connection_failed),
        help("Check the provider URL and your network connection.")
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(sessiongate::timeout),
        help("Increase `timeout` in the provider section.")
    )]
    Timeout,

    #[error("Provider request failed: {message}")]
    #[diagnostic(code(sessiongate::provider_failed))]
    ProviderFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sessiongate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(sessiongate::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(sessiongate::output))]
    Output(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(sessiongate::keyring),
        help("Use password_env in the provider section if no keyring is available.")
    )]
    Keyring(#[from] keyring::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LoginIssue { .. } | Self::NoCredentials { .. } => exit_code::LOGIN_ISSUE,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoProviders { .. } | Self::ProviderNotFound { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { provider } => CliError::NoCredentials { provider },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::ProviderFailed {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_side_core_errors_exit_general() {
        for err in [
            CoreError::AuthenticationFailed {
                message: "bad password".into(),
            },
            CoreError::SessionExpired,
            CoreError::Api {
                message: "bad gateway".into(),
                status: Some(502),
            },
        ] {
            let cli = CliError::from(err);
            assert!(matches!(cli, CliError::ProviderFailed { .. }));
            assert_eq!(cli.exit_code(), exit_code::GENERAL);
        }
    }

    #[test]
    fn transport_core_errors_keep_their_exit_codes() {
        let refused = CliError::from(CoreError::ConnectionFailed {
            url: "https://www.geocaching.com".into(),
            reason: "refused".into(),
        });
        assert_eq!(refused.exit_code(), exit_code::CONNECTION);
        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(CoreError::Config {
                message: "Invalid URL".into(),
            })
            .exit_code(),
            exit_code::USAGE
        );
    }
}
