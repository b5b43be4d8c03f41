//! `sessiongate providers`: list configured providers, optionally testing them.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use sessiongate_config::{self as config, Config, ProviderProfile};
use sessiongate_core::{HttpProvider, SessionProvider};

use crate::cli::{GlobalOpts, ProvidersArgs};
use crate::error::CliError;
use crate::output;
use crate::runtime;

// ── Listing ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ProviderListing {
    name: String,
    url: String,
    username: Option<String>,
    enabled: bool,
    password_source: &'static str,
}

#[derive(Tabled)]
struct ListingRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Password")]
    password_source: String,
}

/// Where the password will be looked up first, without touching the keyring.
fn password_source(profile: &ProviderProfile) -> &'static str {
    if profile.password_env.is_some() {
        "env"
    } else if profile.password.is_some() {
        "plaintext"
    } else {
        "keyring"
    }
}

fn listings(cfg: &Config) -> Vec<ProviderListing> {
    cfg.providers
        .iter()
        .map(|(name, p)| ProviderListing {
            name: name.clone(),
            url: p.url.clone(),
            username: p.username.clone(),
            enabled: p.enabled,
            password_source: password_source(p),
        })
        .collect()
}

// ── Testing ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ProviderTest {
    name: String,
    login: Result<(), String>,
    session: Result<(), String>,
    logout: Result<(), String>,
}

impl ProviderTest {
    fn passed(&self) -> bool {
        self.login.is_ok() && self.session.is_ok()
    }
}

#[derive(Tabled)]
struct TestRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Login")]
    login: String,
    #[tabled(rename = "Session")]
    session: String,
    #[tabled(rename = "Logout")]
    logout: String,
}

fn verdict(result: &Result<(), String>) -> String {
    match result {
        Ok(()) => "ok".into(),
        Err(e) => e.clone(),
    }
}

async fn test_provider(name: &str, profile: &ProviderProfile) -> ProviderTest {
    let provider = config::profile_to_provider_config(profile, name)
        .map_err(|e| e.to_string())
        .and_then(|pc| HttpProvider::new(&pc).map_err(|e| e.to_string()));

    let provider = match provider {
        Ok(p) => p,
        Err(e) => {
            warn!(provider = name, error = %e, "provider could not be built");
            return ProviderTest {
                name: name.to_owned(),
                login: Err(e),
                session: Err("skipped".into()),
                logout: Err("skipped".into()),
            };
        }
    };

    let login = provider.login().await.map_err(|e| e.to_string());
    let session = if login.is_ok() {
        provider.probe().await.map_err(|e| e.to_string())
    } else {
        Err("skipped".into())
    };
    let logout = provider.logout().await.map_err(|e| e.to_string());

    ProviderTest {
        name: name.to_owned(),
        login,
        session,
        logout,
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: ProvidersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = runtime::load(global)?;

    if !args.test {
        let data = listings(&cfg);
        let color = output::should_color(&global.color);
        let rendered = output::render_list(
            &global.output,
            &data,
            |p| ListingRow {
                name: p.name.clone(),
                url: p.url.clone(),
                username: p.username.clone().unwrap_or_else(|| "-".into()),
                enabled: output::yes_no(p.enabled, color),
                password_source: p.password_source.into(),
            },
            |p| p.name.clone(),
        )?;
        output::print_output(&rendered, global.quiet);
        return Ok(());
    }

    let mut results = Vec::new();
    for (name, profile) in config::enabled_providers(&cfg) {
        results.push(test_provider(name, profile).await);
    }
    if results.is_empty() {
        return Err(CliError::NoProviders {
            path: runtime::config_file(global).display().to_string(),
        });
    }

    let rendered = output::render_list(
        &global.output,
        &results,
        |t| TestRow {
            name: t.name.clone(),
            login: verdict(&t.login),
            session: verdict(&t.session),
            logout: verdict(&t.logout),
        },
        |t| format!("{} {}", t.name, if t.passed() { "ok" } else { "failed" }),
    )?;
    output::print_output(&rendered, global.quiet);

    let failed = results.iter().filter(|t| !t.passed()).count();
    if failed > 0 {
        return Err(CliError::ProviderFailed {
            message: format!("{failed} of {} provider(s) failed the test", results.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_source_prefers_env_then_plaintext() {
        let mut profile = ProviderProfile::new("https://example.com");
        assert_eq!(password_source(&profile), "keyring");
        profile.password = Some("pw".into());
        assert_eq!(password_source(&profile), "plaintext");
        profile.password_env = Some("GC_PASSWORD".into());
        assert_eq!(password_source(&profile), "env");
    }

    #[test]
    fn listings_include_disabled_providers() {
        let mut cfg = Config::default();
        let mut oc = ProviderProfile::new("https://www.opencaching.de");
        oc.enabled = false;
        cfg.providers.insert("oc.de".into(), oc);
        cfg.providers
            .insert("gc.com".into(), ProviderProfile::new("https://www.geocaching.com"));

        let list = listings(&cfg);
        let names: Vec<_> = list.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["gc.com", "oc.de"]);
        assert!(!list[1].enabled);
    }

    #[tokio::test]
    async fn test_without_username_reports_build_failure() {
        let profile = ProviderProfile::new("https://example.com");
        let result = test_provider("gc.com", &profile).await;
        assert!(!result.passed());
        assert!(result.login.unwrap_err().contains("gc.com"));
    }
}
