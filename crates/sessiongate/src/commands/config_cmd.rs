//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};

use sessiongate_config::{self as config, Config, ProviderProfile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::runtime;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "[gate]");
    let _ = writeln!(out, "recheck_delay_secs = {}", cfg.gate.recheck_delay_secs);
    let _ = writeln!(out, "accounting = \"{}\"", cfg.gate.accounting);
    let _ = writeln!(out, "force_relogin = {}", cfg.gate.force_relogin);

    let _ = writeln!(out);
    let _ = writeln!(out, "[connectivity]");
    let _ = writeln!(out, "probe_host = \"{}\"", cfg.connectivity.probe_host);
    let _ = writeln!(out, "probe_port = {}", cfg.connectivity.probe_port);
    let _ = writeln!(out, "interval_secs = {}", cfg.connectivity.interval_secs);
    let _ = writeln!(out, "timeout_secs = {}", cfg.connectivity.timeout_secs);

    for (name, p) in &cfg.providers {
        let _ = writeln!(out);
        let _ = writeln!(out, "[providers.\"{name}\"]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        let _ = writeln!(out, "login_path = \"{}\"", p.login_path);
        let _ = writeln!(out, "logout_path = \"{}\"", p.logout_path);
        if let Some(ref status) = p.status_path {
            let _ = writeln!(out, "status_path = \"{status}\"");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        let _ = writeln!(out, "enabled = {}", p.enabled);
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if p.insecure {
            let _ = writeln!(out, "insecure = true");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn store_in_keyring(provider: &str, secret: &str) -> Result<(), CliError> {
    let entry = keyring::Entry::new(config::KEYRING_SERVICE, &config::keyring_key(provider))?;
    entry.set_password(secret)?;
    Ok(())
}

/// Ask where the password should live and record the choice in `profile`.
fn prompt_password_storage(name: &str, profile: &mut ProviderProfile) -> Result<(), CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where should the password come from?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => {
            let pass = prompt_secret()?;
            store_in_keyring(name, &pass)?;
            eprintln!("   ✓ password stored in system keyring");
        }
        1 => {
            let var: String = Input::new()
                .with_prompt("Environment variable")
                .default(format!(
                    "{}_PASSWORD",
                    name.to_uppercase().replace(['.', '-'], "_")
                ))
                .interact_text()
                .map_err(prompt_err)?;
            profile.password_env = Some(var);
        }
        _ => profile.password = Some(prompt_secret()?),
    }
    Ok(())
}

fn prompt_secret() -> Result<String, CliError> {
    let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if pass.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(pass)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = runtime::config_file(global);

    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let mut cfg = runtime::load(global)?;
            eprintln!("sessiongate configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let name: String = Input::new()
                .with_prompt("Provider name")
                .default("gc.com".into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("Provider URL")
                .default("https://www.geocaching.com".into())
                .validate_with(|input: &String| {
                    input
                        .parse::<url::Url>()
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?;
            if username.is_empty() {
                return Err(CliError::Validation {
                    field: "username".into(),
                    reason: "username cannot be empty".into(),
                });
            }

            let mut profile = ProviderProfile::new(url);
            profile.username = Some(username);
            prompt_password_storage(&name, &mut profile)?;

            if cfg.providers.insert(name.clone(), profile).is_some() {
                eprintln!("   replaced existing provider '{name}'");
            }
            config::save_config_to(&cfg, &path)?;
            eprintln!("\n✓ Configuration saved to {}", path.display());
            Ok(())
        }

        // ── Show: display config with secrets redacted ──────────────
        ConfigCommand::Show => {
            let cfg = runtime::load(global)?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        // ── SetPassword: store in keyring ───────────────────────────
        ConfigCommand::SetPassword { provider } => {
            let cfg = runtime::load(global)?;
            if !cfg.providers.contains_key(&provider) {
                return Err(CliError::ProviderNotFound { provider });
            }

            let pass = prompt_secret()?;
            store_in_keyring(&provider, &pass)?;
            eprintln!("✓ Password for '{provider}' stored in system keyring");
            Ok(())
        }
    }
}
