//! `sessiongate watch`: keep checking until Ctrl-C.
//!
//! Runs one check up front, then re-checks on every reconnect. Each
//! observer notification and state change is printed as it happens.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use sessiongate_core::{IssueObserver, ProviderSource, SettledObserver, spawn_reconnect_watcher};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;
use crate::runtime::{self, GateOverrides, GateRuntime};

#[derive(Debug, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent {
    Issue { login_issue: bool },
    State { state: sessiongate_core::LoginState },
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = runtime::load(global)?;
    let overrides = GateOverrides {
        recheck_delay_secs: args.recheck_delay,
        force_relogin: false,
    };
    let rt = GateRuntime::build(global, &cfg, &overrides).await?;
    let scope = rt.gate.scope();

    let (tx, mut issues) = mpsc::unbounded_channel();
    let observer: IssueObserver = Arc::new(move |issue| {
        let _ = tx.send(issue);
    });
    let on_settled: SettledObserver = Arc::new(|| tracing::debug!("provider login settled"));

    let source: Arc<dyn ProviderSource> = rt.registry.clone();
    let watcher = spawn_reconnect_watcher(
        &rt.gate,
        &scope,
        rt.connectivity_updates(),
        Arc::clone(&source),
        Arc::clone(&observer),
        Some(Arc::clone(&on_settled)),
    );

    rt.gate
        .check_login_and_notify(&scope, source, observer, Some(on_settled));
    info!("watching sessions, press Ctrl-C to stop");

    let mut states = rt.gate.subscribe_state();
    let color = output::should_color(&global.color);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(issue) = issues.recv() => {
                emit(global, color, &WatchEvent::Issue { login_issue: issue })?;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                emit(global, color, &WatchEvent::State { state })?;
            }
        }
    }

    scope.close();
    rt.shutdown();
    let _ = watcher.await;
    info!("stopped watching");
    Ok(())
}

fn emit(global: &GlobalOpts, color: bool, event: &WatchEvent) -> Result<(), CliError> {
    let line = match (&global.output, event) {
        (OutputFormat::Json, _) => serde_json::to_string(event)?,
        (OutputFormat::Plain, WatchEvent::Issue { login_issue: true }) => "issue".to_owned(),
        (OutputFormat::Plain, WatchEvent::Issue { login_issue: false }) => "ok".to_owned(),
        (OutputFormat::Plain, WatchEvent::State { state }) => format!("state {state}"),
        (OutputFormat::Table, WatchEvent::Issue { login_issue }) => {
            format!("login issue: {}", output::yes_no(*login_issue, color))
        }
        (OutputFormat::Table, WatchEvent::State { state }) => {
            format!("login state: {}", output::state_label(*state, color))
        }
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
