//! `sessiongate check`: one login check, waiting out the deferred re-check.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::mpsc;

use sessiongate_core::{
    BatchStart, CheckOutcome, IssueObserver, LoginState, ProviderSource, SessionProvider,
    SettledObserver,
};

use crate::cli::{CheckArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;
use crate::runtime::{self, GateOverrides, GateRuntime};

#[derive(Debug, Serialize)]
struct CheckReport {
    login_issue: bool,
    state: LoginState,
    connected: bool,
    /// `succeeded`, `offline` or `deferred`.
    path: &'static str,
    batch_started: bool,
    dispatched: usize,
    providers: Vec<ProviderStatus>,
}

#[derive(Debug, Serialize)]
struct ProviderStatus {
    id: String,
    logged_in: bool,
}

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "Provider")]
    id: String,
    #[tabled(rename = "Logged in")]
    logged_in: String,
}

pub async fn handle(args: CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = runtime::load(global)?;
    let overrides = GateOverrides {
        recheck_delay_secs: args.recheck_delay,
        force_relogin: args.force_relogin,
    };
    let rt = GateRuntime::build(global, &cfg, &overrides).await?;
    let scope = rt.gate.scope();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer: IssueObserver = Arc::new(move |issue| {
        let _ = tx.send(issue);
    });

    let progress = spinner(global, rt.registry.active().len());
    let on_settled = progress.clone().map(|pb| -> SettledObserver {
        Arc::new(move || pb.inc(1))
    });

    let outcome = rt
        .gate
        .check_login_and_notify(&scope, rt.registry.clone(), observer, on_settled);

    // Immediate notifications arrive before the call returns.
    let mut issue = None;
    while let Ok(value) = rx.try_recv() {
        issue = Some(value);
    }

    if let CheckOutcome::Deferred { .. } = outcome {
        if let Some(ref pb) = progress {
            pb.set_message(format!(
                "waiting {}s for logins to settle",
                rt.gate.config().recheck_delay.as_secs()
            ));
        }
        issue = rx.recv().await;
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = build_report(&rt, &rt.registry.active(), outcome, issue.unwrap_or(true));
    rt.shutdown();

    let color = output::should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| if r.login_issue { "issue".into() } else { "ok".into() },
    )?;
    output::print_output(&rendered, global.quiet);

    if report.login_issue {
        return Err(CliError::LoginIssue {
            total: report.providers.len(),
        });
    }
    Ok(())
}

fn build_report(
    rt: &GateRuntime,
    providers: &[Arc<dyn SessionProvider>],
    outcome: CheckOutcome,
    login_issue: bool,
) -> CheckReport {
    let (path, batch) = match outcome {
        CheckOutcome::Succeeded => ("succeeded", None),
        CheckOutcome::Offline => ("offline", None),
        CheckOutcome::Deferred { batch } => ("deferred", Some(batch)),
    };
    let dispatched = match batch {
        Some(BatchStart::Started { dispatched }) => dispatched,
        _ => 0,
    };

    CheckReport {
        login_issue,
        state: rt.gate.login_state(),
        connected: rt.is_connected(),
        path,
        batch_started: matches!(batch, Some(BatchStart::Started { .. })),
        dispatched,
        providers: providers
            .iter()
            .map(|p| ProviderStatus {
                id: p.id().to_owned(),
                logged_in: p.is_logged_in(),
            })
            .collect(),
    }
}

fn detail(report: &CheckReport, color: bool) -> String {
    let rows: Vec<ProviderRow> = report
        .providers
        .iter()
        .map(|p| ProviderRow {
            id: p.id.clone(),
            logged_in: output::yes_no(p.logged_in, color),
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Login issue:  {}",
        output::yes_no(report.login_issue, color)
    );
    let _ = writeln!(
        out,
        "State:        {}",
        output::state_label(report.state, color)
    );
    let _ = writeln!(out, "Connected:    {}", output::yes_no(report.connected, color));
    if report.batch_started {
        let _ = writeln!(out, "Logins sent:  {}", report.dispatched);
    }
    let _ = write!(
        out,
        "{}",
        tabled::Table::new(rows).with(tabled::settings::Style::rounded())
    );
    out
}

/// A progress spinner for interactive table output only.
fn spinner(global: &GlobalOpts, providers: usize) -> Option<ProgressBar> {
    let interactive = matches!(global.output, OutputFormat::Table)
        && !global.quiet
        && std::io::stderr().is_terminal();
    if !interactive {
        return None;
    }

    let pb = ProgressBar::new(u64::try_from(providers).unwrap_or(u64::MAX));
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{pos}/{len} logins settled]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("checking sessions");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}
