// ── Login gate ──
//
// Tracks whether any session provider is authenticated, keeps login
// batches mutually exclusive, and tells observers whether there is a
// login issue, possibly after a deferred re-check.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{BatchAccounting, GateConfig};
use crate::connectivity::Connectivity;
use crate::error::CoreError;
use crate::policy::RelogPolicy;
use crate::provider::{ProviderSource, SessionProvider};

/// Receives `true` when there is a login issue, `false` when there is none.
pub type IssueObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Invoked once per finished provider task of a login batch.
pub type SettledObserver = Arc<dyn Fn() + Send + Sync>;

// ── LoginState ───────────────────────────────────────────────────────

/// Cached result of the last provider evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoginState {
    /// Nothing evaluated yet (or invalidated).
    #[default]
    Unknown,
    /// No provider was logged in at the last evaluation.
    Failed,
    /// At least one provider was logged in at the last evaluation.
    Succeeded,
}

impl LoginState {
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::from_str(name).map_err(|_| CoreError::Validation {
            message: format!("unknown login state '{name}'"),
        })
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// Result of an attempt to start a login batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStart {
    /// Another batch still has logins in flight; nothing was started.
    AlreadyRunning,
    /// A batch was admitted and `dispatched` provider tasks were spawned.
    Started { dispatched: usize },
}

/// Which path a [`LoginGate::check_login_and_notify`] call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// A provider is logged in; the observer got `false`.
    Succeeded,
    /// No connectivity; the observer got `true` and nothing was scheduled.
    Offline,
    /// A re-check was scheduled after trying to start a batch.
    Deferred { batch: BatchStart },
}

// ── ObserverScope ────────────────────────────────────────────────────

#[derive(Clone)]
pub(crate) struct ScopeHandle {
    token: CancellationToken,
    pending: Arc<AtomicUsize>,
}

impl ScopeHandle {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Lifetime of an observer's owner.
///
/// Deferred re-checks scheduled through a scope are cancelled when the
/// scope is closed or dropped, so they never reach a stale observer.
pub struct ObserverScope {
    handle: ScopeHandle,
}

impl ObserverScope {
    /// Cancel every pending re-check of this scope.
    pub fn close(&self) {
        self.handle.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.token.is_cancelled()
    }

    /// Re-checks scheduled on this scope that have neither fired nor been
    /// cancelled yet.
    pub fn pending_rechecks(&self) -> usize {
        self.handle.pending.load(Ordering::Acquire)
    }

    pub(crate) fn handle(&self) -> &ScopeHandle {
        &self.handle
    }
}

impl Drop for ObserverScope {
    fn drop(&mut self) {
        self.handle.token.cancel();
    }
}

struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// ── LoginGate ────────────────────────────────────────────────────────

/// Session gate shared by every consumer of one process.
///
/// Cheaply cloneable via `Arc<GateInner>`. All operations return
/// immediately; logins and re-checks run as Tokio tasks, so the gate must
/// be used from within a Tokio runtime.
#[derive(Clone)]
pub struct LoginGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    config: GateConfig,
    state: watch::Sender<LoginState>,
    in_flight: AtomicUsize,
    batch_lock: Mutex<()>,
    connectivity: Arc<dyn Connectivity>,
    relog: Arc<dyn RelogPolicy>,
    cancel: CancellationToken,
}

impl LoginGate {
    pub fn new(
        config: GateConfig,
        connectivity: Arc<dyn Connectivity>,
        relog: Arc<dyn RelogPolicy>,
    ) -> Self {
        let (state, _) = watch::channel(LoginState::Unknown);
        Self {
            inner: Arc::new(GateInner {
                config,
                state,
                in_flight: AtomicUsize::new(0),
                batch_lock: Mutex::new(()),
                connectivity,
                relog,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    pub fn login_state(&self) -> LoginState {
        *self.inner.state.borrow()
    }

    /// Subscribe to login state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<LoginState> {
        self.inner.state.subscribe()
    }

    /// Provider logins the current batch still counts as outstanding.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Whether any of `providers` currently reports a session.
    pub fn any_logged_in(providers: &[Arc<dyn SessionProvider>]) -> bool {
        providers.iter().any(|p| p.is_logged_in())
    }

    /// Forget the cached state; the next check starts from scratch.
    pub fn invalidate(&self) {
        self.set_state(LoginState::Unknown);
    }

    /// Create a scope for an observer owner.
    pub fn scope(&self) -> ObserverScope {
        ObserverScope {
            handle: ScopeHandle {
                token: self.inner.cancel.child_token(),
                pending: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Cancel the pending re-checks of every scope. In-flight logins keep
    /// running.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        debug!("login gate shut down");
    }

    fn set_state(&self, next: LoginState) {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "login state changed");
        }
    }

    /// Re-evaluate the providers and cache the result.
    fn refresh_state(&self, providers: &[Arc<dyn SessionProvider>]) -> bool {
        let succeeded = Self::any_logged_in(providers);
        self.set_state(if succeeded {
            LoginState::Succeeded
        } else {
            LoginState::Failed
        });
        succeeded
    }

    // ── Checks ───────────────────────────────────────────────────

    /// Determine whether there is a login issue and tell `issue_observer`.
    ///
    /// - A cached `Failed` is re-evaluated first; if it stays `Failed` the
    ///   observer gets `true` and the check continues.
    /// - `Succeeded` notifies `false` and stops.
    /// - Without connectivity the observer gets `true` and nothing is
    ///   scheduled.
    /// - Otherwise a login batch is attempted and a re-check fires after
    ///   the configured delay, notifying the negated fresh result.
    ///
    /// `providers` is read when the call is made and again when the
    /// re-check fires, so providers added or disabled in between count.
    pub fn check_login_and_notify(
        &self,
        scope: &ObserverScope,
        providers: Arc<dyn ProviderSource>,
        issue_observer: IssueObserver,
        on_settled: Option<SettledObserver>,
    ) -> CheckOutcome {
        self.check_scoped(scope.handle(), providers, issue_observer, on_settled)
    }

    pub(crate) fn check_scoped(
        &self,
        scope: &ScopeHandle,
        providers: Arc<dyn ProviderSource>,
        issue_observer: IssueObserver,
        on_settled: Option<SettledObserver>,
    ) -> CheckOutcome {
        let active = providers.active();
        if self.login_state() == LoginState::Failed {
            self.refresh_state(&active);
        }

        match self.login_state() {
            LoginState::Succeeded => {
                issue_observer(false);
                return CheckOutcome::Succeeded;
            }
            // Still failing; tell the observer now and retry below.
            LoginState::Failed => issue_observer(true),
            LoginState::Unknown => {}
        }

        if !self.inner.connectivity.is_connected() {
            debug!("no connectivity, reporting login issue");
            issue_observer(true);
            return CheckOutcome::Offline;
        }

        let batch = self.start_background_login_batch(&active, on_settled);
        self.schedule_recheck(scope, providers, issue_observer);
        CheckOutcome::Deferred { batch }
    }

    fn schedule_recheck(
        &self,
        scope: &ScopeHandle,
        providers: Arc<dyn ProviderSource>,
        issue_observer: IssueObserver,
    ) {
        let gate = self.clone();
        let token = scope.token.clone();
        let guard = PendingGuard::new(&scope.pending);
        let delay = self.inner.config.recheck_delay;

        tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                biased;
                () = token.cancelled() => debug!("deferred login re-check cancelled"),
                () = tokio::time::sleep(delay) => {
                    let succeeded = gate.refresh_state(&providers.active());
                    debug!(succeeded, "deferred login re-check fired");
                    issue_observer(!succeeded);
                }
            }
        });
    }

    // ── Login batches ────────────────────────────────────────────

    /// Start one round of concurrent logins, unless one is still running.
    ///
    /// Every provider that lacks a session (or all of them, when the
    /// relogin policy demands it) gets its own task: optional logout,
    /// login, counter decrement, then `on_settled`. Failures are logged
    /// and otherwise ignored; `is_logged_in()` stays the only truth.
    pub fn start_background_login_batch(
        &self,
        providers: &[Arc<dyn SessionProvider>],
        on_settled: Option<SettledObserver>,
    ) -> BatchStart {
        let (must_relog, dispatch) = {
            let _lock = self
                .inner
                .batch_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let running = self.inner.in_flight.load(Ordering::Acquire);
            if running > 0 {
                debug!(in_flight = running, "login batch already running");
                return BatchStart::AlreadyRunning;
            }

            let must_relog = self.inner.relog.must_relog();
            let dispatch: Vec<Arc<dyn SessionProvider>> = providers
                .iter()
                .filter(|p| must_relog || !p.is_logged_in())
                .cloned()
                .collect();

            let seed = match self.inner.config.accounting {
                BatchAccounting::AllProviders => providers.len(),
                BatchAccounting::DispatchedOnly => dispatch.len(),
            };
            self.inner.in_flight.store(seed, Ordering::Release);
            (must_relog, dispatch)
        };

        info!(
            providers = providers.len(),
            dispatched = dispatch.len(),
            must_relog,
            "starting background login batch"
        );

        let dispatched = dispatch.len();
        for provider in dispatch {
            let inner = Arc::clone(&self.inner);
            let on_settled = on_settled.clone();
            tokio::spawn(async move {
                if must_relog {
                    if let Err(e) = provider.logout().await {
                        warn!(provider = provider.id(), error = %e, "logout failed (non-fatal)");
                    }
                }
                match provider.login().await {
                    Ok(()) => debug!(provider = provider.id(), "login complete"),
                    Err(e) => warn!(provider = provider.id(), error = %e, "login failed"),
                }

                inner.in_flight.fetch_sub(1, Ordering::AcqRel);

                if let Some(cb) = on_settled {
                    cb();
                }
            });
        }

        BatchStart::Started { dispatched }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
