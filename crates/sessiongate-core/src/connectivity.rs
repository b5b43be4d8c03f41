// ── Connectivity ──
//
// Network reachability as seen by the gate, plus the background monitor
// that probes it and the watcher that re-runs login checks whenever the
// network comes back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::gate::{IssueObserver, LoginGate, ObserverScope, SettledObserver};
use crate::provider::ProviderSource;

/// Current network reachability. Must answer without blocking.
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Connectivity fixed by the caller (and flippable in tests).
#[derive(Debug)]
pub struct StaticConnectivity {
    connected: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

impl Connectivity for StaticConnectivity {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

// ── ConnectivityMonitor ──────────────────────────────────────────────

/// Where and how often to probe for reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityConfig {
    /// `host:port` to open a TCP connection to.
    pub probe_addr: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:443".into(),
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Periodic TCP reachability probe.
///
/// The latest result is published on a watch channel;
/// [`is_connected`](Connectivity::is_connected) reads it without waiting.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl ConnectivityMonitor {
    /// Probe once, then keep probing every `config.interval` until
    /// [`shutdown`](Self::shutdown) or `cancel` fires.
    pub async fn start(config: ConnectivityConfig, cancel: CancellationToken) -> Arc<Self> {
        let initial = probe(&config.probe_addr, config.timeout).await;
        debug!(addr = %config.probe_addr, connected = initial, "initial connectivity probe");

        let (state, _) = watch::channel(initial);
        let monitor = Arc::new(Self { state, cancel });

        let task_monitor = Arc::clone(&monitor);
        tokio::spawn(async move { task_monitor.run(config).await });

        monitor
    }

    async fn run(&self, config: ConnectivityConfig) {
        let mut interval = tokio::time::interval(config.interval);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let connected = probe(&config.probe_addr, config.timeout).await;
                    self.publish(connected);
                }
            }
        }
        debug!("connectivity monitor stopped");
    }

    pub(crate) fn publish(&self, connected: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            info!(connected, "connectivity changed");
        }
    }

    /// Subscribe to reachability changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_connected(&self) -> bool {
        *self.state.borrow()
    }
}

/// One TCP connect attempt bounded by `timeout`.
async fn probe(addr: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

// ── Reconnect handling ───────────────────────────────────────────────

/// Re-run the login check on every disconnected → connected transition.
///
/// Providers are re-read from `providers` at each transition and again
/// when the deferred re-check fires. The task ends when the scope is
/// closed or dropped, or the channel closes.
pub fn spawn_reconnect_watcher(
    gate: &LoginGate,
    scope: &ObserverScope,
    mut connectivity: watch::Receiver<bool>,
    providers: Arc<dyn ProviderSource>,
    issue_observer: IssueObserver,
    on_settled: Option<SettledObserver>,
) -> JoinHandle<()> {
    let gate = gate.clone();
    let handle = scope.handle().clone();

    tokio::spawn(async move {
        let mut was_connected = *connectivity.borrow_and_update();

        loop {
            tokio::select! {
                biased;
                () = handle.token().cancelled() => break,
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let connected = *connectivity.borrow_and_update();
                    if connected && !was_connected {
                        info!("connectivity restored, re-checking logins");
                        gate.check_scoped(
                            &handle,
                            Arc::clone(&providers),
                            Arc::clone(&issue_observer),
                            on_settled.clone(),
                        );
                    }
                    was_connected = connected;
                }
            }
        }
        debug!("reconnect watcher stopped");
    })
}
