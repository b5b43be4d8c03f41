// sessiongate-core: Login gating between session providers and consumers (CLI/services).

pub mod config;
pub mod connectivity;
pub mod error;
pub mod gate;
pub mod policy;
pub mod provider;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BatchAccounting, GateConfig, ProviderConfig, TlsVerification};
pub use connectivity::{
    Connectivity, ConnectivityConfig, ConnectivityMonitor, StaticConnectivity,
    spawn_reconnect_watcher,
};
pub use error::CoreError;
pub use gate::{
    BatchStart, CheckOutcome, IssueObserver, LoginGate, LoginState, ObserverScope,
    SettledObserver,
};
pub use policy::{NeverRelog, RelogFlag, RelogPolicy};
pub use provider::{HttpProvider, ProviderRegistry, ProviderSource, SessionProvider};

#[cfg(test)]
pub(crate) mod testing;
