// ── Force-relogin policy ──
//
// Decides whether a login batch must drop existing sessions before
// logging in again. Read once per batch, after the batch is admitted.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether existing sessions must be invalidated before re-login.
pub trait RelogPolicy: Send + Sync {
    fn must_relog(&self) -> bool;
}

/// Never force a relogin; only providers without a session log in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverRelog;

impl RelogPolicy for NeverRelog {
    fn must_relog(&self) -> bool {
        false
    }
}

/// One-shot relogin request.
///
/// Raised when credentials change; the next batch that reads it
/// consumes the request and resets the flag.
#[derive(Debug, Default)]
pub struct RelogFlag {
    pending: AtomicBool,
}

impl RelogFlag {
    pub fn new(pending: bool) -> Self {
        Self {
            pending: AtomicBool::new(pending),
        }
    }

    /// Request a relogin for the next batch.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Whether a relogin is pending, without consuming it.
    pub fn is_raised(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl RelogPolicy for RelogFlag {
    fn must_relog(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
