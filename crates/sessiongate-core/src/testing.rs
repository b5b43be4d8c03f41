// In-memory fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::CoreError;
use crate::gate::{IssueObserver, SettledObserver};
use crate::provider::{ProviderFuture, ProviderSource, SessionProvider};

pub(crate) struct FakeProvider {
    id: String,
    logged_in: AtomicBool,
    login_delay: Duration,
    login_succeeds: bool,
    pub(crate) login_calls: AtomicUsize,
    pub(crate) logout_calls: AtomicUsize,
}

impl FakeProvider {
    fn build(id: &str, logged_in: bool, login_delay: Duration, login_succeeds: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            logged_in: AtomicBool::new(logged_in),
            login_delay,
            login_succeeds,
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn new(id: &str, logged_in: bool) -> Arc<Self> {
        Self::build(id, logged_in, Duration::ZERO, true)
    }

    /// Logs in successfully, but only after `delay`.
    pub(crate) fn slow(id: &str, delay: Duration) -> Arc<Self> {
        Self::build(id, false, delay, true)
    }

    /// Every login attempt is rejected.
    pub(crate) fn failing(id: &str) -> Arc<Self> {
        Self::build(id, false, Duration::ZERO, false)
    }

    pub(crate) fn set_logged_in(&self, value: bool) {
        self.logged_in.store(value, Ordering::SeqCst);
    }

    pub(crate) fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn logouts(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

impl SessionProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn login(&self) -> ProviderFuture<'_> {
        Box::pin(async move {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            if !self.login_delay.is_zero() {
                tokio::time::sleep(self.login_delay).await;
            }
            self.logged_in.store(self.login_succeeds, Ordering::SeqCst);
            if self.login_succeeds {
                Ok(())
            } else {
                Err(CoreError::AuthenticationFailed {
                    message: format!("{} rejected the credentials", self.id),
                })
            }
        })
    }

    fn logout(&self) -> ProviderFuture<'_> {
        Box::pin(async move {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.logged_in.store(false, Ordering::SeqCst);
            Ok(())
        })
    }
}

pub(crate) fn providers(list: &[&Arc<FakeProvider>]) -> Vec<Arc<dyn SessionProvider>> {
    list.iter()
        .map(|p| Arc::clone(*p) as Arc<dyn SessionProvider>)
        .collect()
}

pub(crate) fn source(list: &[&Arc<FakeProvider>]) -> Arc<dyn ProviderSource> {
    Arc::new(providers(list))
}

/// Records every observer notification in order.
#[derive(Default)]
pub(crate) struct Recorder {
    issues: Mutex<Vec<bool>>,
    settled: AtomicUsize,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn issue_observer(self: &Arc<Self>) -> IssueObserver {
        let recorder = Arc::clone(self);
        Arc::new(move |issue| {
            if let Ok(mut issues) = recorder.issues.lock() {
                issues.push(issue);
            }
        })
    }

    pub(crate) fn settled_observer(self: &Arc<Self>) -> SettledObserver {
        let recorder = Arc::clone(self);
        Arc::new(move || {
            recorder.settled.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub(crate) fn issues(&self) -> Vec<bool> {
        self.issues.lock().map(|i| i.clone()).unwrap_or_default()
    }

    pub(crate) fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }
}
