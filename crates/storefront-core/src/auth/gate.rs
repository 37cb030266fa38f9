//! Admission control for protected views.
//!
//! Each protected-view activation evaluates the stored credential pair
//! once: absent credentials deny, a malformed access credential clears
//! both and denies, a live one grants, and an expired one gets exactly one
//! refresh attempt. Every failure resolves to a verdict; nothing is
//! surfaced to the protected view.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::routes::Navigation;

use super::codec;
use super::store::{CredentialPair, TokenKey, TokenStore};

/// Deadline for a single refresh exchange
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

/// Outcome of a session evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Evaluation still in flight
    Unknown,
    Granted,
    Denied,
}

impl Verdict {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Verdict::Unknown)
    }

    pub fn admission(&self) -> Admission {
        match self {
            Verdict::Unknown => Admission::Loading,
            Verdict::Granted => Admission::Content,
            Verdict::Denied => Admission::Redirect(Navigation::to_login()),
        }
    }
}

/// What a protected view should present for a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Neutral loading indicator: no content, no redirect
    Loading,
    Content,
    Redirect(Navigation),
}

/// The storage-free step of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A credential is missing
    Deny,
    /// The access credential could not be decoded
    DenyAndClear,
    Grant,
    /// The access credential has expired
    Refresh,
}

/// Exchanges a refresh credential for a new access credential.
pub trait TokenRefresher: Send + Sync {
    fn exchange<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<String, ApiError>>;
}

impl TokenRefresher for ApiClient {
    fn exchange<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<String, ApiError>> {
        self.exchange_refresh(refresh).boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionGate {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_timeout: Duration,
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Decide admission from a credential snapshot and the current instant
    pub fn decide(pair: &CredentialPair, now: DateTime<Utc>) -> Decision {
        let (Some(access), Some(_)) = (&pair.access, &pair.refresh) else {
            return Decision::Deny;
        };

        match codec::decode(access) {
            Err(e) => {
                debug!(error = %e, "Access credential could not be decoded");
                Decision::DenyAndClear
            }
            Ok(claims) if claims.is_expired_at(now) => {
                debug!(expires_at = %claims.expires_at, "Access credential expired");
                Decision::Refresh
            }
            Ok(_) => Decision::Grant,
        }
    }

    /// Evaluate the session as of `now`, applying storage effects
    pub async fn evaluate_at(&self, now: DateTime<Utc>) -> Verdict {
        let pair = self.store.pair();
        let decision = Self::decide(&pair, now);
        debug!(?decision, "Session decision");

        match decision {
            Decision::Deny => Verdict::Denied,
            Decision::DenyAndClear => {
                self.store.clear_all();
                Verdict::Denied
            }
            Decision::Grant => Verdict::Granted,
            Decision::Refresh => {
                if self.refresh().await {
                    Verdict::Granted
                } else {
                    Verdict::Denied
                }
            }
        }
    }

    pub async fn evaluate(&self) -> Verdict {
        self.evaluate_at(Utc::now()).await
    }

    /// Renew the access credential. On failure both credentials are cleared.
    ///
    /// Concurrent callers share the one exchange already in flight and all
    /// observe its result.
    pub async fn refresh(&self) -> bool {
        let shared = {
            let mut slot = lock(&self.inflight);
            match slot.clone() {
                Some(existing) => {
                    debug!("Joining in-flight refresh");
                    existing
                }
                None => {
                    let inflight = Arc::clone(&self.inflight);
                    let exchange = run_refresh(
                        Arc::clone(&self.store),
                        Arc::clone(&self.refresher),
                        self.refresh_timeout,
                    );
                    let shared = async move {
                        let refreshed = exchange.await;
                        lock(&inflight).take();
                        refreshed
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Start evaluating for a newly mounted protected view
    pub fn activate(self: &Arc<Self>) -> Activation {
        let (tx, rx) = watch::channel(Verdict::Unknown);
        let mounted = Arc::new(Mutex::new(true));

        let gate = Arc::clone(self);
        let still_mounted = Arc::clone(&mounted);
        let task = tokio::spawn(async move {
            let verdict = gate.evaluate().await;
            let mounted = lock(&still_mounted);
            if *mounted {
                let _ = tx.send(verdict);
            } else {
                debug!(?verdict, "View unmounted, discarding verdict");
            }
        });

        Activation {
            verdict: rx,
            mounted,
            task: Some(task),
        }
    }
}

async fn run_refresh(
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    deadline: Duration,
) -> bool {
    let Some(refresh) = store.get(TokenKey::Refresh) else {
        store.clear_all();
        return false;
    };

    match tokio::time::timeout(deadline, refresher.exchange(&refresh)).await {
        Ok(Ok(access)) => {
            store.set(TokenKey::Access, &access);
            info!("Access credential refreshed");
            return true;
        }
        Ok(Err(e)) => warn!(error = %e, "Refresh exchange failed"),
        Err(_) => warn!(timeout_ms = deadline.as_millis() as u64, "Refresh exchange timed out"),
    }

    store.clear_all();
    false
}

/// One protected-view mount.
///
/// Starts `Unknown` and resolves once. Dropping or unmounting lets the
/// in-flight evaluation finish but discards its verdict.
pub struct Activation {
    verdict: watch::Receiver<Verdict>,
    mounted: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Activation {
    pub fn verdict(&self) -> Verdict {
        *self.verdict.borrow()
    }

    pub fn admission(&self) -> Admission {
        self.verdict().admission()
    }

    /// Wait for the terminal verdict. A lost evaluation fails closed.
    pub async fn resolved(&mut self) -> Verdict {
        match self.verdict.wait_for(Verdict::is_resolved).await {
            Ok(verdict) => *verdict,
            Err(_) => Verdict::Denied,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Verdict> {
        self.verdict.clone()
    }

    /// Detach from the evaluation; the returned handle completes when the
    /// in-flight work does
    pub fn unmount(mut self) -> Option<JoinHandle<()>> {
        *lock(&self.mounted) = false;
        self.task.take()
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        *lock(&self.mounted) = false;
    }
}
