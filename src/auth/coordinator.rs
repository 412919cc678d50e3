// Refresh coordinator
// Single-flight credential refresh with FIFO fan-out of the outcome.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

use super::refresher::CredentialRefresher;
use super::session::SessionStore;
use crate::error::RefreshDenied;

type RefreshOutcome = Result<String, RefreshDenied>;

/// Host-application hooks for the session-terminated side effect.
///
/// Fired once per failed refresh, after the session store is cleared and
/// every waiter has been rejected. `on_sign_in_surface` suppresses the
/// redirect when the user is already looking at the sign-in screen.
pub trait SessionHooks: Send + Sync {
    fn on_sign_in_surface(&self) -> bool {
        false
    }
    fn session_terminated(&self) {}
}

/// Default hooks for hosts that handle sign-out themselves
pub struct NoopHooks;

impl SessionHooks for NoopHooks {}

struct RefreshState {
    refreshing: bool,
    /// Waiters queued while a refresh is in flight. Non-empty only while
    /// `refreshing`; always drained to empty when the refresh settles.
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Guarantees at most one in-flight refresh exchange regardless of how many
/// requests observe expiry simultaneously, and delivers the single outcome
/// to every caller that queued while it was in flight.
///
/// State is only ever mutated while the lock is held, with no await point
/// inside a critical section, so no task can observe a half-applied
/// transition between checking the flag and enqueueing. The exchange itself
/// runs on a detached task: callers only ever await their queued oneshot,
/// so cancelling a caller (timeout, navigation away) cannot strand the flag
/// or the queue.
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
    refresher: Arc<dyn CredentialRefresher>,
    session: Arc<SessionStore>,
    hooks: Arc<dyn SessionHooks>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn CredentialRefresher>,
        session: Arc<SessionStore>,
        hooks: Arc<dyn SessionHooks>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState {
                refreshing: false,
                waiters: VecDeque::new(),
            })),
            refresher,
            session,
            hooks,
        }
    }

    /// Obtain a fresh access credential.
    ///
    /// The first caller to arrive while idle starts the exchange; everyone
    /// arriving before it settles is queued and receives the same outcome,
    /// in FIFO order. On success the new credential is already in the
    /// [`SessionStore`] by the time anyone resolves; on denial the store is
    /// cleared and the session-terminated hook fires.
    pub async fn obtain_fresh_credential(&self) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();

        let starts_flight = {
            let mut state = self.state.lock().await;
            state.waiters.push_back(tx);
            if state.refreshing {
                tracing::debug!("refresh already in flight, queueing");
                false
            } else {
                state.refreshing = true;
                true
            }
        };

        if starts_flight {
            self.spawn_flight();
        }

        match rx.await {
            Ok(outcome) => outcome,
            // Flight task dropped the queue without settling (panic in the
            // refresher); treat as denial
            Err(_) => Err(RefreshDenied::new("refresh abandoned")),
        }
    }

    /// Run the exchange to settlement on its own task. Callers come and go
    /// (a cancelled caller just drops its receiver); the flight never does,
    /// so the flag always resets and the queue always drains.
    fn spawn_flight(&self) {
        let state = self.state.clone();
        let refresher = self.refresher.clone();
        let session = self.session.clone();
        let hooks = self.hooks.clone();

        tokio::spawn(async move {
            tracing::debug!("starting refresh exchange");
            let outcome = refresher.refresh().await;

            match &outcome {
                Ok(credential) => session.set(credential.clone()).await,
                Err(denied) => {
                    tracing::warn!(reason = %denied.reason, "refresh denied, clearing session");
                    session.clear().await;
                }
            }

            // Flag back to idle and queue taken in one critical section: no
            // waiter can slip in mid-drain, and the next arrival starts a
            // fresh flight.
            let waiters = {
                let mut state = state.lock().await;
                state.refreshing = false;
                std::mem::take(&mut state.waiters)
            };

            tracing::debug!(
                waiters = waiters.len(),
                success = outcome.is_ok(),
                "fanning out refresh outcome"
            );
            for tx in waiters {
                // A waiter whose caller navigated away has dropped its receiver
                let _ = tx.send(outcome.clone());
            }

            if outcome.is_err() {
                if hooks.on_sign_in_surface() {
                    tracing::debug!("already on sign-in surface, skipping redirect");
                } else {
                    hooks.session_terminated();
                }
            }
        });
    }
}
