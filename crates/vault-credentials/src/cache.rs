//! Expiring, single-flight credential cache.
//!
//! Every [`CoalescingCache::fetch`] call joins the current refresh cohort.
//! The first caller to join an idle cache becomes the leader and performs
//! the secret read; everyone who joins while that read is in flight is a
//! follower and waits for the leader's outcome. The cohort is counted and
//! reset under the same lock, so each follower receives exactly the outcome
//! of the cycle it joined. Successful outcomes carry the credentials as they
//! were committed, so a later cycle can never leak into an earlier cohort.
//!
//! The lock is never held across the secret read.

use crate::config::ProviderConfig;
use crate::credentials::{CredentialSet, Credentials, SecretMap};
use crate::error::CredentialError;
use crate::source::SecretSource;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type Outcome = Result<Credentials, CredentialError>;

/// "Valid until" bookkeeping.
#[derive(Debug)]
struct ExpiryClock {
    valid_until: Option<Instant>,
    ttl: Duration,
}

impl ExpiryClock {
    fn new(ttl: Duration) -> Self {
        Self {
            valid_until: None,
            ttl,
        }
    }

    /// Never-refreshed clocks are expired.
    fn is_expired(&self, now: Instant) -> bool {
        match self.valid_until {
            Some(valid_until) => now > valid_until,
            None => true,
        }
    }

    /// Extend validity to `now + ttl`, never moving it backwards.
    ///
    /// Returns false if `now + ttl` is not representable; the clock is left
    /// untouched then.
    fn advance(&mut self, now: Instant) -> bool {
        let Some(next) = now.checked_add(self.ttl) else {
            return false;
        };
        self.valid_until = Some(match self.valid_until {
            Some(current) if current > next => current,
            _ => next,
        });
        true
    }
}

enum Role {
    Leader,
    Follower(broadcast::Receiver<Outcome>),
}

/// Callers attached to the in-flight refresh.
///
/// `signal` is `Some` exactly while `waiters > 0`.
#[derive(Default)]
struct Cohort {
    waiters: usize,
    signal: Option<broadcast::Sender<Outcome>>,
}

impl Cohort {
    fn join(&mut self) -> Role {
        self.waiters += 1;
        if self.waiters > 1 {
            if let Some(signal) = &self.signal {
                return Role::Follower(signal.subscribe());
            }
        }

        let (signal, _) = broadcast::channel(1);
        self.signal = Some(signal);
        self.waiters = 1;
        Role::Leader
    }

    /// Deliver `outcome` to every follower and return to idle.
    ///
    /// Returns the number of followers in the finished cohort.
    fn finish(&mut self, outcome: Outcome) -> usize {
        let followers = self.waiters.saturating_sub(1);
        if let Some(signal) = self.signal.take() {
            // Err only when every follower has already gone away.
            if followers > 0 && signal.send(outcome).is_err() {
                debug!(followers, "all followers left before the refresh finished");
            }
        }
        self.waiters = 0;
        followers
    }
}

struct State {
    credentials: CredentialSet,
    clock: ExpiryClock,
    cohort: Cohort,
}

/// Credential cache with coalesced refreshes.
pub struct CoalescingCache<S> {
    source: S,
    config: Arc<ProviderConfig>,
    state: RwLock<State>,
}

impl<S: SecretSource> CoalescingCache<S> {
    /// Create an empty, expired cache reading from `source`.
    pub fn new(source: S, config: Arc<ProviderConfig>) -> Self {
        let state = State {
            credentials: CredentialSet::new(config.access_key_name(), config.secret_key_name()),
            clock: ExpiryClock::new(config.ttl()),
            cohort: Cohort::default(),
        };

        Self {
            source,
            config,
            state: RwLock::new(state),
        }
    }

    /// Refresh the credentials, or wait for the refresh already in flight.
    pub async fn fetch(&self) -> Result<Credentials, CredentialError> {
        match self.join() {
            Role::Leader => self.lead().await,
            Role::Follower(mut signal) => match signal.recv().await {
                Ok(outcome) => outcome,
                Err(_) => Err(CredentialError::unavailable(
                    "credential refresh was abandoned before completing",
                )),
            },
        }
    }

    /// Whether the last successful refresh is older than the TTL.
    ///
    /// Does not trigger a refresh.
    pub fn is_expired(&self) -> bool {
        self.read_state().clock.is_expired(Instant::now())
    }

    /// End of the current validity window, `None` before the first success.
    pub fn valid_until(&self) -> Option<Instant> {
        self.read_state().clock.valid_until
    }

    /// Callers attached to the in-flight refresh; zero when idle.
    pub fn waiters(&self) -> usize {
        self.read_state().cohort.waiters
    }

    /// Current credentials without refreshing.
    pub fn snapshot(&self) -> Credentials {
        self.read_state().credentials.snapshot()
    }

    async fn lead(&self) -> Result<Credentials, CredentialError> {
        let guard = LeaderGuard {
            state: &self.state,
            armed: true,
        };

        debug!(path = %self.config.secret_path(), "refreshing credentials");
        let fetched = self.read_secret().await;
        self.commit(fetched, guard)
    }

    /// Single attempt, bounded by the fetch timeout. No lock is held here.
    async fn read_secret(&self) -> Result<SecretMap, CredentialError> {
        let path = self.config.secret_path();
        let timeout = self.config.fetch_timeout();

        match tokio::time::timeout(timeout, self.source.read(path)).await {
            Ok(Ok(Some(data))) => Ok(data),
            Ok(Ok(None)) => Err(CredentialError::SourceUnavailable(format!(
                "no data returned for {}",
                path
            ))),
            Ok(Err(e)) => Err(CredentialError::SourceUnavailable(format!("{:#}", e))),
            Err(_) => Err(CredentialError::SourceUnavailable(format!(
                "secret read timed out after {:?}",
                timeout
            ))),
        }
    }

    fn commit(
        &self,
        fetched: Result<SecretMap, CredentialError>,
        mut guard: LeaderGuard<'_>,
    ) -> Outcome {
        let mut state = self.write_state();

        let outcome = fetched
            .and_then(|data| state.credentials.validate_and_merge(&data))
            .map(|()| state.credentials.snapshot());
        if outcome.is_ok() && !state.clock.advance(Instant::now()) {
            warn!(ttl = ?self.config.ttl(), "ttl overflows the clock, expiry not extended");
        }
        let followers = state.cohort.finish(outcome.clone());
        guard.armed = false;

        match &outcome {
            Ok(creds) => info!(
                access_key_id = %creds.masked_access_key_id(),
                followers,
                "credentials refreshed"
            ),
            Err(e) => warn!(error = %e, followers, "credential refresh failed"),
        }

        outcome
    }

    fn join(&self) -> Role {
        self.write_state().cohort.join()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the cohort if the leader's future is dropped mid-read.
struct LeaderGuard<'a> {
    state: &'a RwLock<State>,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let followers = state.cohort.finish(Err(CredentialError::unavailable(
            "credential refresh was cancelled",
        )));
        warn!(followers, "credential refresh cancelled");
    }
}
