//! Core fixed-window rate limiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, Millis, SystemClock};
use super::policy::PolicyConfig;

/// How long past its reset time an entry is kept before a sweep may drop it.
///
/// A decision whose timestamp was read before a concurrent sweep can still
/// land on `window_reset_at` exactly and must find its entry there.
pub const SWEEP_GRACE_MS: u64 = 1_000;

/// Outcome of a single rate limit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Admit,
    /// The request must not proceed until the current window ends.
    Reject {
        /// Whole seconds until the window resets, rounded up.
        retry_after_seconds: u64,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    /// Retry hint for a rejection, `None` when admitted.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Admit => None,
            Decision::Reject { retry_after_seconds } => {
                Some(Duration::from_secs(*retry_after_seconds))
            }
        }
    }
}

/// Per-client tracking record for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindowState {
    /// Requests counted in this window, starting at 1.
    pub count: u32,
    /// Absolute time (ms) at which this window expires.
    pub window_reset_at: Millis,
}

impl ClientWindowState {
    fn open(now: Millis, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_reset_at: now.saturating_add(window_ms),
        }
    }

    /// A window is expired strictly after its reset time; a request landing
    /// exactly on `window_reset_at` still belongs to it.
    fn is_expired(&self, now: Millis) -> bool {
        now > self.window_reset_at
    }
}

/// A fixed-window counter keyed by client.
///
/// Each instance owns its own client table and policy; instances never share
/// state. The read-check-update sequence for a key runs under the key's
/// shard lock, so concurrent callers can never admit more than the cap.
pub struct RateLimiter {
    policy: PolicyConfig,
    clients: DashMap<String, ClientWindowState>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter bound to `policy`, reading time from the system clock.
    pub fn new(policy: PolicyConfig) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a limiter bound to `policy` with a custom time source.
    pub fn with_clock(policy: PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clients: DashMap::new(),
            clock,
        }
    }

    /// Decide whether a request from `client_key` arriving at `now` is admitted.
    pub fn check(&self, client_key: &str, now: Millis) -> Decision {
        trace!(client = client_key, now, "Checking rate limit");

        match self.clients.entry(client_key.to_string()) {
            Entry::Vacant(vacant) => {
                debug!(
                    client = client_key,
                    limit = self.policy.max_requests(),
                    window_ms = self.policy.window_ms(),
                    "Opening window for new client"
                );
                vacant.insert(ClientWindowState::open(now, self.policy.window_ms()));
                Decision::Admit
            }
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();

                if state.is_expired(now) {
                    trace!(client = client_key, "Window rolled over");
                    *state = ClientWindowState::open(now, self.policy.window_ms());
                    Decision::Admit
                } else if state.count < self.policy.max_requests() {
                    state.count += 1;
                    Decision::Admit
                } else {
                    let retry_after_seconds = state.window_reset_at.saturating_sub(now).div_ceil(1000);
                    debug!(
                        client = client_key,
                        count = state.count,
                        retry_after_seconds,
                        "Rate limit exceeded"
                    );
                    Decision::Reject { retry_after_seconds }
                }
            }
        }
    }

    /// Decide using the limiter's own clock.
    pub fn check_now(&self, client_key: &str) -> Decision {
        self.check(client_key, self.clock.now_ms())
    }

    /// Current time according to this limiter's clock.
    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Effective count for `client_key` at `now`.
    ///
    /// Returns `None` when the client has no live window.
    pub fn client_count(&self, client_key: &str, now: Millis) -> Option<u32> {
        self.clients
            .get(client_key)
            .filter(|state| !state.is_expired(now))
            .map(|state| state.count)
    }

    /// Snapshot of the stored state for `client_key`, expired or not.
    pub fn client_state(&self, client_key: &str) -> Option<ClientWindowState> {
        self.clients.get(client_key).map(|state| *state)
    }

    /// Remove every client whose window expired more than
    /// [`SWEEP_GRACE_MS`] before `now`.
    ///
    /// An expired entry is treated exactly like a missing one by
    /// [`RateLimiter::check`], so this never changes a later decision.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: Millis) -> usize {
        let cutoff = now.saturating_sub(SWEEP_GRACE_MS);
        let before = self.clients.len();
        self.clients.retain(|_, state| !state.is_expired(cutoff));
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked, live or expired.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Clear all client state.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.clients.clear();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .field("tracked_clients", &self.clients.len())
            .finish()
    }
}
