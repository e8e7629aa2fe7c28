//! Named limiter instances.
//!
//! The request pipeline holds one [`LimiterSet`] built at startup; each entry
//! is an independent [`RateLimiter`] with its own policy and client table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::clock::{Clock, SystemClock};
use super::limiter::RateLimiter;
use super::policy::{PolicyConfig, AI_POLICY, GENERAL_POLICY, TRANSCRIPTION_POLICY};
use crate::error::{Result, TipscribeError};

/// A fixed collection of limiters addressed by policy name.
#[derive(Debug)]
pub struct LimiterSet {
    limiters: BTreeMap<String, Arc<RateLimiter>>,
}

impl LimiterSet {
    /// Build one limiter per named policy, all reading from `clock`.
    pub fn new<I, S>(policies: I, clock: Arc<dyn Clock>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, PolicyConfig)>,
        S: Into<String>,
    {
        let limiters: BTreeMap<String, Arc<RateLimiter>> = policies
            .into_iter()
            .map(|(name, policy)| {
                let name = name.into();
                info!(
                    policy = %name,
                    max_requests = policy.max_requests(),
                    window_ms = policy.window_ms(),
                    "Rate limit policy registered"
                );
                (name, Arc::new(RateLimiter::with_clock(policy, clock.clone())))
            })
            .collect();

        if limiters.is_empty() {
            return Err(TipscribeError::Config(
                "at least one rate limit policy is required".to_string(),
            ));
        }

        Ok(Self { limiters })
    }

    /// Build from policies using the system clock.
    pub fn from_policies<I, S>(policies: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, PolicyConfig)>,
        S: Into<String>,
    {
        Self::new(policies, Arc::new(SystemClock))
    }

    /// The general, AI and transcription policies with their default limits.
    pub fn with_defaults() -> Self {
        let limiters = [
            (GENERAL_POLICY, PolicyConfig::general()),
            (AI_POLICY, PolicyConfig::ai()),
            (TRANSCRIPTION_POLICY, PolicyConfig::transcription()),
        ]
        .into_iter()
        .map(|(name, policy)| (name.to_string(), Arc::new(RateLimiter::new(policy))))
        .collect();

        Self { limiters }
    }

    /// Look up a limiter by policy name.
    pub fn get(&self, policy: &str) -> Option<&Arc<RateLimiter>> {
        self.limiters.get(policy)
    }

    /// Look up a limiter by policy name, failing with
    /// [`TipscribeError::UnknownPolicy`] when it was never configured.
    pub fn limiter(&self, policy: &str) -> Result<&Arc<RateLimiter>> {
        self.get(policy)
            .ok_or_else(|| TipscribeError::UnknownPolicy(policy.to_string()))
    }

    /// Remove expired client state from every limiter.
    pub fn sweep_expired(&self) -> usize {
        self.limiters
            .values()
            .map(|limiter| limiter.sweep_expired(limiter.now_ms()))
            .sum()
    }

    /// Policy names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.limiters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<RateLimiter>)> {
        self.limiters.iter().map(|(name, limiter)| (name.as_str(), limiter))
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl Default for LimiterSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
