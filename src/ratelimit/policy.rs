//! Fixed-window policy definitions.

use std::time::Duration;

use crate::error::{Result, TipscribeError};

/// Name of the policy applied to ordinary API traffic.
pub const GENERAL_POLICY: &str = "general";
/// Name of the policy applied to AI note generation.
pub const AI_POLICY: &str = "ai";
/// Name of the policy applied to audio transcription.
pub const TRANSCRIPTION_POLICY: &str = "transcription";

const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Immutable configuration for one limiter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    window_ms: u64,
    max_requests: u32,
    rejection_message: String,
}

impl PolicyConfig {
    /// Create a validated policy.
    ///
    /// Fails when the window is zero or the cap is below one.
    pub fn new(window_ms: u64, max_requests: u32, rejection_message: impl Into<String>) -> Result<Self> {
        if window_ms == 0 {
            return Err(TipscribeError::Config(
                "window duration must be greater than zero".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(TipscribeError::Config(
                "max requests per window must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            window_ms,
            max_requests,
            rejection_message: rejection_message.into(),
        })
    }

    /// 100 requests per minute.
    pub fn general() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: 100,
            rejection_message: "Too many requests, please try again later.".to_string(),
        }
    }

    /// 10 requests per minute.
    pub fn ai() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: 10,
            rejection_message: "Too many AI generation requests, please try again later."
                .to_string(),
        }
    }

    /// 20 requests per minute.
    pub fn transcription() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: 20,
            rejection_message: "Too many transcription requests, please try again later."
                .to_string(),
        }
    }

    /// Length of each window in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Length of each window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Inclusive cap on admitted requests per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Text returned to callers on rejection.
    pub fn rejection_message(&self) -> &str {
        &self.rejection_message
    }
}
