//! Rate limiting logic and state management.

mod client_key;
mod clock;
mod limiter;
mod policy;
mod registry;
mod sweeper;

pub use client_key::{ClientKey, UNKNOWN_CLIENT};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use limiter::{ClientWindowState, Decision, RateLimiter, SWEEP_GRACE_MS};
pub use policy::{PolicyConfig, AI_POLICY, GENERAL_POLICY, TRANSCRIPTION_POLICY};
pub use registry::LimiterSet;
pub use sweeper::spawn_sweeper;
