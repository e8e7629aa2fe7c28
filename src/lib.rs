//! TipScribe admission limiter
//!
//! Per-client fixed-window rate limiting for the TipScribe medical-visit
//! documentation backend. Each policy (general traffic, AI note generation,
//! transcription) is an independent [`ratelimit::RateLimiter`] held by a
//! [`ratelimit::LimiterSet`], and decisions are served to request handling
//! glue over a small gRPC API.

pub mod config;
pub mod error;
pub mod grpc;
pub mod logging;
pub mod ratelimit;
