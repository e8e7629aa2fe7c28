//! Wire messages for `tipscribe.ratelimit.v1.Admission`.

/// Asks whether one request may proceed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckRequest {
    /// Policy name; empty selects the general policy.
    #[prost(string, tag = "1")]
    pub policy: ::prost::alloc::string::String,
    /// Caller identity; empty falls back to the peer address.
    #[prost(string, tag = "2")]
    pub client_key: ::prost::alloc::string::String,
}

/// The decision for a [`CheckRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckResponse {
    #[prost(enumeration = "Code", tag = "1")]
    pub code: i32,
    /// Rejection message; empty when admitted.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// Time until the caller's window resets; unset when admitted.
    #[prost(message, optional, tag = "3")]
    pub retry_after: ::core::option::Option<::prost_types::Duration>,
    /// `retry_after` in whole seconds, suitable for a `Retry-After` header.
    #[prost(uint64, tag = "4")]
    pub retry_after_seconds: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    Unknown = 0,
    Admit = 1,
    Reject = 2,
}
