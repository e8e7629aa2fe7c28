//! gRPC admission API.

pub mod messages;
mod server;
mod service;

pub use server::GrpcServer;
pub use service::AdmissionServiceImpl;

// Generated service scaffolding (see build.rs)
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/tipscribe.ratelimit.v1.Admission.rs"));
}

// Re-export commonly used types
pub use messages::{CheckRequest, CheckResponse, Code};
pub use proto::admission_client::AdmissionClient;
pub use proto::admission_server::{Admission, AdmissionServer};
