//! gRPC server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use super::proto::admission_server::AdmissionServer;
use super::service::AdmissionServiceImpl;
use crate::error::{Result, TipscribeError};
use crate::ratelimit::LimiterSet;

/// gRPC server for the admission service.
pub struct GrpcServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Limiters by policy name
    limiters: Arc<LimiterSet>,
}

impl GrpcServer {
    /// Create a new gRPC server over the given limiters.
    pub fn new(addr: SocketAddr, limiters: Arc<LimiterSet>) -> Self {
        Self { addr, limiters }
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_with_listener(listener, signal).await
    }

    /// Serve on an already bound listener.
    ///
    /// Binding to port 0 and passing the listener here lets callers learn the
    /// chosen port before the server starts.
    pub async fn serve_with_listener<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        let service = AdmissionServiceImpl::new(self.limiters);

        info!(
            addr = %local_addr,
            "Starting gRPC server for Admission service with graceful shutdown"
        );

        Server::builder()
            .add_service(AdmissionServer::new(service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                TipscribeError::Grpc(e)
            })
    }
}
