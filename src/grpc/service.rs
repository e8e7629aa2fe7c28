//! Admission service implementation.

use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use super::messages::{CheckRequest, CheckResponse, Code};
use super::proto::admission_server::Admission;

use crate::ratelimit::{ClientKey, Decision, LimiterSet, GENERAL_POLICY};

/// Implementation of the `Admission` gRPC interface.
pub struct AdmissionServiceImpl {
    /// Limiters by policy name
    limiters: Arc<LimiterSet>,
}

impl AdmissionServiceImpl {
    /// Create a new AdmissionServiceImpl over the given limiters.
    pub fn new(limiters: Arc<LimiterSet>) -> Self {
        Self { limiters }
    }
}

#[tonic::async_trait]
impl Admission for AdmissionServiceImpl {
    /// Decide whether one request may proceed.
    ///
    /// A rejection is a successful response with `code = REJECT`; only
    /// malformed requests produce a gRPC error.
    #[instrument(
        skip(self, request),
        fields(policy = %request.get_ref().policy)
    )]
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let peer_ip = request.remote_addr().map(|addr| addr.ip());
        let req = request.into_inner();

        let policy = if req.policy.is_empty() {
            GENERAL_POLICY
        } else {
            req.policy.as_str()
        };

        let limiter = self.limiters.limiter(policy).map_err(|e| {
            warn!(policy, "Received admission check for unknown policy");
            Status::from(e)
        })?;

        let client = ClientKey::resolve(&req.client_key, peer_ip);
        if client.is_unknown() {
            debug!(policy, "No client identity available, using shared fallback key");
        }

        let decision = limiter.check_now(client.as_str());

        let response = match decision {
            Decision::Admit => CheckResponse {
                code: Code::Admit.into(),
                message: String::new(),
                retry_after: None,
                retry_after_seconds: 0,
            },
            Decision::Reject { retry_after_seconds } => {
                info!(policy, retry_after_seconds, "Request rejected by rate limit");
                CheckResponse {
                    code: Code::Reject.into(),
                    message: limiter.policy().rejection_message().to_string(),
                    retry_after: Some(prost_types::Duration {
                        seconds: retry_after_seconds.min(i64::MAX as u64) as i64,
                        nanos: 0,
                    }),
                    retry_after_seconds,
                }
            }
        };

        Ok(Response::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{ManualClock, PolicyConfig};

    fn service_with(max_requests: u32) -> (AdmissionServiceImpl, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let limiters = LimiterSet::new(
            [
                (GENERAL_POLICY, PolicyConfig::new(60_000, max_requests, "Too many requests").unwrap()),
                ("ai", PolicyConfig::new(60_000, 1, "Too many AI requests").unwrap()),
            ],
            clock.clone(),
        )
        .unwrap();
        (AdmissionServiceImpl::new(Arc::new(limiters)), clock)
    }

    fn check_request(policy: &str, client_key: &str) -> Request<CheckRequest> {
        Request::new(CheckRequest {
            policy: policy.to_string(),
            client_key: client_key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_admit_then_reject() {
        let (service, clock) = service_with(2);

        for _ in 0..2 {
            let response = service.check(check_request("", "1.2.3.4")).await.unwrap().into_inner();
            assert_eq!(response.code(), Code::Admit);
            assert!(response.message.is_empty());
            assert!(response.retry_after.is_none());
        }

        clock.set(30);
        let response = service.check(check_request(GENERAL_POLICY, "1.2.3.4")).await.unwrap().into_inner();
        assert_eq!(response.code(), Code::Reject);
        assert_eq!(response.message, "Too many requests");
        assert_eq!(response.retry_after_seconds, 60);
        assert_eq!(response.retry_after.unwrap().seconds, 60);
    }

    #[tokio::test]
    async fn test_unknown_policy_is_not_found() {
        let (service, _clock) = service_with(1);

        let status = service.check(check_request("billing", "1.2.3.4")).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("billing"));
    }

    #[tokio::test]
    async fn test_policies_are_independent() {
        let (service, _clock) = service_with(5);

        let ai = service.check(check_request("ai", "1.2.3.4")).await.unwrap().into_inner();
        assert_eq!(ai.code(), Code::Admit);
        let ai = service.check(check_request("ai", "1.2.3.4")).await.unwrap().into_inner();
        assert_eq!(ai.code(), Code::Reject);
        assert_eq!(ai.message, "Too many AI requests");

        let general = service.check(check_request("", "1.2.3.4")).await.unwrap().into_inner();
        assert_eq!(general.code(), Code::Admit);
    }

    #[tokio::test]
    async fn test_missing_client_key_shares_unknown_budget() {
        let (service, _clock) = service_with(1);

        // In-process requests carry no peer address.
        let first = service.check(check_request("", "")).await.unwrap().into_inner();
        assert_eq!(first.code(), Code::Admit);
        let second = service.check(check_request("", "   ")).await.unwrap().into_inner();
        assert_eq!(second.code(), Code::Reject);

        let explicit = service.check(check_request("", "10.0.0.1")).await.unwrap().into_inner();
        assert_eq!(explicit.code(), Code::Admit);
    }
}
