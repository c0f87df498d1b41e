use crate::domain_model::Principal;
use bytes::Bytes;
use std::time::Duration;
use tonic::metadata::MetadataMap;

/// One outbound unary call on its way down the pipeline.
///
/// The principal travels with the request, so concurrent calls for different
/// principals never observe each other's identity.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Full gRPC method path, e.g. `/main.Media/PostURL`.
    pub method: String,
    pub principal: Option<Principal>,
    pub metadata: MetadataMap,
    /// Encoded request message.
    pub message: Bytes,
    pub timeout: Option<Duration>,
}

impl CallRequest {
    pub fn new(method: impl Into<String>, message: Bytes) -> Self {
        Self {
            method: method.into(),
            principal: None,
            metadata: MetadataMap::new(),
            message,
            timeout: None,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The wire at the end of the pipeline.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: CallRequest) -> Result<Bytes, tonic::Status>;
}
