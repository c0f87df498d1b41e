use crate::application_port::*;
use crate::domain_port::*;
use crate::interceptor::*;
use bytes::Bytes;
use tonic::metadata::errors::InvalidMetadataValue;
use tonic::metadata::{Ascii, MetadataValue};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Stamps the service-level credential on every call.
#[derive(Debug, Clone)]
pub struct ApiKeyInterceptor {
    api_key: MetadataValue<Ascii>,
}

impl ApiKeyInterceptor {
    pub fn new(api_key: &str) -> Result<Self, InvalidMetadataValue> {
        Ok(Self {
            api_key: api_key.parse()?,
        })
    }

    pub fn apply(&self, request: &mut CallRequest) {
        request.metadata.append(API_KEY_HEADER, self.api_key.clone());
    }
}

#[async_trait::async_trait]
impl CallStage for ApiKeyInterceptor {
    async fn intercept(&self, mut request: CallRequest, next: Next<'_>) -> Result<Bytes, CallError> {
        self.apply(&mut request);
        next.run(request).await
    }
}
