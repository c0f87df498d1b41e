use crate::domain_port::*;
use crate::infra_grpc::RawCodec;
use bytes::Bytes;
use tonic::Status;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::trace;

/// Unary calls over a shared tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Connects on first use, so construction never touches the network.
    pub fn connect_lazy(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self::new(channel))
    }
}

#[async_trait::async_trait]
impl Transport for GrpcTransport {
    async fn send(&self, request: CallRequest) -> Result<Bytes, Status> {
        let path = PathAndQuery::try_from(request.method.as_str()).map_err(|e| {
            Status::invalid_argument(format!("invalid method path {}: {}", request.method, e))
        })?;

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("channel not ready: {}", e)))?;

        let mut outbound = tonic::Request::new(request.message);
        *outbound.metadata_mut() = request.metadata;
        if let Some(timeout) = request.timeout {
            outbound.set_timeout(timeout);
        }

        trace!(method = %request.method, "sending unary call");
        let response = grpc.unary(outbound, path, RawCodec).await?;
        Ok(response.into_inner())
    }
}
