use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_grpc::*;
use crate::interceptor::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

/// The assembled call path: api key, then bearer token, then the channel.
pub struct Broker {
    pub auth: Arc<AuthInterceptor>,
    pipeline: Pipeline,
}

impl Broker {
    pub fn new(
        transport: Arc<dyn Transport>,
        backend: Arc<dyn AuthBackend>,
        api_key: ApiKeyInterceptor,
        service_credential: String,
        whitelist: Vec<String>,
        timeout: Duration,
    ) -> Self {
        let auth = Arc::new(AuthInterceptor::new(backend, service_credential).with_whitelist(whitelist));
        let pipeline = Pipeline::builder(transport)
            .stage(Arc::new(api_key))
            .stage(auth.clone())
            .default_timeout(timeout)
            .build();
        Self { auth, pipeline }
    }

    pub fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn Transport> =
            Arc::new(GrpcTransport::connect_lazy(&settings.grpc.endpoint)?);
        let timeout = Duration::from_secs(settings.grpc.timeout_secs);
        let api_key = ApiKeyInterceptor::new(&settings.auth.api_key)
            .map_err(|e| anyhow!("invalid api key: {}", e))?;

        let backend: Arc<dyn AuthBackend> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthBackend::new(FakeAuthConfig {
                service_credential: settings.auth.service_credential.clone(),
                ..FakeAuthConfig::default()
            })),
            "grpc" => Arc::new(GrpcAuthClient::new(
                transport.clone(),
                api_key.clone(),
                Some(timeout),
            )),
            other => return Err(anyhow!("Unknown auth backend: {}", other)),
        };

        info!(
            endpoint = %settings.grpc.endpoint,
            backend = %settings.auth.backend,
            "broker ready"
        );

        Ok(Self::new(
            transport,
            backend,
            api_key,
            settings.auth.service_credential.clone(),
            settings.auth.whitelist.clone(),
            timeout,
        ))
    }

    /// Typed unary call authenticated as `principal`.
    pub async fn unary<Req, Resp>(
        &self,
        method: &str,
        principal: Principal,
        message: &Req,
    ) -> Result<Resp, CallError>
    where
        Req: prost::Message,
        Resp: prost::Message + Default,
    {
        self.pipeline.unary(method, Some(principal), message).await
    }
}
