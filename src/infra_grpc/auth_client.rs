use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_grpc::*;
use crate::interceptor::*;
use std::sync::Arc;
use std::time::Duration;
use tonic::Code;
use tracing::debug;

/// Client of the remote `main.AuthService`.
///
/// Runs on its own pipeline carrying only the api key, so auth calls never
/// recurse into the token interceptor.
pub struct GrpcAuthClient {
    pipeline: Pipeline,
}

impl GrpcAuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: ApiKeyInterceptor,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Pipeline::builder(transport).stage(Arc::new(api_key));
        if let Some(timeout) = timeout {
            builder = builder.default_timeout(timeout);
        }
        Self {
            pipeline: builder.build(),
        }
    }

    async fn call<Req: prost::Message>(
        &self,
        method: &str,
        message: &Req,
    ) -> Result<TokenPair, CallError> {
        debug!(method, "auth backend call");
        let response: TokenResponse = self.pipeline.unary(method, None, message).await?;
        Ok(TokenPair::new(response.access_token, response.refresh_token))
    }
}

fn backend_error(err: CallError) -> AuthError {
    match err {
        CallError::Auth(e) => e,
        CallError::Rpc(status) => AuthError::Backend(status),
        CallError::Codec(e) => {
            AuthError::Backend(tonic::Status::internal(format!("malformed auth response: {}", e)))
        }
    }
}

fn has_code(err: &CallError, code: Code) -> bool {
    matches!(err, CallError::Rpc(status) if status.code() == code)
}

#[async_trait::async_trait]
impl AuthBackend for GrpcAuthClient {
    async fn login_service(&self, credential: &str) -> Result<TokenPair, AuthError> {
        let request = BotLoginRequest {
            credential: credential.to_string(),
        };
        self.call(LOGIN_BOT_METHOD, &request)
            .await
            .map_err(backend_error)
    }

    async fn login_principal(&self, principal_id: i64) -> Result<TokenPair, AuthError> {
        let request = TelegramLoginRequest {
            telegram_id: principal_id,
        };
        match self.call(LOGIN_TELEGRAM_METHOD, &request).await {
            Ok(tokens) => Ok(tokens),
            Err(e) if has_code(&e, Code::NotFound) => {
                Err(AuthError::PrincipalNotRegistered(Principal::User(principal_id)))
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError> {
        let request = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        match self.call(REFRESH_TOKEN_METHOD, &request).await {
            Ok(tokens) => Ok(RefreshOutcome::Renewed(tokens)),
            Err(e) if has_code(&e, Code::Unauthenticated) => Ok(RefreshOutcome::Rejected),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn register_principal(
        &self,
        principal_id: i64,
        username: &str,
    ) -> Result<TokenPair, AuthError> {
        let request = RegisterTelegramRequest {
            telegram_id: principal_id,
            username: username.to_string(),
        };
        match self.call(REGISTER_TELEGRAM_METHOD, &request).await {
            Ok(tokens) => Ok(tokens),
            Err(e) if has_code(&e, Code::AlreadyExists) => {
                Err(AuthError::AlreadyRegistered(Principal::User(principal_id)))
            }
            Err(e) => Err(backend_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use prost::Message;
    use std::sync::Mutex;
    use tonic::Status;

    type Reply = Box<dyn Fn(&CallRequest) -> Result<Bytes, Status> + Send + Sync>;

    struct ScriptedTransport {
        reply: Reply,
        seen: Mutex<Vec<CallRequest>>,
    }

    impl ScriptedTransport {
        fn new(reply: impl Fn(&CallRequest) -> Result<Bytes, Status> + Send + Sync + 'static) -> Self {
            Self {
                reply: Box::new(reply),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: CallRequest) -> Result<Bytes, Status> {
            let reply = (self.reply)(&request);
            self.seen.lock().unwrap().push(request);
            reply
        }
    }

    fn tokens(access: &str, refresh: &str) -> Result<Bytes, Status> {
        let response = TokenResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        };
        Ok(Bytes::from(response.encode_to_vec()))
    }

    fn client(transport: Arc<ScriptedTransport>) -> GrpcAuthClient {
        GrpcAuthClient::new(
            transport,
            ApiKeyInterceptor::new("api-key").unwrap(),
            Some(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn login_principal_sends_id_and_api_key() {
        let transport = Arc::new(ScriptedTransport::new(|_| tokens("a1", "r1")));

        let pair = client(transport.clone()).login_principal(42).await.unwrap();

        assert_eq!(pair, TokenPair::new("a1", "r1"));
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].method, LOGIN_TELEGRAM_METHOD);
        assert_eq!(
            seen[0].metadata.get(API_KEY_HEADER).unwrap().to_str().unwrap(),
            "api-key"
        );
        assert!(seen[0].metadata.get(AUTHORIZATION_HEADER).is_none());
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(5)));
        let sent = TelegramLoginRequest::decode(seen[0].message.clone()).unwrap();
        assert_eq!(sent.telegram_id, 42);
    }

    #[tokio::test]
    async fn not_found_login_means_unregistered() {
        let transport = Arc::new(ScriptedTransport::new(|_| Err(Status::not_found("no user"))));

        let err = client(transport).login_principal(99).await.unwrap_err();

        assert!(matches!(err, AuthError::PrincipalNotRegistered(Principal::User(99))));
    }

    #[tokio::test]
    async fn unauthenticated_refresh_is_rejected_outcome() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(Status::unauthenticated("refresh expired"))
        }));

        let outcome = client(transport).refresh("r1").await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Rejected);
    }

    #[tokio::test]
    async fn refresh_renews_pair() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            let sent = RefreshRequest::decode(request.message.clone()).unwrap();
            assert_eq!(sent.refresh_token, "r1");
            tokens("a2", "r2")
        }));

        let outcome = client(transport).refresh("r1").await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Renewed(TokenPair::new("a2", "r2")));
    }

    #[tokio::test]
    async fn already_exists_means_already_registered() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(Status::already_exists("taken"))
        }));

        let err = client(transport)
            .register_principal(7, "annie")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::AlreadyRegistered(Principal::User(7))));
    }

    #[tokio::test]
    async fn other_failures_are_backend_errors() {
        let transport = Arc::new(ScriptedTransport::new(|_| Err(Status::unavailable("down"))));
        let client = client(transport);

        let login = client.login_service("bot").await.unwrap_err();
        let refresh = client.refresh("r1").await.unwrap_err();

        assert!(matches!(login, AuthError::Backend(s) if s.code() == Code::Unavailable));
        assert!(matches!(refresh, AuthError::Backend(s) if s.code() == Code::Unavailable));
    }

    #[tokio::test]
    async fn garbage_response_is_backend_error() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(Bytes::from_static(&[0xff, 0xff, 0xff]))
        }));

        let err = client(transport).login_principal(1).await.unwrap_err();

        assert!(matches!(err, AuthError::Backend(s) if s.code() == Code::Internal));
    }
}
