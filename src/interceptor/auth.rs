use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra::*;
use crate::interceptor::*;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tonic::metadata::{Ascii, MetadataValue};
use tracing::{debug, info, warn};

pub const AUTHORIZATION_HEADER: &str = "authorization";

pub const REGISTER_METHOD: &str = "/main.AuthService/RegisterTelegram";

/// Resolves, attaches and renews bearer tokens for the principal named on each
/// call.
///
/// Token resolution for a principal happens under that principal's session
/// lock, so a burst of calls with no valid token produces one login (or one
/// refresh) and the rest of the burst reuses its result.
pub struct AuthInterceptor {
    backend: Arc<dyn AuthBackend>,
    store: TokenStore,
    service_credential: String,
    whitelist: HashSet<String>,
}

impl AuthInterceptor {
    pub fn new(backend: Arc<dyn AuthBackend>, service_credential: impl Into<String>) -> Self {
        Self {
            backend,
            store: TokenStore::new(),
            service_credential: service_credential.into(),
            whitelist: HashSet::from([REGISTER_METHOD.to_string()]),
        }
    }

    /// Replaces the set of methods sent without a bearer token.
    pub fn with_whitelist<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub async fn save_tokens(
        &self,
        principal: Principal,
        tokens: &TokenPair,
    ) -> Result<TokenRecord, AuthError> {
        self.store
            .upsert(
                principal,
                Some(&tokens.access_token),
                Some(&tokens.refresh_token),
            )
            .await
    }

    /// Makes sure `principal` holds a usable session and returns it.
    pub async fn authenticate(&self, principal: Principal) -> Result<TokenRecord, AuthError> {
        let mut session = self.store.lock(principal).await;
        self.resolve_locked(&mut session).await?;
        Ok(session.record().clone())
    }

    /// Creates a backend account for the user and keeps the session it returns.
    pub async fn register(
        &self,
        principal_id: i64,
        username: &str,
    ) -> Result<TokenRecord, AuthError> {
        let principal = Principal::User(principal_id);
        let tokens = self
            .backend
            .register_principal(principal_id, username)
            .await?;
        info!(%principal, username, "principal registered");
        self.save_tokens(principal, &tokens).await
    }

    pub async fn logout(&self, principal: Principal) -> Result<TokenRecord, AuthError> {
        let record = self.store.evict(principal).await?;
        info!(%principal, "session evicted");
        Ok(record)
    }

    async fn resolve(&self, principal: Principal) -> Result<String, AuthError> {
        let mut session = self.store.lock(principal).await;
        self.resolve_locked(&mut session).await
    }

    /// Called after the server rejected `rejected`. Unless another call already
    /// replaced it, the token is dropped and one refresh-or-login cycle runs.
    async fn renew(&self, principal: Principal, rejected: &str) -> Result<String, AuthError> {
        let mut session = self.store.lock(principal).await;
        if session.record().access_token() == Some(rejected) {
            session.clear_access();
        }
        self.resolve_locked(&mut session).await
    }

    async fn resolve_locked(&self, session: &mut SessionGuard) -> Result<String, AuthError> {
        let principal = session.principal();
        let tokens = match session.tokens() {
            (Some(access), _) => return Ok(access),
            (None, Some(refresh)) => self.refresh_or_login(principal, &refresh).await?,
            (None, None) => self.login(principal).await?,
        };
        session.update(Some(&tokens.access_token), Some(&tokens.refresh_token))?;
        Ok(tokens.access_token)
    }

    async fn refresh_or_login(
        &self,
        principal: Principal,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        match self.backend.refresh(refresh_token).await? {
            RefreshOutcome::Renewed(tokens) => {
                info!(%principal, "access token refreshed");
                Ok(tokens)
            }
            RefreshOutcome::Rejected => {
                warn!(%principal, "refresh token rejected, logging in again");
                self.login(principal).await
            }
        }
    }

    async fn login(&self, principal: Principal) -> Result<TokenPair, AuthError> {
        let tokens = match principal {
            Principal::Service => self.backend.login_service(&self.service_credential).await?,
            Principal::User(id) => self.backend.login_principal(id).await?,
        };
        info!(%principal, "logged in");
        Ok(tokens)
    }
}

fn with_bearer(mut request: CallRequest, access_token: &str) -> Result<CallRequest, AuthError> {
    let value: MetadataValue<Ascii> = access_token
        .parse()
        .map_err(|e| AuthError::TokenDecode(format!("access token is not valid metadata: {}", e)))?;
    request.metadata.insert(AUTHORIZATION_HEADER, value);
    Ok(request)
}

#[async_trait::async_trait]
impl CallStage for AuthInterceptor {
    async fn intercept(&self, request: CallRequest, next: Next<'_>) -> Result<Bytes, CallError> {
        debug!(method = %request.method, principal = ?request.principal, "auth interceptor");
        if self.whitelist.contains(&request.method) {
            return next.run(request).await;
        }

        let principal = request.principal.ok_or_else(|| AuthError::MissingPrincipal {
            method: request.method.clone(),
        })?;

        let access = self.resolve(principal).await?;
        match next.run(with_bearer(request.clone(), &access)?).await {
            Err(e) if e.is_unauthenticated() => {
                warn!(%principal, method = %request.method, "access token rejected by server");
            }
            other => return other,
        }

        let access = self.renew(principal, &access).await?;
        let method = request.method.clone();
        match next.run(with_bearer(request, &access)?).await {
            Err(e) if e.is_unauthenticated() => {
                warn!(%principal, %method, "renewed access token rejected, giving up");
                Err(AuthError::AuthenticationExhausted { method }.into())
            }
            other => other,
        }
    }
}
