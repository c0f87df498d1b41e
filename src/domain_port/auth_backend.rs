use crate::application_port::*;
use crate::domain_model::*;

/// Result of presenting a refresh token to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Renewed(TokenPair),
    /// The refresh token is expired or revoked; a fresh login is required.
    Rejected,
}

#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Log the bot itself in with the service credential.
    async fn login_service(&self, credential: &str) -> Result<TokenPair, AuthError>;
    /// Log an end user in. Fails with `PrincipalNotRegistered` for unknown ids.
    async fn login_principal(&self, principal_id: i64) -> Result<TokenPair, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError>;
    /// Create a backend account. Fails with `AlreadyRegistered` for known ids.
    async fn register_principal(
        &self,
        principal_id: i64,
        username: &str,
    ) -> Result<TokenPair, AuthError>;
}
