use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FakeAuthConfig {
    pub service_credential: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Artificial delay before every answer.
    pub latency: std::time::Duration,
    pub signing_key: Vec<u8>,
}

impl Default for FakeAuthConfig {
    fn default() -> Self {
        Self {
            service_credential: "fake-service-credential".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            latency: std::time::Duration::ZERO,
            signing_key: b"fake-signing-key".to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FakeClaims {
    sub: String,
    exp: i64,
    iat: i64,
    jti: String,
}

/// In-process auth service issuing real JWTs.
///
/// Refresh tokens are single use: presenting one rotates it, presenting it
/// again (or an unknown or expired one) is rejected.
#[derive(Debug)]
pub struct FakeAuthBackend {
    config: FakeAuthConfig,
    registered: DashMap<i64, String>,
    refresh_tokens: DashMap<String, Principal>,
    service_logins: AtomicUsize,
    principal_logins: AtomicUsize,
    refreshes: AtomicUsize,
}

impl FakeAuthBackend {
    pub fn new(config: FakeAuthConfig) -> Self {
        Self {
            config,
            registered: DashMap::new(),
            refresh_tokens: DashMap::new(),
            service_logins: AtomicUsize::new(0),
            principal_logins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Seeds an account, bypassing the registration call.
    pub fn register(&self, principal_id: i64, username: &str) {
        self.registered.insert(principal_id, username.to_string());
    }

    /// Issues a pair whose access token lives for `access_ttl`.
    pub fn issue(&self, principal: Principal, access_ttl: Duration) -> Result<TokenPair, AuthError> {
        let access_token = self.mint(principal, access_ttl)?;
        let refresh_token = self.mint(principal, self.config.refresh_ttl)?;
        self.refresh_tokens.insert(refresh_token.clone(), principal);
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn revoke_refresh(&self, refresh_token: &str) -> bool {
        self.refresh_tokens.remove(refresh_token).is_some()
    }

    pub fn service_login_count(&self) -> usize {
        self.service_logins.load(Ordering::SeqCst)
    }

    pub fn login_count(&self) -> usize {
        self.principal_logins.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn mint(&self, principal: Principal, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = FakeClaims {
            sub: principal.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.config.signing_key),
        )
        .map_err(|e| AuthError::Backend(tonic::Status::internal(e.to_string())))
    }

    async fn delay(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }
}

#[async_trait::async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn login_service(&self, credential: &str) -> Result<TokenPair, AuthError> {
        self.delay().await;
        self.service_logins.fetch_add(1, Ordering::SeqCst);
        if credential != self.config.service_credential {
            return Err(AuthError::Backend(tonic::Status::unauthenticated(
                "invalid service credential",
            )));
        }
        self.issue(Principal::Service, self.config.access_ttl)
    }

    async fn login_principal(&self, principal_id: i64) -> Result<TokenPair, AuthError> {
        self.delay().await;
        self.principal_logins.fetch_add(1, Ordering::SeqCst);
        let principal = Principal::User(principal_id);
        if !self.registered.contains_key(&principal_id) {
            return Err(AuthError::PrincipalNotRegistered(principal));
        }
        self.issue(principal, self.config.access_ttl)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError> {
        self.delay().await;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let principal = match self.refresh_tokens.remove(refresh_token) {
            Some((_, principal)) => principal,
            None => {
                debug!("fake auth: unknown refresh token");
                return Ok(RefreshOutcome::Rejected);
            }
        };
        match decode_expiry(refresh_token) {
            Ok(exp) if exp > Utc::now() => {}
            _ => return Ok(RefreshOutcome::Rejected),
        }
        Ok(RefreshOutcome::Renewed(
            self.issue(principal, self.config.access_ttl)?,
        ))
    }

    async fn register_principal(
        &self,
        principal_id: i64,
        username: &str,
    ) -> Result<TokenPair, AuthError> {
        self.delay().await;
        let mut created = false;
        self.registered.entry(principal_id).or_insert_with(|| {
            created = true;
            username.to_string()
        });
        if !created {
            return Err(AuthError::AlreadyRegistered(Principal::User(principal_id)));
        }
        self.issue(Principal::User(principal_id), self.config.access_ttl)
    }
}
