use crate::application_port::AuthError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Access tokens are treated as expired this long before their `exp` claim.
pub const ACCESS_EXPIRY_MARGIN: Duration = Duration::seconds(10);
/// Refresh tokens are treated as expired this long before their `exp` claim.
pub const REFRESH_EXPIRY_MARGIN: Duration = Duration::seconds(300);

/// Token pair as handed out by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: f64,
}

/// Reads the `exp` claim of a JWT without checking its signature.
///
/// Signature checks belong to the service that issued the token; here we only
/// need to know when to stop using it.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| AuthError::TokenDecode(e.to_string()))?;

    let exp = data.claims.exp;
    if !exp.is_finite() {
        return Err(AuthError::TokenDecode(format!("exp claim out of range: {}", exp)));
    }
    DateTime::from_timestamp(exp.trunc() as i64, 0)
        .ok_or_else(|| AuthError::TokenDecode(format!("exp claim out of range: {}", exp)))
}

/// Cached session of one principal.
///
/// Expiry instants are derived from the tokens when they are set and cannot be
/// written on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRecord {
    access_token: Option<String>,
    refresh_token: Option<String>,
    access_expires_at: Option<DateTime<Utc>>,
    refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_expires_at
    }

    pub fn refresh_expires_at(&self) -> Option<DateTime<Utc>> {
        self.refresh_expires_at
    }

    pub fn set_access(&mut self, token: &str) -> Result<(), AuthError> {
        let expires_at = decode_expiry(token)? - ACCESS_EXPIRY_MARGIN;
        self.access_token = Some(token.to_string());
        self.access_expires_at = Some(expires_at);
        Ok(())
    }

    pub fn set_refresh(&mut self, token: &str) -> Result<(), AuthError> {
        let expires_at = decode_expiry(token)? - REFRESH_EXPIRY_MARGIN;
        self.refresh_token = Some(token.to_string());
        self.refresh_expires_at = Some(expires_at);
        Ok(())
    }

    /// Applies both tokens or neither.
    pub fn update(&mut self, access: Option<&str>, refresh: Option<&str>) -> Result<(), AuthError> {
        let mut next = self.clone();
        if let Some(access) = access {
            next.set_access(access)?;
        }
        if let Some(refresh) = refresh {
            next.set_refresh(refresh)?;
        }
        *self = next;
        Ok(())
    }

    /// Drops the access token, e.g. after the server rejected it.
    pub fn clear_access(&mut self) {
        self.access_token = None;
        self.access_expires_at = None;
    }

    /// Forgets every token whose expiry instant has passed and returns what is
    /// still usable.
    pub fn live_tokens(&mut self, now: DateTime<Utc>) -> (Option<String>, Option<String>) {
        if self.access_expires_at.is_some_and(|at| now >= at) {
            self.clear_access();
        }
        if self.refresh_expires_at.is_some_and(|at| now >= at) {
            self.refresh_token = None;
            self.refresh_expires_at = None;
        }
        (self.access_token.clone(), self.refresh_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mint_token;
    use rstest::rstest;

    #[test]
    fn decode_expiry_reads_exp_claim() {
        let exp = Utc::now() + Duration::minutes(5);
        let token = mint_token(exp);

        let decoded = decode_expiry(&token).unwrap();

        assert_eq!(decoded.timestamp(), exp.timestamp());
    }

    #[rstest]
    #[case::garbage("not-a-jwt")]
    #[case::empty("")]
    #[case::bad_payload("eyJhbGciOiJIUzI1NiJ9.bm9wZQ.c2ln")]
    fn decode_expiry_rejects_malformed(#[case] token: &str) {
        assert!(matches!(decode_expiry(token), Err(AuthError::TokenDecode(_))));
    }

    #[test]
    fn decode_expiry_requires_exp() {
        let token = crate::testutil::mint_token_without_exp();
        assert!(matches!(decode_expiry(&token), Err(AuthError::TokenDecode(_))));
    }

    #[rstest]
    #[case::well_before(Duration::seconds(60), true)]
    #[case::just_outside_margin(Duration::seconds(11), true)]
    #[case::at_margin(Duration::seconds(10), false)]
    #[case::inside_margin(Duration::seconds(9), false)]
    #[case::past(Duration::seconds(-1), false)]
    fn access_margin_is_ten_seconds(#[case] remaining: Duration, #[case] live: bool) {
        let now = Utc::now();
        let token = mint_token(now + remaining);
        let mut record = TokenRecord::default();
        record.set_access(&token).unwrap();

        let (access, _) = record.live_tokens(now);

        assert_eq!(access.is_some(), live);
    }

    #[rstest]
    #[case::well_before(Duration::seconds(600), true)]
    #[case::just_outside_margin(Duration::seconds(301), true)]
    #[case::at_margin(Duration::seconds(300), false)]
    #[case::inside_margin(Duration::seconds(120), false)]
    fn refresh_margin_is_five_minutes(#[case] remaining: Duration, #[case] live: bool) {
        let now = Utc::now();
        let token = mint_token(now + remaining);
        let mut record = TokenRecord::default();
        record.set_refresh(&token).unwrap();

        let (_, refresh) = record.live_tokens(now);

        assert_eq!(refresh.is_some(), live);
    }

    #[test]
    fn expired_fields_are_forgotten() {
        let now = Utc::now();
        let mut record = TokenRecord::default();
        record
            .update(
                Some(&mint_token(now + Duration::seconds(5))),
                Some(&mint_token(now + Duration::hours(1))),
            )
            .unwrap();

        let (access, refresh) = record.live_tokens(now);

        assert!(access.is_none());
        assert!(refresh.is_some());
        assert!(record.access_token().is_none());
        assert!(record.access_expires_at().is_none());
        assert!(record.refresh_expires_at().is_some());
    }

    #[test]
    fn update_is_all_or_nothing() {
        let now = Utc::now();
        let access = mint_token(now + Duration::minutes(10));
        let mut record = TokenRecord::default();
        record.update(Some(&access), None).unwrap();

        let result = record.update(Some(&mint_token(now + Duration::minutes(20))), Some("broken"));

        assert!(matches!(result, Err(AuthError::TokenDecode(_))));
        assert_eq!(record.access_token(), Some(access.as_str()));
        assert!(record.refresh_token().is_none());
    }
}
