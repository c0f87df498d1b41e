use crate::domain_port::*;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

const TEST_SECRET: &[u8] = b"test-signing-key";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
    jti: String,
}

/// Signed JWT expiring at `exp`; every call yields a distinct token.
pub fn mint_token(exp: DateTime<Utc>) -> String {
    let claims = Claims {
        sub: "test".to_string(),
        exp: exp.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

pub fn mint_token_without_exp() -> String {
    #[derive(Serialize)]
    struct NoExp {
        sub: String,
    }
    encode(
        &Header::default(),
        &NoExp { sub: "test".to_string() },
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap()
}

/// Transport double: records every request, answers with an empty body
/// unless told to fail.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<CallRequest>>,
    failures: Mutex<VecDeque<tonic::Status>>,
    rejected: Mutex<HashSet<String>>,
    reject_all: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_next(&self, status: tonic::Status) {
        self.failures.lock().unwrap().push_back(status);
    }

    /// Answer UNAUTHENTICATED whenever this bearer token is presented.
    pub fn reject_token(&self, token: &str) {
        self.rejected.lock().unwrap().insert(token.to_string());
    }

    pub fn reject_all(&self) {
        *self.reject_all.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: CallRequest) -> Result<Bytes, tonic::Status> {
        let bearer = request
            .metadata
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(request);

        if let Some(status) = self.failures.lock().unwrap().pop_front() {
            return Err(status);
        }
        let rejected = *self.reject_all.lock().unwrap()
            || bearer.is_some_and(|t| self.rejected.lock().unwrap().contains(&t));
        if rejected {
            return Err(tonic::Status::unauthenticated("token rejected"));
        }
        Ok(Bytes::new())
    }
}
