use crate::domain_model::Principal;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token decode error: {0}")]
    TokenDecode(String),
    #[error("principal {0} is not registered")]
    PrincipalNotRegistered(Principal),
    #[error("principal {0} is already registered")]
    AlreadyRegistered(Principal),
    #[error("auth backend error: {0}")]
    Backend(tonic::Status),
    #[error("{method}: token rejected after re-authentication")]
    AuthenticationExhausted { method: String },
    #[error("no session for principal {0}")]
    NotFound(Principal),
    #[error("{method}: no principal set for authenticated call")]
    MissingPrincipal { method: String },
}

/// Failure of one call through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("rpc failed: {0}")]
    Rpc(tonic::Status),
    #[error("malformed response: {0}")]
    Codec(#[from] prost::DecodeError),
}

impl CallError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, CallError::Rpc(status) if status.code() == tonic::Code::Unauthenticated)
    }
}

impl From<tonic::Status> for CallError {
    fn from(status: tonic::Status) -> Self {
        CallError::Rpc(status)
    }
}
