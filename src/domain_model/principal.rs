use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity on whose behalf a call is authenticated.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Principal {
    /// The bot itself, logging in with the service credential.
    Service,
    /// An end user, identified by the numeric id the auth backend knows them by.
    User(i64),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Service => write!(f, "service"),
            Principal::User(id) => write!(f, "user:{}", id),
        }
    }
}
