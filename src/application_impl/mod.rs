mod auth_backend_fake;

pub use auth_backend_fake::*;
