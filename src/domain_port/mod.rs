mod auth_backend;
mod transport;

pub use auth_backend::*;
pub use transport::*;
