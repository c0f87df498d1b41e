mod api_key;
mod auth;
mod pipeline;

pub use api_key::*;
pub use auth::*;
pub use pipeline::*;
