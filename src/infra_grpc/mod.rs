mod auth_client;
mod codec;
mod proto;
mod transport;

pub use auth_client::*;
pub use codec::*;
pub use proto::*;
pub use transport::*;
