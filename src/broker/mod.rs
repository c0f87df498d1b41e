mod broker;

pub use broker::*;
