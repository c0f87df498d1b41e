//! Console logging plus an optional log file, with the filter swapped in once
//! settings are loaded.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
