//! HTTP client and wire types for the shosai reading server.

pub mod format;
pub mod reader;
pub mod traits;

pub use reader::{ApiError, ReaderClient};
