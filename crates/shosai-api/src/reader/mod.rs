pub mod client;
pub mod error;
pub mod types;

pub use client::ReaderClient;
pub use error::ApiError;
