pub mod config;
pub mod error;
pub mod models;
pub mod observer;
pub mod paged;
pub mod player;
pub mod source;
pub mod throttle;

#[cfg(test)]
mod testing;

pub use player::{Notice, PlayerController, PlayerEvent};
