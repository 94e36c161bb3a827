pub mod client;
pub mod command;
pub mod guard;


pub use client::{Producer, DEFAULT_FLUSH_TIMEOUT_MS};
