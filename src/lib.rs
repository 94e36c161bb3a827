//! Producer client for message-queue brokers that speak the Redis protocol.
//!
//! A [`Producer`] owns one broker connection and issues two commands over it:
//!
//! * [`Producer::produce`] appends a message to `topics:<topic>` with a
//!   conditional push, so producing to a topic the broker does not know is a
//!   silent no-op.
//! * [`Producer::flush`] asks the broker to flush buffered messages within a
//!   timeout and returns how many are still outstanding.
//!
//! Connection settings come from [`ProducerOptions`], resolved into an
//! [`EffectiveConfig`](config::EffectiveConfig) by
//! [`ProducerOptions::resolve`].

pub mod config;
pub mod error;
pub mod producer;

pub use config::{ProducerOptions, TransportOptions};
pub use error::{Error, Result};
pub use producer::{Producer, DEFAULT_FLUSH_TIMEOUT_MS};
