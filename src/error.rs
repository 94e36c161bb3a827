//! Error types and result handling for rafka-producer.
//!
//! Every failure the transport can produce is classified into one of two
//! kinds before it reaches the caller:
//!
//! * [`Error::Connection`] when the initial connection cannot be opened.
//! * [`Error::Operation`] when a `produce` or `flush` command fails.
//!
//! The transport error is kept as the [`source`](std::error::Error::source)
//! of both variants.
//!
//! # Example
//!
//! ```rust,no_run
//! use rafka_producer::{Error, Producer, ProducerOptions};
//!
//! # async fn example() -> rafka_producer::Result<()> {
//! match Producer::connect(&ProducerOptions::default()).await {
//!     Ok(producer) => producer.close(),
//!     Err(Error::Connection { address, .. }) => eprintln!("broker at {} is down", address),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// The main error type for rafka-producer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Options could not be loaded from a file or the environment.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The initial connection to the broker could not be established.
    #[error("Connection error: could not connect to {address}: {source}")]
    Connection {
        /// `host:port` the producer tried to reach
        address: String,
        #[source]
        source: redis::RedisError,
    },

    /// A broker command failed after the connection was established.
    ///
    /// Covers I/O timeouts, dropped connections and error replies alike.
    #[error("Operation error: {command} failed: {source}")]
    Operation {
        /// Name of the broker command that failed
        command: &'static str,
        #[source]
        source: redis::RedisError,
    },

    /// JSON serialization error when encoding a message.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error outside the transport, e.g. reading messages from stdin.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the producer could not be constructed.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if a command failed on an open connection.
    pub fn is_operation(&self) -> bool {
        matches!(self, Error::Operation { .. })
    }
}

/// A convenient Result type alias for rafka-producer operations.
pub type Result<T> = std::result::Result<T, Error>;
