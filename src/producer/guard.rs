//! Runs broker commands and classifies their failures.
//!
//! Every command the producer sends goes through [`execute`]. Whatever the
//! transport reports (I/O errors, timeouts, error replies) comes back as
//! [`Error::Operation`] with the underlying [`redis::RedisError`] as its source.

use crate::{Error, Result};
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue, RedisError};
use tracing::{debug, warn};

pub async fn execute<T: FromRedisValue>(
    connection: &mut MultiplexedConnection,
    cmd: &Cmd,
    command: &'static str,
    address: &str,
) -> Result<T> {
    debug!(command, "Sending command to broker");

    cmd.query_async(connection)
        .await
        .map_err(|source| classify(command, address, source))
}

pub fn classify(command: &'static str, address: &str, source: RedisError) -> Error {
    warn!(
        command,
        address,
        kind = ?source.kind(),
        timeout = source.is_timeout(),
        "Broker command failed: {}",
        source
    );
    Error::Operation { command, source }
}
