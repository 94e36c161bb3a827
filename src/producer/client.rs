use crate::config::{EffectiveConfig, ProducerOptions};
use crate::producer::{command, guard};
use crate::{Error, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, RedisResult, ToRedisArgs};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Default broker-side wait for [`Producer::flush`].
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 5000;

/// A producer bound to one broker connection.
///
/// The connection is opened by [`Producer::connect`] and owned exclusively
/// until [`Producer::close`] is called or the producer is dropped.
///
/// ```rust,no_run
/// use rafka_producer::{Producer, ProducerOptions, DEFAULT_FLUSH_TIMEOUT_MS};
///
/// # async fn example() -> rafka_producer::Result<()> {
/// let mut producer = Producer::connect(&ProducerOptions::new().host("broker")).await?;
///
/// let length = producer.produce("greetings", "Hello there!").await?;
/// if length == 0 {
///     eprintln!("topic 'greetings' does not exist yet");
/// }
///
/// let unflushed = producer.flush(DEFAULT_FLUSH_TIMEOUT_MS).await?;
/// if unflushed > 0 {
///     eprintln!("{} message(s) still buffered", unflushed);
/// }
///
/// producer.close();
/// # Ok(())
/// # }
/// ```
pub struct Producer {
    connection: MultiplexedConnection,
    config: EffectiveConfig,
}

impl Producer {
    /// Resolves `options` and opens the broker connection.
    ///
    /// Fails with [`Error::Connection`] if the broker is unreachable, refuses
    /// the connection or fails the handshake.
    pub async fn connect(options: &ProducerOptions) -> Result<Self> {
        Self::connect_with(options.resolve()).await
    }

    /// Opens the broker connection with an already resolved configuration.
    #[instrument(skip_all, fields(address = %config.address()))]
    pub async fn connect_with(config: EffectiveConfig) -> Result<Self> {
        for key in config.extra.keys() {
            debug!(option = %key, "Option not used by the transport");
        }

        let connection = open(&config).await.map_err(|source| {
            warn!("Failed to connect to broker: {}", source);
            Error::Connection {
                address: config.address(),
                source,
            }
        })?;

        info!("Connected to broker at {}", config.address());

        Ok(Self { connection, config })
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// The underlying transport connection, for commands this client does
    /// not wrap. Errors from commands sent this way are not classified.
    pub fn connection(&mut self) -> &mut MultiplexedConnection {
        &mut self.connection
    }

    /// Appends `message` to `topic` and returns the broker's reply, the
    /// topic's queue length after the push.
    ///
    /// The push is conditional: if the topic does not exist on the broker the
    /// message is discarded and the call returns `Ok(0)`. Topic creation is up
    /// to the broker.
    ///
    /// `message` must encode to a single argument: strings, byte buffers and
    /// numbers all do.
    #[instrument(skip(self, message), fields(topic = %topic, address = %self.config.address()))]
    pub async fn produce(&mut self, topic: &str, message: impl ToRedisArgs) -> Result<u64> {
        let address = self.config.address();
        let cmd = command::produce(topic, message);
        let length: u64 =
            guard::execute(&mut self.connection, &cmd, command::PRODUCE, &address).await?;

        if length == 0 {
            debug!("Topic does not exist on the broker, message dropped");
        }

        Ok(length)
    }

    /// Serializes `value` as compact JSON and produces it to `topic`.
    pub async fn produce_json<T>(&mut self, topic: &str, value: &T) -> Result<u64>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(value)?;
        self.produce(topic, payload).await
    }

    /// Asks the broker to flush buffered messages, waiting at most
    /// `timeout_ms` milliseconds.
    ///
    /// Returns the number of messages still unflushed. A positive count means
    /// the timeout elapsed first; it is not an error.
    #[instrument(skip(self), fields(address = %self.config.address()))]
    pub async fn flush(&mut self, timeout_ms: u64) -> Result<u64> {
        let address = self.config.address();
        let cmd = command::flush(timeout_ms);
        let unflushed: u64 =
            guard::execute(&mut self.connection, &cmd, command::FLUSH, &address).await?;

        if unflushed > 0 {
            warn!(unflushed, "Flush timed out with messages still buffered");
        } else {
            debug!("All buffered messages flushed");
        }

        Ok(unflushed)
    }

    /// Releases the broker connection.
    pub fn close(self) {
        let address = self.config.address();
        drop(self.connection);
        info!("Closed connection to broker at {}", address);
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("address", &self.config.address())
            .finish_non_exhaustive()
    }
}

async fn open(config: &EffectiveConfig) -> RedisResult<MultiplexedConnection> {
    let client = redis::Client::open(config.connection_info())?;

    let mut settings = AsyncConnectionConfig::new();
    if let Some(timeout) = config.connect_timeout {
        settings = settings.set_connection_timeout(timeout);
    }
    if let Some(timeout) = config.response_timeout {
        settings = settings.set_response_timeout(timeout);
    }

    client
        .get_multiplexed_async_connection_with_config(&settings)
        .await
}
