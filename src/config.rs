//! Producer options and their resolution into an [`EffectiveConfig`].
//!
//! Options come from three places, merged in increasing precedence:
//!
//! 1. built-in defaults (`localhost:6380`, db 0, no timeouts)
//! 2. top-level [`ProducerOptions`] fields
//! 3. the nested [`TransportOptions`]
//!
//! Transport options win over top-level `host`/`port` when both are set.
//!
//! ```rust
//! use rafka_producer::config::{ProducerOptions, TransportOptions};
//!
//! let options = ProducerOptions::new()
//!     .host("broker-a")
//!     .port(7000)
//!     .transport_options(TransportOptions {
//!         port: Some(7001),
//!         ..Default::default()
//!     });
//!
//! let config = options.resolve();
//! assert_eq!(config.host, "broker-a");
//! assert_eq!(config.port, 7001);
//! ```

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6380;

const ENV_PREFIX: &str = "RAFKA";

/// Caller-supplied options. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProducerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    // `config` lowercases keys, so file and env sources yield `transportoptions`
    #[serde(default, alias = "transportOptions", alias = "transportoptions")]
    pub transport_options: TransportOptions,
    /// Unrecognized keys, kept for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Options handed to the transport. Merged after the top-level options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransportOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The settings a [`Producer`](crate::Producer) connects with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub response_timeout: Option<Duration>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProducerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn transport_options(mut self, transport_options: TransportOptions) -> Self {
        self.transport_options = transport_options;
        self
    }

    /// Loads options from a TOML, YAML or JSON file, with `RAFKA_*`
    /// environment variables layered on top.
    ///
    /// Nested keys use `__`, e.g. `RAFKA_TRANSPORT_OPTIONS__PASSWORD`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Loads options from `RAFKA_*` environment variables only.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Merges defaults, top-level options and transport options.
    ///
    /// Later sources win key by key, so a `host` or `port` set in
    /// `transport_options` overrides the top-level one. Unknown keys are
    /// carried into [`EffectiveConfig::extra`], transport keys winning on
    /// name clashes.
    pub fn resolve(&self) -> EffectiveConfig {
        let transport = &self.transport_options;

        let mut extra = self.extra.clone();
        extra.extend(transport.extra.clone());

        EffectiveConfig {
            host: transport
                .host
                .clone()
                .or_else(|| self.host.clone())
                .unwrap_or_else(default_host),
            port: transport.port.or(self.port).unwrap_or(DEFAULT_PORT),
            db: transport.db.unwrap_or(0),
            username: transport.username.clone(),
            password: transport.password.clone(),
            connect_timeout: transport.connect_timeout_ms.map(Duration::from_millis),
            response_timeout: transport.response_timeout_ms.map(Duration::from_millis),
            extra,
        }
    }
}

impl EffectiveConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        ProducerOptions::default().resolve()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
