use crate::rpc::cache::DEFAULT_CACHE_CAPACITY;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INDEXER_ATTEMPTS: usize = 3;

const ENV_NETWORK: &str = "MIXRPC_NETWORK";
const ENV_RELAY: &str = "MIXRPC_RELAY";
const ENV_SESSION_ID: &str = "MIXRPC_SESSION_ID";
const ENV_CACHE_CAPACITY: &str = "MIXRPC_CACHE_CAPACITY";
const ENV_METADATA_DELAY_MS: &str = "MIXRPC_METADATA_DELAY_MS";
const ENV_INDEXER_ATTEMPTS: &str = "MIXRPC_INDEXER_ATTEMPTS";

/// Settings for one provider session bound to a single relay.
///
/// All instances must be constructed via [`ProviderConfig::builder`] or [`ProviderConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    network: String,
    relay: Vec<u8>,
    session_id: u32,
    transport_params: Vec<u8>,
    cache_capacity: usize,
    metadata_delay: Option<Duration>,
    indexer_attempts: usize,
}

pub struct ProviderConfigParams {
    pub network: String,
    pub relay: Vec<u8>,
    pub session_id: u32,
    pub transport_params: Vec<u8>,
    pub cache_capacity: usize,
    pub metadata_delay: Option<Duration>,
    pub indexer_attempts: usize,
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    pub fn new(params: ProviderConfigParams) -> Result<Self> {
        let ProviderConfigParams {
            network,
            relay,
            session_id,
            transport_params,
            cache_capacity,
            metadata_delay,
            indexer_attempts,
        } = params;

        let config = Self {
            network: network.trim().to_owned(),
            relay,
            session_id,
            transport_params,
            cache_capacity,
            metadata_delay,
            indexer_attempts,
        };

        config.validate()?;
        Ok(config)
    }

    /// Network identifier the provider serves, e.g. `/xx/mainnet`.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Relay identity the provider connects to.
    pub fn relay(&self) -> &[u8] {
        &self.relay
    }

    /// Local mixnet session handed to every request.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn transport_params(&self) -> &[u8] {
        &self.transport_params
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Pause inserted before answering `state_getMetadata` from the static
    /// table. `None` answers immediately.
    pub fn metadata_delay(&self) -> Option<Duration> {
        self.metadata_delay
    }

    pub fn indexer_attempts(&self) -> usize {
        self.indexer_attempts
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.is_empty() {
            bail!("network cannot be empty");
        }
        if !self.network.starts_with('/') {
            bail!("network must start with '/' (got {})", self.network);
        }
        if self.relay.is_empty() {
            bail!("relay cannot be empty");
        }
        if self.cache_capacity == 0 {
            bail!("cache_capacity must be greater than 0");
        }
        if self.indexer_attempts == 0 {
            bail!("indexer_attempts must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProviderConfigBuilder {
    network: Option<String>,
    relay: Option<Vec<u8>>,
    session_id: Option<u32>,
    transport_params: Option<Vec<u8>>,
    cache_capacity: Option<usize>,
    metadata_delay: Option<Duration>,
    indexer_attempts: Option<usize>,
}

impl ProviderConfigBuilder {
    /// Seeds a builder from `MIXRPC_*` environment variables. Unset variables
    /// are left for the caller (or the defaults) to fill in.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::default();

        if let Some(network) = env_var(ENV_NETWORK) {
            builder = builder.network(network);
        }
        if let Some(relay) = env_var(ENV_RELAY) {
            let relay = BASE64_STANDARD
                .decode(relay.trim())
                .with_context(|| format!("{ENV_RELAY} must be base64"))?;
            builder = builder.relay(relay);
        }
        if let Some(session_id) = parse_env::<u32>(ENV_SESSION_ID)? {
            builder = builder.session_id(session_id);
        }
        if let Some(capacity) = parse_env::<usize>(ENV_CACHE_CAPACITY)? {
            builder = builder.cache_capacity(capacity);
        }
        if let Some(delay_ms) = parse_env::<u64>(ENV_METADATA_DELAY_MS)? {
            builder = builder.metadata_delay(Duration::from_millis(delay_ms));
        }
        if let Some(attempts) = parse_env::<usize>(ENV_INDEXER_ATTEMPTS)? {
            builder = builder.indexer_attempts(attempts);
        }

        Ok(builder)
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn relay(mut self, relay: impl Into<Vec<u8>>) -> Self {
        self.relay = Some(relay.into());
        self
    }

    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn transport_params(mut self, params: impl Into<Vec<u8>>) -> Self {
        self.transport_params = Some(params.into());
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = Some(delay);
        self
    }

    pub fn indexer_attempts(mut self, attempts: usize) -> Self {
        self.indexer_attempts = Some(attempts);
        self
    }

    pub fn build(self) -> Result<ProviderConfig> {
        let params = ProviderConfigParams {
            network: self.network.context("network is required")?,
            relay: self.relay.context("relay is required")?,
            session_id: self.session_id.context("session_id is required")?,
            transport_params: self.transport_params.unwrap_or_default(),
            cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            metadata_delay: self.metadata_delay,
            indexer_attempts: self.indexer_attempts.unwrap_or(DEFAULT_INDEXER_ATTEMPTS),
        };

        ProviderConfig::new(params)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {value}"))
        })
        .transpose()
}
