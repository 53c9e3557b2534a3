//! The mixnet-backed RPC provider. Answers invariant calls from the static
//! table, collapses duplicate cacheable calls, and tunnels everything else
//! through the relay client.

use crate::indexer::{self, Inclusion};
use crate::rpc::cache::{CallCache, PendingCall};
use crate::rpc::coder::{EncodedCall, RpcCoder};
use crate::rpc::error::ProviderError;
use crate::rpc::metrics::{ProviderStats, ProviderStatsTracker};
use crate::rpc::well_known::{WellKnownMethod, WellKnownTable};
use crate::runtime::config::ProviderConfig;
use crate::transport::client::RelayClient;
use crate::transport::mixnet::MixnetRequester;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SUBSCRIPTIONS: &str = "subscriptions, use a WebSocket provider instead";
const CLONING: &str = "cloning";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events a push-capable provider would emit. Listeners are never invoked
/// here because the relay has no push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Connected,
    Disconnected,
    Error,
}

/// Capability surface expected by blockchain client libraries.
pub trait RpcProvider: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<()>>;

    fn disconnect(&self) -> BoxFuture<'_, Result<()>>;

    fn send<'a>(
        &'a self,
        method: &'a str,
        params: Vec<Value>,
        cacheable: bool,
    ) -> BoxFuture<'a, Result<Value>>;

    fn subscribe<'a>(
        &'a self,
        kind: &'a str,
        method: &'a str,
        params: Vec<Value>,
    ) -> BoxFuture<'a, Result<u64>>;

    fn unsubscribe<'a>(
        &'a self,
        kind: &'a str,
        method: &'a str,
        id: u64,
    ) -> BoxFuture<'a, Result<bool>>;

    fn is_connected(&self) -> bool;

    fn has_subscriptions(&self) -> bool;

    fn is_clonable(&self) -> bool;

    fn stats(&self) -> ProviderStats;
}

pub struct MixnetProvider {
    network: Arc<str>,
    relay: Arc<[u8]>,
    metadata_delay: Option<Duration>,
    indexer_attempts: usize,
    client: Arc<RelayClient>,
    coder: Arc<RpcCoder>,
    cache: CallCache,
    stats: Arc<ProviderStatsTracker>,
    well_known: WellKnownTable,
    state: Mutex<ConnectionState>,
    network_rejected: AtomicBool,
}

impl MixnetProvider {
    /// Builds a provider answering well-known calls from the bundled table.
    pub fn new(config: &ProviderConfig, mixnet: Arc<dyn MixnetRequester>) -> Result<Self> {
        Self::with_well_known(config, mixnet, WellKnownTable::builtin()?)
    }

    pub fn with_well_known(
        config: &ProviderConfig,
        mixnet: Arc<dyn MixnetRequester>,
        well_known: WellKnownTable,
    ) -> Result<Self> {
        config.validate()?;

        if !well_known.contains_network(config.network()) {
            tracing::warn!(
                network = config.network(),
                "no well-known answers for network; every call goes through the relay"
            );
        }

        let client = RelayClient::new(
            mixnet,
            config.session_id(),
            config.transport_params().to_vec(),
        );

        Ok(Self {
            network: Arc::from(config.network()),
            relay: Arc::from(config.relay()),
            metadata_delay: config.metadata_delay(),
            indexer_attempts: config.indexer_attempts(),
            client: Arc::new(client),
            coder: Arc::new(RpcCoder::new()),
            cache: CallCache::new(config.cache_capacity()),
            stats: Arc::new(ProviderStatsTracker::default()),
            well_known,
            state: Mutex::new(ConnectionState::Disconnected),
            network_rejected: AtomicBool::new(false),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state mutex poisoned")
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Networks the relay reported during the last successful handshake.
    pub fn supported_networks(&self) -> Vec<String> {
        self.client.supported_networks()
    }

    /// The relay client bound to this provider's session, for follow-up
    /// lookups such as [`indexer::fetch_inclusion`].
    pub fn relay_client(&self) -> Arc<RelayClient> {
        self.client.clone()
    }

    pub fn stats(&self) -> ProviderStats {
        self.stats.snapshot()
    }

    pub fn stats_tracker(&self) -> Arc<ProviderStatsTracker> {
        self.stats.clone()
    }

    /// Performs the relay handshake and checks that the configured network
    /// is served. Connecting an already connected provider is a no-op.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.lock().expect("connection state mutex poisoned");
            let current = *state;
            match current {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => return Err(ProviderError::ConnectInProgress.into()),
                ConnectionState::Disconnected => {
                    transition(&mut state, ConnectionState::Connecting, &self.network)
                }
            }
        }

        let outcome = self.handshake().await;

        let mut state = self.state.lock().expect("connection state mutex poisoned");
        if *state != ConnectionState::Connecting {
            tracing::warn!(
                network = %self.network,
                state = ?*state,
                "provider left the connecting state during the handshake"
            );
            return outcome.and(Err(ProviderError::NotConnected.into()));
        }

        let next = if outcome.is_ok() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        transition(&mut state, next, &self.network);

        outcome
    }

    async fn handshake(&self) -> Result<()> {
        let networks = self.client.connect(&self.relay).await?;

        if !networks.iter().any(|network| network.as_str() == &*self.network) {
            self.network_rejected.store(true, Ordering::SeqCst);
            tracing::error!(
                network = %self.network,
                supported = ?networks,
                "relay does not serve the requested network"
            );
            return Err(ProviderError::UnsupportedNetwork {
                network: self.network.to_string(),
            }
            .into());
        }

        self.network_rejected.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// The relay offers no teardown primitive; this only flips the state.
    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().expect("connection state mutex poisoned");
        transition(&mut state, ConnectionState::Disconnected, &self.network);
        Ok(())
    }

    pub async fn send(&self, method: &str, params: Vec<Value>, cacheable: bool) -> Result<Value> {
        self.stats.record_accepted();
        self.ensure_network_accepted()?;

        if let Some((kind, value)) = self.well_known.lookup(&self.network, method, &params) {
            tracing::debug!(method, network = %self.network, "answering from well-known table");
            if kind == WellKnownMethod::Metadata {
                if let Some(delay) = self.metadata_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            return Ok(value);
        }

        self.ensure_connected()?;

        let call = self.coder.encode(method, &params)?;
        tracing::debug!(method, id = call.id, cacheable, "dispatching call through relay");

        let result = if cacheable {
            let key = call.cache_key.clone();
            let (pending, existed) = self.cache.get_or_insert_with(&key, || self.dispatch(call));
            if existed {
                self.stats.record_cache_hit();
                tracing::debug!(method, "joined in-flight cacheable call");
            }
            pending.await
        } else {
            self.dispatch_once(call).await
        };

        result.map_err(Into::into)
    }

    fn ensure_network_accepted(&self) -> Result<(), ProviderError> {
        if self.network_rejected.load(Ordering::SeqCst) {
            return Err(ProviderError::UnsupportedNetwork {
                network: self.network.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::NotConnected);
        }
        Ok(())
    }

    fn dispatch(&self, call: EncodedCall) -> PendingCall {
        self.dispatch_once(call).shared()
    }

    fn dispatch_once(&self, call: EncodedCall) -> BoxFuture<'static, Result<Value, ProviderError>> {
        let client = self.client.clone();
        let coder = self.coder.clone();
        let stats = self.stats.clone();
        let network = self.network.clone();

        async move {
            stats.record_send_started(call.body.len());

            let outcome = match client.request(&network, call.body.as_bytes()).await {
                Ok((response, response_len)) => {
                    stats.record_bytes_received(response_len);
                    coder.decode_value(call.id, response)
                }
                Err(err) => Err(err),
            };

            stats.record_send_finished(outcome.is_ok());
            if let Err(err) = &outcome {
                tracing::debug!(id = call.id, error = %err, "relay call failed");
            }
            outcome
        }
        .boxed()
    }

    /// Looks up where a submitted transaction landed, using this provider's
    /// network, relay session, and configured attempt bound.
    pub async fn fetch_inclusion(&self, tx_hash: &str) -> Result<Inclusion> {
        self.ensure_network_accepted()?;
        self.ensure_connected()?;

        indexer::fetch_inclusion_with_attempts(
            &self.network,
            tx_hash,
            &self.client,
            self.indexer_attempts,
        )
        .await
    }

    pub async fn subscribe(&self, _kind: &str, _method: &str, _params: Vec<Value>) -> Result<u64> {
        Err(unsupported(SUBSCRIPTIONS))
    }

    pub async fn unsubscribe(&self, _kind: &str, _method: &str, _id: u64) -> Result<bool> {
        Err(unsupported(SUBSCRIPTIONS))
    }

    /// Sessions are bound to one relay connection and cannot be duplicated.
    pub fn try_clone(&self) -> Result<Self> {
        Err(unsupported(CLONING))
    }

    /// Event listeners are accepted for API compatibility but never fire.
    pub fn on(&self, event: ProviderEvent) {
        tracing::error!(
            ?event,
            "mixnet provider does not have 'on' emitters, use a WebSocket provider instead"
        );
    }
}

fn unsupported(operation: &'static str) -> anyhow::Error {
    tracing::error!(operation, "unsupported provider operation");
    ProviderError::UnsupportedOperation { operation }.into()
}

fn transition(state: &mut ConnectionState, next: ConnectionState, network: &str) {
    if *state != next {
        tracing::info!(
            network,
            previous = ?*state,
            next = ?next,
            "provider connection state changed"
        );
        *state = next;
    }
}

impl RpcProvider for MixnetProvider {
    fn connect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(MixnetProvider::connect(self))
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(MixnetProvider::disconnect(self))
    }

    fn send<'a>(
        &'a self,
        method: &'a str,
        params: Vec<Value>,
        cacheable: bool,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(MixnetProvider::send(self, method, params, cacheable))
    }

    fn subscribe<'a>(
        &'a self,
        kind: &'a str,
        method: &'a str,
        params: Vec<Value>,
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(MixnetProvider::subscribe(self, kind, method, params))
    }

    fn unsubscribe<'a>(
        &'a self,
        kind: &'a str,
        method: &'a str,
        id: u64,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(MixnetProvider::unsubscribe(self, kind, method, id))
    }

    fn is_connected(&self) -> bool {
        MixnetProvider::is_connected(self)
    }

    fn has_subscriptions(&self) -> bool {
        false
    }

    fn is_clonable(&self) -> bool {
        false
    }

    fn stats(&self) -> ProviderStats {
        MixnetProvider::stats(self)
    }
}
