//! Relay client: discovers the networks a relay serves and exchanges one
//! framed request per logical call through the injected mixnet primitive.
//! No retries happen at this layer.

use crate::rpc::error::ProviderError;
use crate::transport::envelope::{RequestEnvelope, ResponseEnvelope, NETWORKS_URI};
use crate::transport::mixnet::MixnetRequester;
use serde_json::Value;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
struct RelaySession {
    recipient: Arc<[u8]>,
    networks: Arc<[String]>,
}

pub struct RelayClient {
    mixnet: Arc<dyn MixnetRequester>,
    session_id: u32,
    params: Arc<[u8]>,
    session: RwLock<Option<RelaySession>>,
}

impl RelayClient {
    pub fn new(mixnet: Arc<dyn MixnetRequester>, session_id: u32, params: Vec<u8>) -> Self {
        Self {
            mixnet,
            session_id,
            params: params.into(),
            session: RwLock::new(None),
        }
    }

    /// Asks `relay` which networks it serves and binds this client to it.
    pub async fn connect(&self, relay: &[u8]) -> Result<Vec<String>, ProviderError> {
        tracing::debug!(relay_len = relay.len(), "requesting supported networks");
        let (content, _) = self
            .exchange(relay, RequestEnvelope::get(NETWORKS_URI))
            .await?;

        let networks: Vec<String> = serde_json::from_value(content)
            .map_err(|err| ProviderError::decode(format!("invalid network list: {err}")))?;

        tracing::info!(networks = ?networks, "relay reported supported networks");

        let mut session = self.session.write().expect("relay session lock poisoned");
        *session = Some(RelaySession {
            recipient: Arc::from(relay),
            networks: networks.clone().into(),
        });

        Ok(networks)
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .expect("relay session lock poisoned")
            .is_some()
    }

    /// Networks discovered by the last successful `connect`; empty before it.
    pub fn supported_networks(&self) -> Vec<String> {
        self.session
            .read()
            .expect("relay session lock poisoned")
            .as_ref()
            .map(|session| session.networks.to_vec())
            .unwrap_or_default()
    }

    /// Posts `payload` to the relay under `route` (a network identifier or an
    /// indexer key) and returns the reply content with its byte length.
    pub async fn request(&self, route: &str, payload: &[u8]) -> Result<(Value, usize), ProviderError> {
        let recipient = self
            .session
            .read()
            .expect("relay session lock poisoned")
            .as_ref()
            .map(|session| session.recipient.clone())
            .ok_or(ProviderError::NotConnected)?;

        tracing::debug!(route, payload_len = payload.len(), "sending relay request");
        self.exchange(&recipient, RequestEnvelope::post(route, payload))
            .await
    }

    async fn exchange(
        &self,
        recipient: &[u8],
        envelope: RequestEnvelope,
    ) -> Result<(Value, usize), ProviderError> {
        let message = envelope.to_bytes()?;
        tracing::trace!(
            uri = %envelope.uri,
            method = ?envelope.method,
            envelope_len = message.len(),
            "framed relay envelope"
        );

        let reply = self
            .mixnet
            .request(self.session_id, recipient, message, &self.params)
            .await
            .map_err(|err| ProviderError::transport(&err))?;

        let (content, content_len) = ResponseEnvelope::parse_reply(&reply)?;
        tracing::trace!(uri = %envelope.uri, content_len, "unframed relay reply");
        Ok((content, content_len))
    }
}
