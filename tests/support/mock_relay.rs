use anyhow::{anyhow, bail, Result};
use futures::future::BoxFuture;
use mixrpc::transport::envelope::{RequestEnvelope, ResponseEnvelope, RestMethod, NETWORKS_URI};
use mixrpc::MixnetRequester;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted behaviour for one indexer request.
#[derive(Debug, Clone)]
pub enum IndexerReply {
    Json(Value),
    RelayError(String),
    Drop,
}

/// In-process relay reachable through the mixnet primitive. JSON-RPC
/// routes answer from a method table; indexer routes replay a queue.
pub struct MockRelay {
    identity: Vec<u8>,
    networks: Vec<String>,
    results: Mutex<HashMap<String, Value>>,
    indexer: Mutex<VecDeque<IndexerReply>>,
    posts: Mutex<Vec<String>>,
    sessions: Mutex<Vec<u32>>,
}

impl MockRelay {
    pub fn new(identity: &[u8], networks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            identity: identity.to_vec(),
            networks: networks.iter().map(|network| network.to_string()).collect(),
            results: Mutex::new(HashMap::new()),
            indexer: Mutex::new(VecDeque::new()),
            posts: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn answer(&self, method: &str, result: Value) {
        self.results
            .lock()
            .unwrap()
            .insert(method.to_owned(), result);
    }

    pub fn push_indexer(&self, reply: IndexerReply) {
        self.indexer.lock().unwrap().push_back(reply);
    }

    /// Routes of every POST the relay received, in arrival order.
    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }

    pub fn sessions(&self) -> Vec<u32> {
        self.sessions.lock().unwrap().clone()
    }

    fn handle(&self, session_id: u32, recipient: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        if recipient != self.identity.as_slice() {
            bail!("no route to relay");
        }
        self.sessions.lock().unwrap().push(session_id);

        let envelope: RequestEnvelope = serde_json::from_slice(message)?;
        let reply = match envelope.method {
            RestMethod::Get if envelope.uri == NETWORKS_URI => {
                ResponseEnvelope::from_payload(&serde_json::to_vec(&self.networks)?)
            }
            RestMethod::Get => ResponseEnvelope::from_error(format!("unknown uri {}", envelope.uri)),
            RestMethod::Post => {
                self.posts.lock().unwrap().push(envelope.uri.clone());
                let payload = envelope.payload()?;
                if envelope.uri.ends_with("/indexer") {
                    return self.indexer_reply();
                }
                if !self.networks.contains(&envelope.uri) {
                    ResponseEnvelope::from_error(format!("unknown network {}", envelope.uri))
                } else {
                    let body = self.rpc_reply(&payload)?;
                    ResponseEnvelope::from_payload(body.to_string().as_bytes())
                }
            }
        };
        Ok(reply.to_bytes()?)
    }

    fn rpc_reply(&self, payload: &[u8]) -> Result<Value> {
        let call: Value = serde_json::from_slice(payload)?;
        let method = call["method"].as_str().unwrap_or_default();
        let reply = match self.results.lock().unwrap().get(method) {
            Some(result) => json!({"jsonrpc": "2.0", "id": call["id"], "result": result}),
            None => json!({
                "jsonrpc": "2.0",
                "id": call["id"],
                "error": {"code": -32601, "message": "Method not found"}
            }),
        };
        Ok(reply)
    }

    fn indexer_reply(&self) -> Result<Vec<u8>> {
        let next = self
            .indexer
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| IndexerReply::Json(json!({"data": {"extrinsic": []}})));
        let reply = match next {
            IndexerReply::Json(body) => ResponseEnvelope::from_payload(body.to_string().as_bytes()),
            IndexerReply::RelayError(message) => ResponseEnvelope::from_error(message),
            IndexerReply::Drop => return Err(anyhow!("mixnet round dropped")),
        };
        Ok(reply.to_bytes()?)
    }
}

impl MixnetRequester for MockRelay {
    fn request<'a>(
        &'a self,
        session_id: u32,
        recipient: &'a [u8],
        message: Vec<u8>,
        _params: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        let reply = self.handle(session_id, recipient, &message);
        Box::pin(async move { reply })
    }
}
