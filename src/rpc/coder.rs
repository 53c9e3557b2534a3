//! JSON-RPC 2.0 framing for calls tunnelled through the relay: request
//! encoding with process-unique ids and response validation.

use crate::rpc::error::ProviderError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Serialize)]
struct CallKey<'a> {
    method: &'a str,
    params: &'a [Value],
}

/// A call ready to be handed to the relay client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub id: u64,
    pub body: String,
    /// Identity of the call without its id; identical method and params
    /// always yield the same key.
    pub cache_key: String,
}

#[derive(Debug, Default)]
pub struct RpcCoder {
    next_id: AtomicU64,
}

impl RpcCoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&self, method: &str, params: &[Value]) -> Result<EncodedCall, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let body = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        })
        .map_err(|err| ProviderError::decode(format!("failed to encode {method} call: {err}")))?;
        let cache_key = serde_json::to_string(&CallKey { method, params })
            .map_err(|err| ProviderError::decode(format!("failed to encode {method} key: {err}")))?;

        Ok(EncodedCall {
            id,
            body,
            cache_key,
        })
    }

    /// Parses raw reply bytes and validates them against the call they answer.
    pub fn decode(&self, expected_id: u64, raw: &[u8]) -> Result<Value, ProviderError> {
        let response: Value = serde_json::from_slice(raw)
            .map_err(|err| ProviderError::decode(format!("invalid JSON-RPC response: {err}")))?;
        self.decode_value(expected_id, response)
    }

    /// Same as [`RpcCoder::decode`] for replies the relay client already parsed.
    pub fn decode_value(&self, expected_id: u64, response: Value) -> Result<Value, ProviderError> {
        let Value::Object(mut object) = response else {
            return Err(ProviderError::decode("JSON-RPC response is not an object"));
        };

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            other => {
                return Err(ProviderError::decode(format!(
                    "unexpected jsonrpc version {other:?}"
                )))
            }
        }

        match object.get("id").and_then(Value::as_u64) {
            Some(id) if id == expected_id => {}
            Some(id) => {
                return Err(ProviderError::decode(format!(
                    "response id {id} does not match request id {expected_id}"
                )))
            }
            None => return Err(ProviderError::decode("response is missing a numeric id")),
        }

        if let Some(error) = object.remove("error").filter(|error| !error.is_null()) {
            return Err(rpc_error(error));
        }

        object
            .remove("result")
            .ok_or_else(|| ProviderError::decode("response carries neither result nor error"))
    }
}

fn rpc_error(error: Value) -> ProviderError {
    let object = match error {
        Value::Object(object) => object,
        other => {
            let mut object = Map::new();
            object.insert("message".into(), other);
            object
        }
    };

    let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = match object.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    ProviderError::Rpc { code, message }
}
