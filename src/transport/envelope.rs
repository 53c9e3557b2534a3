//! REST-like envelope exchanged with the relay: a JSON object whose payload
//! travels base64-encoded in `Content`.

use crate::rpc::error::ProviderError;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const ENVELOPE_VERSION: u32 = 1;
pub const NETWORKS_URI: &str = "/networks";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get = 1,
    Post = 2,
}

impl Serialize for RestMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for RestMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(RestMethod::Get),
            2 => Ok(RestMethod::Post),
            other => Err(serde::de::Error::custom(format!(
                "unknown REST method {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestEnvelope {
    pub version: u32,
    /// Reserved by the relay protocol; always empty.
    pub headers: String,
    pub content: String,
    pub method: RestMethod,
    #[serde(rename = "URI")]
    pub uri: String,
    pub error: String,
}

impl RequestEnvelope {
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(RestMethod::Get, uri.into(), &[])
    }

    pub fn post(uri: impl Into<String>, payload: &[u8]) -> Self {
        Self::new(RestMethod::Post, uri.into(), payload)
    }

    fn new(method: RestMethod, uri: String, payload: &[u8]) -> Self {
        let content = if payload.is_empty() {
            String::new()
        } else {
            BASE64_STANDARD.encode(payload)
        };
        Self {
            version: ENVELOPE_VERSION,
            headers: String::new(),
            content,
            method,
            uri,
            error: String::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(self)
            .map_err(|err| ProviderError::decode(format!("failed to encode envelope: {err}")))
    }

    pub fn payload(&self) -> Result<Vec<u8>, ProviderError> {
        decode_base64(&self.content)
    }
}

/// The relay answers with lowercase keys; the aliases also accept the
/// capitalised form used on the request side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, alias = "Content")]
    pub content: String,
    #[serde(default, alias = "Error")]
    pub error: String,
}

impl ResponseEnvelope {
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            content: BASE64_STANDARD.encode(payload),
            error: String::new(),
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            error: message.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(self)
            .map_err(|err| ProviderError::decode(format!("failed to encode envelope: {err}")))
    }

    /// Unframes a relay reply into its JSON content and the decoded content
    /// length in bytes.
    pub fn parse_reply(reply: &[u8]) -> Result<(Value, usize), ProviderError> {
        let envelope: ResponseEnvelope = serde_json::from_slice(reply)
            .map_err(|err| ProviderError::decode(format!("invalid relay envelope: {err}")))?;

        if !envelope.error.is_empty() {
            return Err(ProviderError::Relay {
                message: envelope.error,
            });
        }

        let content = decode_base64(&envelope.content)?;
        let text = std::str::from_utf8(&content)
            .map_err(|err| ProviderError::decode(format!("relay content is not UTF-8: {err}")))?;
        let value = serde_json::from_str(text)
            .map_err(|err| ProviderError::decode(format!("relay content is not JSON: {err}")))?;

        Ok((value, content.len()))
    }
}

fn decode_base64(content: &str) -> Result<Vec<u8>, ProviderError> {
    BASE64_STANDARD
        .decode(content)
        .map_err(|err| ProviderError::decode(format!("invalid base64 content: {err}")))
}
