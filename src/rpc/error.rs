//! Failure taxonomy shared by the provider, the relay client, and the
//! indexer lookup. Every variant is cheap to clone so a single failure can be
//! handed to every caller waiting on the same in-flight call.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    NotConnected,
    ConnectInProgress,
    UnsupportedNetwork { network: String },
    UnsupportedOperation { operation: &'static str },
    Transport { message: String },
    Relay { message: String },
    Decode { message: String },
    Rpc { code: i64, message: String },
    NotFound { message: String },
}

impl ProviderError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        ProviderError::Decode {
            message: message.into(),
        }
    }

    pub(crate) fn transport(err: &anyhow::Error) -> Self {
        ProviderError::Transport {
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        ProviderError::NotFound {
            message: message.into(),
        }
    }

    /// Parse failures are the only class of error the indexer lookup retries.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::Decode { .. } | ProviderError::NotFound { .. }
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotConnected => write!(f, "provider is not connected to a relay"),
            ProviderError::ConnectInProgress => write!(f, "connect already in progress"),
            ProviderError::UnsupportedNetwork { network } => {
                write!(f, "network {network} not supported by relay")
            }
            ProviderError::UnsupportedOperation { operation } => {
                write!(f, "mixnet provider does not support {operation}")
            }
            ProviderError::Transport { message } => write!(f, "mixnet transport failed: {message}"),
            ProviderError::Relay { message } => write!(f, "relay returned an error: {message}"),
            ProviderError::Decode { message } => write!(f, "failed to decode reply: {message}"),
            ProviderError::Rpc { code, message } => write!(f, "{code}: {message}"),
            ProviderError::NotFound { message } => write!(f, "not found: {message}"),
        }
    }
}

impl std::error::Error for ProviderError {}
