//! JSON-RPC side of the provider: call encoding, the shared call cache,
//! traffic counters, the well-known answer table, and the provider itself.

pub mod cache;
pub mod coder;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod well_known;

pub use cache::{CallCache, PendingCall, DEFAULT_CACHE_CAPACITY};
pub use coder::{EncodedCall, RpcCoder};
pub use error::ProviderError;
pub use metrics::{ActiveStats, ProviderStats, ProviderStatsTracker, TotalStats};
pub use provider::{ConnectionState, MixnetProvider, ProviderEvent, RpcProvider};
pub use well_known::{NetworkConstants, WellKnownMethod, WellKnownTable};
