pub mod indexer;
pub mod rpc;
pub mod runtime;
pub mod transport;

pub use indexer::{fetch_inclusion, fetch_inclusion_with_attempts, Inclusion, IndexerSchema};
pub use rpc::{
    ConnectionState, MixnetProvider, ProviderError, ProviderEvent, ProviderStats,
    ProviderStatsTracker, RpcProvider, WellKnownTable,
};
pub use runtime::config::{ProviderConfig, ProviderConfigBuilder, ProviderConfigParams};
pub use runtime::telemetry::{init_tracing, spawn_stats_reporter, DEFAULT_STATS_INTERVAL};
pub use transport::{MixnetRequester, RelayClient};
