use crate::rpc::metrics::ProviderStatsTracker;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the stats reporter task.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Spawns a background task that periodically logs provider traffic counters.
pub fn spawn_stats_reporter(
    stats: Arc<ProviderStatsTracker>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = stats.snapshot();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "mixrpc::stats", "stats reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = stats.snapshot();
                    let new_requests = current
                        .total
                        .requests
                        .saturating_sub(last_snapshot.total.requests);

                    tracing::info!(
                        target: "mixrpc::stats",
                        new_requests,
                        active_requests = current.active.requests,
                        total_requests = current.total.requests,
                        bytes_sent = current.total.bytes_sent,
                        bytes_recv = current.total.bytes_recv,
                        cached = current.total.cached,
                        errors = current.total.errors,
                        "provider stats snapshot"
                    );

                    last_snapshot = current;
                }
            }
        }
    })
}
