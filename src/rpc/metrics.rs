//! Process-lifetime counters for provider traffic. Mutated only at request
//! begin/end points and exposed as copyable snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ProviderStatsTracker {
    active_requests: AtomicU64,
    total_requests: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_recv: AtomicU64,
    cached: AtomicU64,
    errors: AtomicU64,
}

impl ProviderStatsTracker {
    pub(crate) fn record_accepted(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_started(&self, body_len: usize) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(body_len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_received(&self, response_len: usize) {
        self.bytes_recv
            .fetch_add(response_len as u64, Ordering::Relaxed);
    }

    /// Closes a send opened by `record_send_started`. Failures cover both the
    /// transport and decoding of its reply.
    pub(crate) fn record_send_finished(&self, succeeded: bool) {
        if !succeeded {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.finish_active();
    }

    fn finish_active(&self) {
        // Saturating so an unbalanced finish can never wrap the gauge.
        let _ = self
            .active_requests
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |active| {
                Some(active.saturating_sub(1))
            });
    }

    pub fn snapshot(&self) -> ProviderStats {
        ProviderStats {
            active: ActiveStats {
                requests: self.active_requests.load(Ordering::Relaxed),
                subscriptions: 0,
            },
            total: TotalStats {
                requests: self.total_requests.load(Ordering::Relaxed),
                bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
                bytes_recv: self.bytes_recv.load(Ordering::Relaxed),
                cached: self.cached.load(Ordering::Relaxed),
                errors: self.errors.load(Ordering::Relaxed),
                subscriptions: 0,
                timeout: 0,
            },
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ProviderStats {
    pub active: ActiveStats,
    pub total: TotalStats,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ActiveStats {
    pub requests: u64,
    /// The relay has no push channel, so this is always zero.
    pub subscriptions: u64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TotalStats {
    pub requests: u64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub cached: u64,
    pub errors: u64,
    pub subscriptions: u64,
    /// No deadline is enforced on relay round trips; always zero.
    pub timeout: u64,
}
