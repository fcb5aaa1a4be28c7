//! Background expiry sweep and WAL compaction.
//!
//! Both loops are shut down through a watch channel so an embedding
//! process can drain them cleanly. A failed tick is logged and retried on
//! the next one; the sweep itself is idempotent.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::model::now_ms;
use crate::observability;

/// Periodically cancel pending reservations whose hold has lapsed.
pub async fn run_sweeper(engine: Arc<Engine>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(engine.policy().sweep_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                info!("sweeper shutting down");
                return;
            }
        }

        let started = std::time::Instant::now();
        let cancelled = engine.sweep_expired(now_ms()).await;
        metrics::histogram!(observability::SWEEP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(cancelled, "sweep tick");
    }
}

/// Compact the WAL whenever enough appends have accumulated since the
/// last compaction. Runs on the sweep cadence; compaction errors are
/// logged and retried next tick.
pub async fn run_compactor(engine: Arc<Engine>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(engine.policy().sweep_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                info!("compactor shutting down");
                return;
            }
        }

        let appends = engine.wal_appends_since_compact().await;
        if appends < engine.policy().compact_threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!(appends, "WAL compacted"),
            Err(e) => tracing::warn!(error = %e, "WAL compaction failed"),
        }
    }
}
