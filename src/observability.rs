use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservations created. Labels: kind.
pub const RESERVATIONS_CREATED_TOTAL: &str = "bookd_reservations_created_total";

/// Counter: creates rejected because the slot was taken. Expected
/// business outcome, counted separately from errors.
pub const SLOT_CONFLICTS_TOTAL: &str = "bookd_slot_conflicts_total";

/// Counter: payments confirmed. Labels: path (auto|manual).
pub const PAYMENTS_CONFIRMED_TOTAL: &str = "bookd_payments_confirmed_total";

/// Counter: payments rejected by staff review. Supersessions are not
/// counted here (they replay with the confirm event). Labels: path.
pub const PAYMENTS_REJECTED_TOTAL: &str = "bookd_payments_rejected_total";

/// Counter: slips the verifier flagged as already used.
pub const DUPLICATE_SLIPS_TOTAL: &str = "bookd_duplicate_slips_total";

/// Counter: verifier timeouts / transport failures.
pub const VERIFIER_UNAVAILABLE_TOTAL: &str = "bookd_verifier_unavailable_total";

// ── USE metrics (background work / resources) ───────────────────

/// Counter: reservations cancelled by the expiry sweep.
pub const SWEEP_CANCELLED_TOTAL: &str = "bookd_sweep_cancelled_total";

/// Histogram: expiry sweep duration in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "bookd_sweep_duration_seconds";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "bookd_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "bookd_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if `port` is
/// `None`.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
