//! Prometheus metrics for the forging core.
//!
//! [`GeneratorMetrics`] owns a dedicated [`Registry`] that a host process can
//! encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

pub struct GeneratorMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub blocks_generated: IntCounter,
    /// Generation attempts aborted by an error.
    pub generation_failures: IntCounter,
    pub transactions_selected: IntCounter,
    pub single_commits_issued: IntCounter,
    pub single_commits_failed: IntCounter,
    /// Announcements handed to the network.
    pub announcements_broadcast: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub keypairs_enabled: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub block_generation_time_ms: Histogram,
}

impl GeneratorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_generated = register_int_counter_with_registry!(
            Opts::new("delos_blocks_generated_total", "Blocks generated by this node"),
            registry
        )
        .expect("failed to register blocks_generated counter");

        let generation_failures = register_int_counter_with_registry!(
            Opts::new(
                "delos_generation_failures_total",
                "Generation attempts that failed"
            ),
            registry
        )
        .expect("failed to register generation_failures counter");

        let transactions_selected = register_int_counter_with_registry!(
            Opts::new(
                "delos_transactions_selected_total",
                "Transactions included in generated blocks"
            ),
            registry
        )
        .expect("failed to register transactions_selected counter");

        let single_commits_issued = register_int_counter_with_registry!(
            Opts::new(
                "delos_single_commits_issued_total",
                "Single commits certified for local keys"
            ),
            registry
        )
        .expect("failed to register single_commits_issued counter");

        let single_commits_failed = register_int_counter_with_registry!(
            Opts::new(
                "delos_single_commits_failed_total",
                "Single-commit certifications that failed"
            ),
            registry
        )
        .expect("failed to register single_commits_failed counter");

        let announcements_broadcast = register_int_counter_with_registry!(
            Opts::new(
                "delos_announcements_broadcast_total",
                "Transaction announcements broadcast"
            ),
            registry
        )
        .expect("failed to register announcements_broadcast counter");

        let keypairs_enabled = register_int_gauge_with_registry!(
            Opts::new("delos_keypairs_enabled", "Addresses with forging enabled"),
            registry
        )
        .expect("failed to register keypairs_enabled gauge");

        // 1 ms → ~16 s.
        let block_generation_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "delos_block_generation_time_ms",
                "Block generation time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register block_generation_time_ms histogram");

        Self {
            registry,
            blocks_generated,
            generation_failures,
            transactions_selected,
            single_commits_issued,
            single_commits_failed,
            announcements_broadcast,
            keypairs_enabled,
            block_generation_time_ms,
        }
    }

    /// Render every metric in the text exposition format.
    pub fn encode_text(&self) -> String {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for GeneratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
