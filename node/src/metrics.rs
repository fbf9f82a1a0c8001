//! Prometheus metrics for the node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub transactions_admitted: IntCounter,
    pub transactions_rejected: IntCounter,
    pub blocks_produced: IntCounter,
    pub blocks_accepted: IntCounter,
    pub blocks_rejected: IntCounter,
    pub requests_rate_limited: IntCounter,
    /// Suspicious-activity records, labelled by category.
    pub suspicious_events: IntCounterVec,
    pub syncs_adopted: IntCounter,
    pub syncs_rejected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub chain_length: IntGauge,
    pub mempool_size: IntGauge,
    pub validator_count: IntGauge,
    pub peer_count: IntGauge,
    pub malicious_peer_count: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let transactions_admitted = register_int_counter_with_registry!(
            Opts::new(
                "qnode_transactions_admitted_total",
                "Transactions admitted to the mempool"
            ),
            registry
        )
        .expect("failed to register transactions_admitted counter");

        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "qnode_transactions_rejected_total",
                "Transactions refused at admission"
            ),
            registry
        )
        .expect("failed to register transactions_rejected counter");

        let blocks_produced = register_int_counter_with_registry!(
            Opts::new("qnode_blocks_produced_total", "Blocks produced locally"),
            registry
        )
        .expect("failed to register blocks_produced counter");

        let blocks_accepted = register_int_counter_with_registry!(
            Opts::new(
                "qnode_blocks_accepted_total",
                "Blocks received from peers and appended"
            ),
            registry
        )
        .expect("failed to register blocks_accepted counter");

        let blocks_rejected = register_int_counter_with_registry!(
            Opts::new(
                "qnode_blocks_rejected_total",
                "Blocks received from peers and refused"
            ),
            registry
        )
        .expect("failed to register blocks_rejected counter");

        let requests_rate_limited = register_int_counter_with_registry!(
            Opts::new(
                "qnode_requests_rate_limited_total",
                "Requests refused by the rate limiter"
            ),
            registry
        )
        .expect("failed to register requests_rate_limited counter");

        let suspicious_events = register_int_counter_vec_with_registry!(
            Opts::new(
                "qnode_suspicious_events_total",
                "Suspicious activities recorded, by category"
            ),
            &["category"],
            registry
        )
        .expect("failed to register suspicious_events counter");

        let syncs_adopted = register_int_counter_with_registry!(
            Opts::new("qnode_syncs_adopted_total", "Peer chains adopted"),
            registry
        )
        .expect("failed to register syncs_adopted counter");

        let syncs_rejected = register_int_counter_with_registry!(
            Opts::new("qnode_syncs_rejected_total", "Peer chains refused"),
            registry
        )
        .expect("failed to register syncs_rejected counter");

        // Gauges
        let chain_length = register_int_gauge_with_registry!(
            Opts::new("qnode_chain_length", "Blocks in the local chain"),
            registry
        )
        .expect("failed to register chain_length gauge");

        let mempool_size = register_int_gauge_with_registry!(
            Opts::new("qnode_mempool_size", "Pending transactions"),
            registry
        )
        .expect("failed to register mempool_size gauge");

        let validator_count = register_int_gauge_with_registry!(
            Opts::new("qnode_validator_count", "Registered validators"),
            registry
        )
        .expect("failed to register validator_count gauge");

        let peer_count = register_int_gauge_with_registry!(
            Opts::new("qnode_peer_count", "Registered peers"),
            registry
        )
        .expect("failed to register peer_count gauge");

        let malicious_peer_count = register_int_gauge_with_registry!(
            Opts::new("qnode_malicious_peer_count", "Peers flagged malicious"),
            registry
        )
        .expect("failed to register malicious_peer_count gauge");

        Self {
            registry,
            transactions_admitted,
            transactions_rejected,
            blocks_produced,
            blocks_accepted,
            blocks_rejected,
            requests_rate_limited,
            suspicious_events,
            syncs_adopted,
            syncs_rejected,
            chain_length,
            mempool_size,
            validator_count,
            peer_count,
            malicious_peer_count,
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
