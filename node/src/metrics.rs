//! Prometheus metrics for the phaseguard node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that an embedding
//! process can encode into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Heights run through the height processor.
    pub heights_processed: IntCounter,
    /// Transactions refused by the gate, the validator or the duplicate check.
    pub transactions_rejected: IntCounter,
    /// Committed control changes (installs, replacements and clears).
    pub control_updates: IntCounter,
    /// Votes recorded on pending phased transactions.
    pub votes_recorded: IntCounter,
    /// Votes refused (unknown or final transaction).
    pub votes_rejected: IntCounter,
    /// Phased transactions that reached quorum.
    pub approvals: IntCounter,
    /// Phased transactions that passed finality without quorum.
    pub expiries: IntCounter,
    /// Evaluations put off because chain state was unavailable.
    pub deferred_evaluations: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Phased transactions currently PENDING.
    pub pending_transactions: IntGauge,
    /// Accounts currently under a phasing-only control.
    pub controlled_accounts: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let heights_processed = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_heights_processed_total",
                "Total heights processed by this node"
            ),
            registry
        )
        .expect("failed to register heights_processed counter");

        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_transactions_rejected_total",
                "Total transactions refused at admission"
            ),
            registry
        )
        .expect("failed to register transactions_rejected counter");

        let control_updates = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_control_updates_total",
                "Total committed phasing-only control changes"
            ),
            registry
        )
        .expect("failed to register control_updates counter");

        let votes_recorded = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_votes_recorded_total",
                "Total votes recorded on phased transactions"
            ),
            registry
        )
        .expect("failed to register votes_recorded counter");

        let votes_rejected = register_int_counter_with_registry!(
            Opts::new("phaseguard_votes_rejected_total", "Total votes refused"),
            registry
        )
        .expect("failed to register votes_rejected counter");

        let approvals = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_phasing_approvals_total",
                "Total phased transactions approved"
            ),
            registry
        )
        .expect("failed to register approvals counter");

        let expiries = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_phasing_expiries_total",
                "Total phased transactions expired"
            ),
            registry
        )
        .expect("failed to register expiries counter");

        let deferred_evaluations = register_int_counter_with_registry!(
            Opts::new(
                "phaseguard_deferred_evaluations_total",
                "Total evaluations deferred on unavailable state"
            ),
            registry
        )
        .expect("failed to register deferred_evaluations counter");

        let pending_transactions = register_int_gauge_with_registry!(
            Opts::new(
                "phaseguard_pending_transactions",
                "Current number of pending phased transactions"
            ),
            registry
        )
        .expect("failed to register pending_transactions gauge");

        let controlled_accounts = register_int_gauge_with_registry!(
            Opts::new(
                "phaseguard_controlled_accounts",
                "Current number of accounts under phasing-only control"
            ),
            registry
        )
        .expect("failed to register controlled_accounts gauge");

        Self {
            registry,
            heights_processed,
            transactions_rejected,
            control_updates,
            votes_recorded,
            votes_rejected,
            approvals,
            expiries,
            deferred_evaluations,
            pending_transactions,
            controlled_accounts,
        }
    }

    /// Encode every metric in the text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        // Encoding into a Vec only fails on malformed metric families.
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
