//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `wallet_deposits_total` - Completed deposit mutations
//! - `wallet_withdrawals_total` - Completed withdrawal mutations
//! - `wallet_rejections_total` - Mutations rejected before any write
//! - `wallet_reference_retries_total` - Reference regenerations after collision
//! - `wallet_commit_duration_seconds` - Histogram of mutation commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed deposits
    pub deposits_total: IntCounter,

    /// Completed withdrawals
    pub withdrawals_total: IntCounter,

    /// Rejected mutations (validation errors, no write)
    pub rejections_total: IntCounter,

    /// Reference regenerations after a store-level collision
    pub reference_retries_total: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total =
            IntCounter::new("wallet_deposits_total", "Completed deposit mutations")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("wallet_withdrawals_total", "Completed withdrawal mutations")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejections_total = IntCounter::new(
            "wallet_rejections_total",
            "Mutations rejected before any write",
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let reference_retries_total = IntCounter::new(
            "wallet_reference_retries_total",
            "Reference regenerations after collision",
        )?;
        registry.register(Box::new(reference_retries_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_commit_duration_seconds",
                "Histogram of mutation commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            deposits_total,
            withdrawals_total,
            rejections_total,
            reference_retries_total,
            commit_duration,
            registry,
        })
    }

    /// Record a completed deposit
    pub fn record_deposit(&self) {
        self.deposits_total.inc();
    }

    /// Record a completed withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals_total.inc();
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self) {
        self.rejections_total.inc();
    }

    /// Record a reference collision retry
    pub fn record_reference_retry(&self) {
        self.reference_retries_total.inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
