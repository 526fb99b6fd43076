//! # Prometheus Metrics
//!
//! Operational counters for a basket engine. Every engine owns its own
//! [`prometheus::Registry`] so several engines in one process (or one test
//! binary) never collide on metric names. Embedders expose
//! [`BasketMetrics::encode`] on whatever endpoint they scrape.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metric handles for one engine.
#[derive(Clone)]
pub struct BasketMetrics {
    registry: Registry,
    /// Deposits committed.
    pub deposits_total: IntCounter,
    /// Withdrawals committed.
    pub withdrawals_total: IntCounter,
    /// Basket tokens minted, fees included.
    pub tokens_minted_total: IntCounter,
    pub tokens_burned_total: IntCounter,
    /// Basket tokens minted to the fee collector.
    pub fees_collected_total: IntCounter,
    /// Rejected requests, labelled by error kind.
    pub requests_rejected_total: IntCounterVec,
    pub invariant_violations_total: IntCounter,
    /// Number of batches a withdrawal drew from.
    pub withdrawal_batches_selected: Histogram,
}

impl BasketMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ecobasket".into()), None)?;

        let deposits_total = IntCounter::new("deposits_total", "Total committed deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total committed withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let tokens_minted_total = IntCounter::new(
            "tokens_minted_total",
            "Basket tokens minted by deposits, including fees",
        )?;
        registry.register(Box::new(tokens_minted_total.clone()))?;

        let tokens_burned_total =
            IntCounter::new("tokens_burned_total", "Basket tokens burned by withdrawals")?;
        registry.register(Box::new(tokens_burned_total.clone()))?;

        let fees_collected_total = IntCounter::new(
            "fees_collected_total",
            "Basket tokens minted to the fee collector",
        )?;
        registry.register(Box::new(fees_collected_total.clone()))?;

        let requests_rejected_total = IntCounterVec::new(
            Opts::new("requests_rejected_total", "Rejected requests by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(requests_rejected_total.clone()))?;

        let invariant_violations_total = IntCounter::new(
            "invariant_violations_total",
            "Transactions aborted because backing did not match supply",
        )?;
        registry.register(Box::new(invariant_violations_total.clone()))?;

        let withdrawal_batches_selected = Histogram::with_opts(
            HistogramOpts::new(
                "withdrawal_batches_selected",
                "Number of batches a single withdrawal drew from",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(withdrawal_batches_selected.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            withdrawals_total,
            tokens_minted_total,
            tokens_burned_total,
            fees_collected_total,
            requests_rejected_total,
            invariant_violations_total,
            withdrawal_batches_selected,
        })
    }

    pub(crate) fn record_rejection(&self, kind: &str) {
        self.requests_rejected_total.with_label_values(&[kind]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
