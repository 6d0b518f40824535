use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::adaptation::weights::WeightVector;
use crate::engine::scheduler::TickOutcome;
use crate::strategies::types::{Action, Decision, SignalKind};

/// Prometheus counters for decisions and adaptation ticks.
pub struct EngineMetrics {
    registry: Registry,
    decisions: IntCounterVec,
    ticks: IntCounterVec,
    weights: GaugeVec,
    scores: HistogramVec,
}

impl EngineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new("engine_decisions_total", "Decisions produced, by action"),
            &["action"],
        )?;
        let ticks = IntCounterVec::new(
            Opts::new("engine_adapt_ticks_total", "Adaptation ticks, by outcome"),
            &["outcome"],
        )?;
        let weights = GaugeVec::new(
            Opts::new("engine_signal_weight", "Currently published weight per signal"),
            &["signal"],
        )?;

        let scores = HistogramVec::new(
            HistogramOpts::new("engine_decision_score", "Decision score against the next price, by action")
                .buckets(vec![-0.1, -0.05, -0.02, -0.01, 0.0, 0.01, 0.02, 0.05, 0.1, 0.5, 0.9, 1.0]),
            &["action"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(ticks.clone()))?;
        registry.register(Box::new(weights.clone()))?;
        registry.register(Box::new(scores.clone()))?;

        Ok(Self {
            registry,
            decisions,
            ticks,
            weights,
            scores,
        })
    }

    pub fn record_decision(&self, decision: &Decision) {
        self.decisions
            .with_label_values(&[decision.action.as_str()])
            .inc();
    }

    pub fn record_tick(&self, outcome: &TickOutcome) {
        self.ticks.with_label_values(&[outcome.label()]).inc();
    }

    pub fn record_weights(&self, weights: &WeightVector) {
        for kind in SignalKind::ALL {
            self.weights
                .with_label_values(&[kind.as_str()])
                .set(weights.get(kind));
        }
    }

    pub fn record_score(&self, action: Action, score: f64) {
        self.scores
            .with_label_values(&[action.as_str()])
            .observe(score);
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
