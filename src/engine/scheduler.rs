use anyhow::Result;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::adaptation::feedback::{AccuracyTracker, PerformanceRecord};
use crate::adaptation::weights::WeightVector;
use crate::config::AdaptationConfig;
use crate::engine::{EngineError, SignalEngine};
#[cfg(feature = "metrics")]
use crate::monitoring::metrics::EngineMetrics;

/// Where adaptation ticks get their accuracy feedback from.
///
/// `Ok(None)` means no ground truth yet; the adapter then falls back to its
/// random walk (if enabled).
pub trait FeedbackSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Option<PerformanceRecord>>> + Send;
}

/// Never has feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackSource for NoFeedback {
    fn fetch(&self) -> impl Future<Output = Result<Option<PerformanceRecord>>> + Send {
        async { Ok(None) }
    }
}

impl FeedbackSource for Arc<Mutex<AccuracyTracker>> {
    fn fetch(&self) -> impl Future<Output = Result<Option<PerformanceRecord>>> + Send {
        let record = self.lock().performance();
        async move { Ok(record) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Published(WeightVector),
    /// Feedback unavailable in time; prior weights kept.
    Skipped(SkipReason),
    /// The adapter rejected the tick; prior weights kept.
    Failed(EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FeedbackTimeout(Duration),
    FeedbackError(String),
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Published(_) => "published",
            TickOutcome::Skipped(_) => "skipped",
            TickOutcome::Failed(_) => "failed",
        }
    }
}

/// Drives `SignalEngine::adapt` on a fixed period.
pub struct AdaptationScheduler<F> {
    engine: Arc<SignalEngine>,
    source: F,
    period: Duration,
    feedback_timeout: Duration,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<EngineMetrics>>,
}

impl<F: FeedbackSource> AdaptationScheduler<F> {
    pub fn new(engine: Arc<SignalEngine>, source: F, config: &AdaptationConfig) -> Self {
        Self {
            engine,
            source,
            period: Duration::from_millis(config.interval_ms),
            feedback_timeout: Duration::from_millis(config.feedback_timeout_ms),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run a single tick: fetch feedback (bounded by the timeout), then adapt.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.run_tick().await;
        self.observe(&outcome);
        outcome
    }

    #[cfg(feature = "metrics")]
    fn observe(&self, outcome: &TickOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_tick(outcome);
            metrics.record_weights(&self.engine.weights());
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn observe(&self, _outcome: &TickOutcome) {}

    async fn run_tick(&self) -> TickOutcome {
        let feedback = match time::timeout(self.feedback_timeout, self.source.fetch()).await {
            Ok(Ok(feedback)) => feedback,
            Ok(Err(e)) => {
                warn!("Feedback fetch failed, skipping tick: {:#}", e);
                return TickOutcome::Skipped(SkipReason::FeedbackError(e.to_string()));
            }
            Err(_) => {
                warn!(
                    "Feedback fetch exceeded {:?}, skipping tick",
                    self.feedback_timeout
                );
                return TickOutcome::Skipped(SkipReason::FeedbackTimeout(self.feedback_timeout));
            }
        };

        match self.engine.adapt(feedback.as_ref()) {
            Ok(weights) => TickOutcome::Published(weights),
            Err(e) => {
                error!("Adaptation tick rejected: {}", e);
                TickOutcome::Failed(e)
            }
        }
    }

    /// Tick every period until `shutdown` flips to `true` or its sender drops.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        interval.tick().await;

        info!("Adaptation scheduler started (period {:?})", self.period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Adaptation scheduler stopped after {} ticks", self.engine.ticks());
    }
}
