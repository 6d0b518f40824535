use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, error, info};

use crate::adaptation::feedback::PerformanceRecord;
use crate::adaptation::weights::{project_onto_bounds, WeightVector};
use crate::config::AdaptationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationMode {
    /// Weight moves toward signals with above-average accuracy.
    AccuracyDriven,
    /// Bounded random perturbation, used when no accuracy is available.
    RandomWalk,
}

impl fmt::Display for AdaptationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptationMode::AccuracyDriven => write!(f, "accuracy_driven"),
            AdaptationMode::RandomWalk => write!(f, "random_walk"),
        }
    }
}

/// A published weight vector, kept for weight-history display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSnapshot {
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub weights: WeightVector,
    /// `None` for the initial vector.
    pub mode: Option<AdaptationMode>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdaptError {
    #[error("Weight collapse: weights summed to {sum}")]
    WeightCollapse { sum: f64 },

    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

/// Owns the live weight vector and evolves it one tick at a time.
///
/// Readers take a copy under a read lock; `adapt` computes the replacement
/// off to the side and swaps it in under the write lock, so a reader sees
/// either the old vector or the new one. Ticks are serialized by `state`.
pub struct WeightAdapter {
    config: AdaptationConfig,
    current: RwLock<WeightVector>,
    state: Mutex<AdapterState>,
}

struct AdapterState {
    rng: StdRng,
    tick: u64,
    history: VecDeque<WeightSnapshot>,
}

impl WeightAdapter {
    pub fn new(config: AdaptationConfig, initial: WeightVector, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut history = VecDeque::with_capacity(config.history_len.max(1));
        history.push_back(WeightSnapshot {
            tick: 0,
            at: Utc::now(),
            weights: initial,
            mode: None,
        });

        info!("Weight adapter initialized: {}", initial);

        Self {
            config,
            current: RwLock::new(initial),
            state: Mutex::new(AdapterState { rng, tick: 0, history }),
        }
    }

    /// Current weights (a copy; never a partially updated vector)
    pub fn weights(&self) -> WeightVector {
        *self.current.read()
    }

    /// Published snapshots, oldest first
    pub fn history(&self) -> Vec<WeightSnapshot> {
        self.state.lock().history.iter().cloned().collect()
    }

    /// Number of ticks that published new weights
    pub fn ticks(&self) -> u64 {
        self.state.lock().tick
    }

    /// Run one adaptation tick.
    ///
    /// With feedback the step is accuracy-driven. Without it the step is a
    /// random walk, or a no-op returning the current weights when the
    /// random-walk fallback is disabled. On error the previous weights stay
    /// published.
    pub fn adapt(&self, feedback: Option<&PerformanceRecord>) -> Result<WeightVector, AdaptError> {
        let mut state = self.state.lock();
        let current = self.weights();

        let (mode, deltas) = match feedback {
            Some(record) => {
                record.validate()?;
                (
                    AdaptationMode::AccuracyDriven,
                    accuracy_deltas(record, self.config.learning_rate),
                )
            }
            None if self.config.random_walk_fallback => (
                AdaptationMode::RandomWalk,
                random_deltas(&mut state.rng, self.config.adjustment_factor),
            ),
            None => {
                debug!("No feedback and random walk disabled, keeping weights");
                return Ok(current);
            }
        };

        let next = match next_weights(current, deltas, self.config.min_weight, self.config.max_weight) {
            Ok(next) => next,
            Err(e) => {
                error!("🔴 Adaptation tick failed, keeping {}: {}", current, e);
                return Err(e);
            }
        };

        *self.current.write() = next;

        state.tick += 1;
        let snapshot = WeightSnapshot {
            tick: state.tick,
            at: Utc::now(),
            weights: next,
            mode: Some(mode),
        };
        state.history.push_back(snapshot);
        while state.history.len() > self.config.history_len.max(1) {
            state.history.pop_front();
        }

        info!(tick = state.tick, %mode, "Published weights: {}", next);
        Ok(next)
    }
}

/// Per-signal step proportional to how far each accuracy sits from the mean.
pub fn accuracy_deltas(record: &PerformanceRecord, learning_rate: f64) -> [f64; 3] {
    let mean = record.mean();
    record.as_array().map(|accuracy| learning_rate * (accuracy - mean))
}

/// Uniform perturbation in `[-factor / 2, factor / 2)` per signal.
pub fn random_deltas<R: Rng>(rng: &mut R, factor: f64) -> [f64; 3] {
    [(); 3].map(|_| (rng.gen::<f64>() - 0.5) * factor)
}

/// Apply zero-mean deltas to `current`, then clamp and renormalize.
pub fn next_weights(
    current: WeightVector,
    deltas: [f64; 3],
    min: f64,
    max: f64,
) -> Result<WeightVector, AdaptError> {
    let drift = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let weights = current.as_array();
    let raw = [0, 1, 2].map(|i| weights[i] + deltas[i] - drift);
    project_onto_bounds(raw, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptation::weights::SUM_TOLERANCE;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn adapter(seed: u64) -> WeightAdapter {
        WeightAdapter::new(AdaptationConfig::default(), WeightVector::default(), Some(seed))
    }

    fn assert_invariant(w: &WeightVector) {
        assert!((w.sum() - 1.0).abs() <= SUM_TOLERANCE, "sum {}", w.sum());
        assert!(w.within(0.1, 0.6), "out of bounds: {}", w);
    }

    #[test]
    fn test_random_walk_keeps_invariant() {
        let adapter = adapter(42);
        for _ in 0..5_000 {
            let w = adapter.adapt(None).unwrap();
            assert_invariant(&w);
        }
        assert_eq!(adapter.ticks(), 5_000);
    }

    #[test]
    fn test_random_walk_steps_are_small() {
        let adapter = adapter(1);
        let before = adapter.weights();
        let after = adapter.adapt(None).unwrap();
        for (a, b) in before.as_array().iter().zip(after.as_array()) {
            assert!((a - b).abs() <= 0.01);
        }
    }

    #[test]
    fn test_same_seed_same_walk() {
        let a = adapter(7);
        let b = adapter(7);
        for _ in 0..50 {
            assert_eq!(a.adapt(None).unwrap(), b.adapt(None).unwrap());
        }
    }

    #[test]
    fn test_accuracy_driven_converges_to_upper_bound() {
        let adapter = adapter(3);
        let record = PerformanceRecord::new(0.9, 0.5, 0.5).unwrap();

        let mut batch_means = Vec::new();
        let mut batch = Vec::new();
        for _ in 0..1_000 {
            let w = adapter.adapt(Some(&record)).unwrap();
            assert_invariant(&w);
            batch.push(w.mean_reversion);
            if batch.len() == 100 {
                batch_means.push(batch.iter().sum::<f64>() / batch.len() as f64);
                batch.clear();
            }
        }

        for pair in batch_means.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "weight fell: {:?}", batch_means);
        }
        assert!(batch_means[0] > WeightVector::default().mean_reversion);
        assert!((adapter.weights().mean_reversion - 0.6).abs() < 1e-9);
        let rest = adapter.weights().momentum + adapter.weights().sentiment_momentum;
        assert!((rest - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_first_step_is_strict_increase() {
        let adapter = adapter(3);
        let record = PerformanceRecord::new(0.9, 0.5, 0.5).unwrap();
        let before = adapter.weights().mean_reversion;
        let after = adapter.adapt(Some(&record)).unwrap().mean_reversion;
        assert!(after > before);
    }

    #[test]
    fn test_equal_accuracy_is_stationary() {
        let adapter = adapter(3);
        let record = PerformanceRecord::new(0.7, 0.7, 0.7).unwrap();
        let before = adapter.weights();
        let after = adapter.adapt(Some(&record)).unwrap();
        for (a, b) in before.as_array().iter().zip(after.as_array()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_feedback_keeps_weights() {
        let adapter = adapter(3);
        let before = adapter.weights();
        let bad = PerformanceRecord {
            mean_reversion: 1.5,
            momentum: 0.5,
            sentiment_momentum: 0.5,
        };
        assert!(matches!(adapter.adapt(Some(&bad)), Err(AdaptError::InvalidFeedback(_))));
        assert_eq!(adapter.weights(), before);
        assert_eq!(adapter.ticks(), 0);
    }

    #[test]
    fn test_no_fallback_is_noop() {
        let config = AdaptationConfig {
            random_walk_fallback: false,
            ..AdaptationConfig::default()
        };
        let adapter = WeightAdapter::new(config, WeightVector::default(), Some(1));
        assert_eq!(adapter.adapt(None).unwrap(), WeightVector::default());
        assert_eq!(adapter.ticks(), 0);
    }

    #[test]
    fn test_next_weights_removes_drift() {
        let w = next_weights(WeightVector::equal(), [0.03, 0.03, 0.03], 0.1, 0.6).unwrap();
        for value in w.as_array() {
            assert!((value - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_next_weights_collapse() {
        let current = WeightVector::from_array([f64::NAN, 0.5, 0.5]);
        let err = next_weights(current, [0.0; 3], 0.1, 0.6).unwrap_err();
        assert!(matches!(err, AdaptError::WeightCollapse { .. }));
    }

    #[test]
    fn test_collapse_keeps_published_weights() {
        let broken = WeightVector::from_array([f64::NAN, 0.5, 0.5]);
        let adapter = WeightAdapter::new(AdaptationConfig::default(), broken, Some(4));

        let err = adapter.adapt(None).unwrap_err();
        assert!(matches!(err, AdaptError::WeightCollapse { .. }));

        let record = PerformanceRecord::new(0.9, 0.5, 0.5).unwrap();
        assert!(matches!(
            adapter.adapt(Some(&record)),
            Err(AdaptError::WeightCollapse { .. })
        ));

        let published = adapter.weights().as_array();
        assert!(published[0].is_nan());
        assert_eq!(&published[1..], &[0.5, 0.5]);
        assert_eq!(adapter.ticks(), 0);
        assert_eq!(adapter.history().len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = AdaptationConfig {
            history_len: 5,
            ..AdaptationConfig::default()
        };
        let adapter = WeightAdapter::new(config, WeightVector::default(), Some(1));
        assert_eq!(adapter.history().len(), 1);
        assert_eq!(adapter.history()[0].mode, None);

        for _ in 0..20 {
            adapter.adapt(None).unwrap();
        }
        let history = adapter.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history.last().unwrap().tick, 20);
        assert_eq!(history.last().unwrap().weights, adapter.weights());
        assert_eq!(history.last().unwrap().mode, Some(AdaptationMode::RandomWalk));
    }

    #[test]
    fn test_concurrent_readers_never_see_broken_vector() {
        let adapter = Arc::new(adapter(11));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let adapter = Arc::clone(&adapter);
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        assert_invariant(&adapter.weights());
                    }
                });
            }
            let writer = Arc::clone(&adapter);
            scope.spawn(move || {
                let record = PerformanceRecord::new(0.2, 0.6, 0.8).unwrap();
                for i in 0..2_000 {
                    if i % 2 == 0 {
                        writer.adapt(None).unwrap();
                    } else {
                        writer.adapt(Some(&record)).unwrap();
                    }
                }
            });
        });

        assert_eq!(adapter.ticks(), 2_000);
    }

    proptest! {
        #[test]
        fn any_tick_sequence_keeps_invariant(
            seed in any::<u64>(),
            steps in prop::collection::vec(
                prop::option::of((0.0..=1.0_f64, 0.0..=1.0_f64, 0.0..=1.0_f64)),
                1..200,
            ),
        ) {
            let adapter = WeightAdapter::new(
                AdaptationConfig { adjustment_factor: 0.2, learning_rate: 0.5, ..AdaptationConfig::default() },
                WeightVector::default(),
                Some(seed),
            );
            for step in steps {
                let record = step.map(|(a, b, c)| PerformanceRecord::new(a, b, c).unwrap());
                let w = adapter.adapt(record.as_ref()).unwrap();
                prop_assert!((w.sum() - 1.0).abs() <= SUM_TOLERANCE);
                prop_assert!(w.within(0.1, 0.6));
            }
        }
    }
}
