//! Multi-signal decision engine.
//!
//! Three independent signals (mean reversion, momentum, sentiment momentum)
//! each turn a data window into a (direction, confidence) pair. The
//! aggregator fuses them under a weight vector into a buy/hold/sell
//! decision, and the weight adapter shifts trust between signals over time
//! from accuracy feedback.

pub mod adaptation;
pub mod config;
pub mod data;
pub mod engine;
pub mod monitoring;
pub mod strategies;

pub use adaptation::adapter::{AdaptError, AdaptationMode, WeightAdapter, WeightSnapshot};
pub use adaptation::feedback::{AccuracyTracker, PerformanceRecord};
pub use adaptation::weights::WeightVector;
pub use config::Config;
pub use engine::{EngineError, Evaluation, SignalEngine};
pub use strategies::types::{Action, Decision, SignalKind, SignalOutput};
