use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;

use crate::adaptation::weights::WeightVector;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub signals: SignalConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_evaluate_interval")]
    pub evaluate_interval_secs: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            evaluate_interval_secs: default_evaluate_interval(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_window")]
    pub mean_reversion_window: usize,
    #[serde(default = "default_window")]
    pub momentum_window: usize,
    #[serde(default = "default_window")]
    pub sentiment_window: usize,
    #[serde(default = "default_mean_reversion_scale")]
    pub mean_reversion_scale: f64,
    #[serde(default = "default_momentum_scale")]
    pub momentum_scale: f64,
    #[serde(default = "default_sentiment_amplification")]
    pub sentiment_amplification: f64,
    #[serde(default = "default_sentiment_scale")]
    pub sentiment_scale: f64,
    #[serde(default = "default_signal_confidence_cap")]
    pub confidence_cap: f64,
    #[serde(default = "default_stance_threshold")]
    pub stance_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mean_reversion_window: default_window(),
            momentum_window: default_window(),
            sentiment_window: default_window(),
            mean_reversion_scale: default_mean_reversion_scale(),
            momentum_scale: default_momentum_scale(),
            sentiment_amplification: default_sentiment_amplification(),
            sentiment_scale: default_sentiment_scale(),
            confidence_cap: default_signal_confidence_cap(),
            stance_threshold: default_stance_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: f64,
    #[serde(default = "default_decision_scale")]
    pub confidence_scale: f64,
    #[serde(default = "default_decision_confidence_cap")]
    pub confidence_cap: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy_threshold(),
            sell_threshold: default_sell_threshold(),
            confidence_scale: default_decision_scale(),
            confidence_cap: default_decision_confidence_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaptationConfig {
    #[serde(default = "default_initial_weights")]
    pub initial_weights: InitialWeights,
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_true")]
    pub random_walk_fallback: bool,
    #[serde(default = "default_adapt_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_feedback_timeout_ms")]
    pub feedback_timeout_ms: u64,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            initial_weights: default_initial_weights(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            adjustment_factor: default_adjustment_factor(),
            learning_rate: default_learning_rate(),
            random_walk_fallback: true,
            interval_ms: default_adapt_interval_ms(),
            feedback_timeout_ms: default_feedback_timeout_ms(),
            history_len: default_history_len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InitialWeights {
    pub mean_reversion: f64,
    pub momentum: f64,
    pub sentiment_momentum: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_accuracy_window")]
    pub accuracy_window: usize,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_neutral_band")]
    pub neutral_band: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            accuracy_window: default_accuracy_window(),
            min_samples: default_min_samples(),
            neutral_band: default_neutral_band(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_path(),
        }
    }
}

fn default_symbols() -> Vec<String> { vec!["AAPL".to_string(), "MSFT".to_string()] }
fn default_evaluate_interval() -> u64 { 5 }
fn default_window() -> usize { 10 }
fn default_mean_reversion_scale() -> f64 { 5.0 }
fn default_momentum_scale() -> f64 { 3.0 }
fn default_sentiment_amplification() -> f64 { 2.0 }
fn default_sentiment_scale() -> f64 { 2.0 }
fn default_signal_confidence_cap() -> f64 { 0.9 }
fn default_stance_threshold() -> f64 { 0.01 }
fn default_buy_threshold() -> f64 { 0.02 }
fn default_sell_threshold() -> f64 { -0.02 }
fn default_decision_scale() -> f64 { 10.0 }
fn default_decision_confidence_cap() -> f64 { 0.95 }
fn default_initial_weights() -> InitialWeights {
    InitialWeights { mean_reversion: 0.33, momentum: 0.33, sentiment_momentum: 0.34 }
}
fn default_min_weight() -> f64 { 0.1 }
fn default_max_weight() -> f64 { 0.6 }
fn default_adjustment_factor() -> f64 { 0.01 }
fn default_learning_rate() -> f64 { 0.05 }
fn default_true() -> bool { true }
fn default_adapt_interval_ms() -> u64 { 2000 }
fn default_feedback_timeout_ms() -> u64 { 500 }
fn default_history_len() -> usize { 30 }
fn default_accuracy_window() -> usize { 20 }
fn default_min_samples() -> usize { 5 }
fn default_neutral_band() -> f64 { 0.005 }
fn default_csv_path() -> String { "decisions.csv".to_string() }

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub seed: Option<u64>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which the weight invariant or the decision
    /// thresholds cannot hold.
    pub fn validate(&self) -> Result<()> {
        let adapt = &self.adaptation;
        ensure!(
            adapt.min_weight > 0.0 && adapt.min_weight < adapt.max_weight,
            "weight bounds must satisfy 0 < min < max (got {} / {})",
            adapt.min_weight,
            adapt.max_weight
        );
        ensure!(
            3.0 * adapt.min_weight <= 1.0 && 3.0 * adapt.max_weight >= 1.0,
            "weight bounds [{}, {}] cannot hold three weights summing to 1",
            adapt.min_weight,
            adapt.max_weight
        );
        ensure!(adapt.adjustment_factor >= 0.0, "adjustment_factor must be non-negative");
        ensure!(adapt.learning_rate >= 0.0, "learning_rate must be non-negative");
        ensure!(adapt.interval_ms > 0, "adaptation interval must be positive");

        self.initial_weight_vector()
            .context("initial weights violate the weight invariant")?;

        let agg = &self.aggregator;
        ensure!(
            agg.sell_threshold <= agg.buy_threshold,
            "sell_threshold {} is above buy_threshold {}",
            agg.sell_threshold,
            agg.buy_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&agg.confidence_cap),
            "decision confidence cap must be in [0, 1]"
        );

        let signals = &self.signals;
        ensure!(
            signals.mean_reversion_window >= 2 && signals.momentum_window >= 2,
            "price signal windows need at least 2 points"
        );
        ensure!(signals.sentiment_window >= 1, "sentiment window needs at least 1 point");
        ensure!(
            (0.0..=1.0).contains(&signals.confidence_cap),
            "signal confidence cap must be in [0, 1]"
        );

        let feedback = &self.feedback;
        ensure!(feedback.accuracy_window > 0, "accuracy_window must be positive");
        ensure!(
            feedback.min_samples <= feedback.accuracy_window,
            "min_samples {} exceeds accuracy_window {}; accuracy feedback could never be produced",
            feedback.min_samples,
            feedback.accuracy_window
        );
        ensure!(self.engine.evaluate_interval_secs > 0, "evaluate_interval_secs must be positive");

        Ok(())
    }

    pub fn initial_weight_vector(&self) -> Result<WeightVector> {
        let init = self.adaptation.initial_weights;
        let weights = WeightVector::new(init.mean_reversion, init.momentum, init.sentiment_momentum)?;
        ensure!(
            weights.within(self.adaptation.min_weight, self.adaptation.max_weight),
            "initial weights {} outside [{}, {}]",
            weights,
            self.adaptation.min_weight,
            self.adaptation.max_weight
        );
        Ok(weights)
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let seed = match std::env::var("ENGINE_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .with_context(|| format!("ENGINE_SEED is not an integer: {}", raw))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            config_path: std::env::var("ENGINE_CONFIG")
                .unwrap_or_else(|_| "config.toml".to_string()),
            seed,
        })
    }
}
