use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;

use crate::adaptation::adapter::WeightSnapshot;
use crate::engine::Evaluation;
use crate::strategies::types::Action;

const HEADER: &str = "timestamp,kind,symbol,action,confidence,normalized_prediction,w_mean_reversion,w_momentum,w_sentiment_momentum,detail";

/// Append-only CSV record of decisions and published weights.
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)
                .with_context(|| format!("Failed to create CSV log: {}", log_path))?;

            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    /// Log an evaluated decision
    pub fn log_decision(&self, symbol: &str, evaluation: &Evaluation) -> Result<()> {
        let prediction = match evaluation.normalized_prediction {
            Some(p) => format!("{:.6}", p),
            None => "".to_string(),
        };
        let w = &evaluation.weights;

        self.append(format_args!(
            "{},DECISION,{},{},{:.4},{},{:.6},{:.6},{:.6},",
            Utc::now().to_rfc3339(),
            symbol,
            evaluation.decision.action,
            evaluation.decision.confidence,
            prediction,
            w.mean_reversion,
            w.momentum,
            w.sentiment_momentum,
        ))
    }

    /// Log a published weight vector
    pub fn log_weights(&self, snapshot: &WeightSnapshot) -> Result<()> {
        let mode = match snapshot.mode {
            Some(mode) => mode.to_string(),
            None => "initial".to_string(),
        };
        let w = &snapshot.weights;

        self.append(format_args!(
            "{},WEIGHTS,,,,,{:.6},{:.6},{:.6},tick={} mode={}",
            snapshot.at.to_rfc3339(),
            w.mean_reversion,
            w.momentum,
            w.sentiment_momentum,
            snapshot.tick,
            mode,
        ))
    }

    /// Log a decision's score once the next price is known
    pub fn log_score(&self, symbol: &str, action: Action, score: f64, before: f64, after: f64) -> Result<()> {
        self.append(format_args!(
            "{},SCORE,{},{},,,,,,score={:.6} before={:.4} after={:.4}",
            Utc::now().to_rfc3339(),
            symbol,
            action,
            score,
            before,
            after,
        ))
    }

    /// Log a free-form event
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.append(format_args!(
            "{},EVENT,,,,,,,,{}",
            Utc::now().to_rfc3339(),
            event.replace(',', ";")
        ))
    }

    fn append(&self, line: std::fmt::Arguments<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open CSV log: {}", self.log_path))?;

        writeln!(file, "{}", line)?;
        Ok(())
    }
}
