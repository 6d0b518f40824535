use anyhow::Result;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use meta_signal_engine::config::{Config, EnvConfig};
use meta_signal_engine::data::sample::SampleDataProvider;
use meta_signal_engine::data::DataProvider;
use meta_signal_engine::engine::scheduler::AdaptationScheduler;
use meta_signal_engine::monitoring::logger::CsvLogger;
#[cfg(feature = "metrics")]
use meta_signal_engine::monitoring::metrics::EngineMetrics;
use meta_signal_engine::{AccuracyTracker, EngineError, SignalEngine};

struct Runner {
    engine: Arc<SignalEngine>,
    provider: SampleDataProvider,
    tracker: Arc<Mutex<AccuracyTracker>>,
    logger: Option<CsvLogger>,
    window: usize,
    last_logged_tick: u64,
    #[cfg(feature = "metrics")]
    metrics: Arc<EngineMetrics>,
}

impl Runner {
    fn evaluate_symbol(&self, symbol: &str) -> Result<()> {
        let prices = self.provider.price_window(symbol, self.window)?;
        let sentiment = self.provider.sentiment_window(symbol, self.window)?;
        let before = prices.last().map(|p| p.price);

        let evaluation = match self.engine.evaluate(&prices, &sentiment) {
            Ok(evaluation) => {
                info!(
                    "📊 {}: {} (confidence {:.0}%) with {}",
                    symbol,
                    evaluation.decision.action,
                    evaluation.decision.confidence * 100.0,
                    evaluation.weights
                );

                if let Some(before) = before {
                    self.tracker.lock().record(symbol, before, &evaluation.signals);
                }
                if let Some(logger) = &self.logger {
                    logger.log_decision(symbol, &evaluation)?;
                }
                #[cfg(feature = "metrics")]
                self.metrics.record_decision(&evaluation.decision);
                Some(evaluation)
            }
            Err(EngineError::Signal(e)) => {
                warn!("{}: not enough history yet ({})", symbol, e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        // Next trading day; judge the calls just made
        let next_price = self.provider.advance(symbol)?;
        self.tracker.lock().resolve(symbol, next_price);

        if let (Some(evaluation), Some(before)) = (evaluation, before) {
            let action = evaluation.decision.action;
            let score = evaluation.score_against(before, next_price);
            debug!("{}: {} scored {:.4} ({:.2} -> {:.2})", symbol, action, score, before, next_price);
            if let Some(logger) = &self.logger {
                logger.log_score(symbol, action, score, before, next_price)?;
            }
            #[cfg(feature = "metrics")]
            self.metrics.record_score(action, score);
        }
        Ok(())
    }

    fn log_new_weights(&mut self) -> Result<()> {
        let Some(logger) = &self.logger else {
            return Ok(());
        };
        for snapshot in self.engine.weight_history() {
            if snapshot.tick > self.last_logged_tick {
                logger.log_weights(&snapshot)?;
                self.last_logged_tick = snapshot.tick;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Signal engine starting...");

    // Load configuration
    let env_config = EnvConfig::load()?;
    let mut config = if Path::new(&env_config.config_path).exists() {
        info!("Loading configuration from {}", env_config.config_path);
        Config::load(&env_config.config_path)?
    } else {
        warn!("{} not found, using defaults", env_config.config_path);
        Config::default()
    };
    if env_config.seed.is_some() {
        config.engine.seed = env_config.seed;
    }
    config.validate()?;

    info!("Symbols: {:?}", config.engine.symbols);
    info!("Adaptation period: {}ms", config.adaptation.interval_ms);
    info!("Random-walk fallback: {}", config.adaptation.random_walk_fallback);

    let engine = Arc::new(SignalEngine::new(&config)?);
    let tracker = Arc::new(Mutex::new(AccuracyTracker::new(
        config.feedback.clone(),
        config.signals.stance_threshold,
    )));

    let logger = if config.monitoring.csv_logging {
        info!("CSV logging to {}", config.monitoring.csv_log_path);
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    #[cfg(feature = "metrics")]
    let metrics = Arc::new(EngineMetrics::new()?);

    // Start the adaptation loop
    let scheduler = AdaptationScheduler::new(Arc::clone(&engine), Arc::clone(&tracker), &config.adaptation);
    #[cfg(feature = "metrics")]
    let scheduler = scheduler.with_metrics(Arc::clone(&metrics));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let adapt_task = tokio::spawn(scheduler.run(shutdown_rx));

    let signals = &config.signals;
    let window = signals
        .mean_reversion_window
        .max(signals.momentum_window)
        .max(signals.sentiment_window);

    let mut runner = Runner {
        engine: Arc::clone(&engine),
        provider: SampleDataProvider::new(config.engine.seed.unwrap_or_else(rand::random)),
        tracker,
        logger,
        window,
        last_logged_tick: 0,
        #[cfg(feature = "metrics")]
        metrics: Arc::clone(&metrics),
    };

    info!("✅ Engine initialized, evaluating every {}s", config.engine.evaluate_interval_secs);

    let mut interval = tokio::time::interval(Duration::from_secs(config.engine.evaluate_interval_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for symbol in &config.engine.symbols {
                    if let Err(e) = runner.evaluate_symbol(symbol) {
                        warn!("{}: evaluation round failed: {:#}", symbol, e);
                    }
                }
                if let Err(e) = runner.log_new_weights() {
                    warn!("Failed to log weights: {:#}", e);
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    tracing::info!("Shutting down...");
    shutdown_tx.send(true).ok();
    adapt_task.await?;

    info!("Final weights after {} ticks: {}", engine.ticks(), engine.weights());
    #[cfg(feature = "metrics")]
    info!("Metrics:\n{}", metrics.render()?);

    Ok(())
}
