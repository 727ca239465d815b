pub mod orchestrator;
pub mod resolver;

use commentguard_core::{
    CycleSummary, ErrorExt, ErrorReporter, ModerationConfig, ModerationError, PageCommentsApi,
    SubstringPolicy,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

pub use orchestrator::{CycleContext, Orchestrator};
pub use resolver::{resolve_pages, select_pages};

/// Re-runs the orchestrator on a fixed period until told to stop.
pub struct BackgroundService {
    orchestrator: Orchestrator,
    polling_interval: Duration,
    reporter: ErrorReporter,
}

impl BackgroundService {
    pub fn new(orchestrator: Orchestrator, polling_interval: Duration) -> Self {
        Self {
            orchestrator,
            polling_interval,
            reporter: ErrorReporter::new(),
        }
    }

    /// Substring policy over the configured denylist, polled once per
    /// lookback window.
    pub fn from_config(api: Arc<dyn PageCommentsApi>, config: ModerationConfig) -> Self {
        let polling_interval = config.cycle_interval();
        let policy = Arc::new(SubstringPolicy::new(config.denylist.clone()));
        let orchestrator = Orchestrator::new(api, policy, Arc::new(config));
        Self::new(orchestrator, polling_interval)
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    pub async fn run_once(&self) -> Result<CycleSummary, ModerationError> {
        let outcome = self.orchestrator.run_cycle().await;
        self.report(&outcome);
        outcome
    }

    /// Runs a cycle on every tick until `shutdown` resolves. A cycle already
    /// in progress finishes first. Returns the number of cycles run.
    pub async fn run_until<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Moderation service started, polling every {:?}",
            self.polling_interval
        );

        let mut cycles = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let _ = self.run_once().await;
                    cycles += 1;
                }
            }
        }

        info!("Moderation service stopped after {} cycles", cycles);
        cycles
    }

    fn report(&self, outcome: &Result<CycleSummary, ModerationError>) {
        match outcome {
            Ok(summary) => {
                for error in &summary.errors {
                    self.reporter.report_warning(error);
                }
                if let Ok(json) = serde_json::to_string(summary) {
                    debug!("Cycle summary: {}", json);
                }
            }
            Err(error) => {
                self.reporter.report_error(error);
                info!("Cycle aborted ({}); next attempt on the next tick", error.error_code());
            }
        }
    }
}
