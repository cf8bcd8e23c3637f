//! Background renewal service.
//!
//! Runs a renewal pass every check interval, and on demand when triggered.
//! The background loop and on-demand passes share one pass lock. A pass that
//! arrives while another is running waits for it, then loads items after the
//! earlier pass has saved its results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tracing::{error, info, warn};

use super::policy::RenewalPolicy;
use super::scheduler::{ProgressSinks, RenewalError, RenewalPassReport, RenewalScheduler};

/// Summary of the most recent pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalPassSummary {
    pub triggered_by: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when the pass could not run at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Current status of the renewal service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenewalServiceStatus {
    /// Whether the background loop is running.
    pub running: bool,
    /// Whether a pass is executing right now.
    pub pass_in_progress: bool,
    pub check_interval_secs: u64,
    pub policy: Option<RenewalPolicy>,
    pub last_pass: Option<RenewalPassSummary>,
}

/// State shared by every pass, whichever task runs it.
#[derive(Default)]
struct PassState {
    /// Held for the whole pass.
    lock: Mutex<()>,
    in_progress: AtomicBool,
    last_pass: RwLock<Option<RenewalPassSummary>>,
}

pub struct RenewalService {
    scheduler: Arc<RenewalScheduler>,
    policy: RenewalPolicy,
    check_interval: Duration,

    // Runtime state
    running: Arc<AtomicBool>,
    passes: Arc<PassState>,
    trigger: Arc<Notify>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RenewalService {
    pub fn new(scheduler: Arc<RenewalScheduler>, policy: RenewalPolicy, check_interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            scheduler,
            policy,
            check_interval,
            running: Arc::new(AtomicBool::new(false)),
            passes: Arc::new(PassState::default()),
            trigger: Arc::new(Notify::new()),
            shutdown_tx,
        }
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Start the background loop.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Renewal service already running");
            return;
        }

        info!(
            "Starting renewal service (every {}s)",
            self.check_interval.as_secs()
        );
        self.spawn_loop();
    }

    /// Stop the background loop. A pass already executing runs to completion.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Renewal service not running");
            return;
        }

        info!("Stopping renewal service");
        let _ = self.shutdown_tx.send(());
    }

    /// Ask the background loop to run a pass now.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub async fn status(&self) -> RenewalServiceStatus {
        RenewalServiceStatus {
            running: self.running.load(Ordering::Relaxed),
            pass_in_progress: self.passes.in_progress.load(Ordering::Relaxed),
            check_interval_secs: self.check_interval.as_secs(),
            policy: Some(self.policy),
            last_pass: self.passes.last_pass.read().await.clone(),
        }
    }

    /// Run one pass on the caller's task and record it as the last pass.
    ///
    /// Waits for any pass already running, including one started by the loop.
    pub async fn run_now(
        &self,
        policy: &RenewalPolicy,
        sinks: &ProgressSinks,
        triggered_by: &str,
    ) -> Result<RenewalPassReport, RenewalError> {
        Self::run_pass(&self.scheduler, &self.passes, policy, sinks, triggered_by).await
    }

    fn spawn_loop(&self) {
        let running = Arc::clone(&self.running);
        let passes = Arc::clone(&self.passes);
        let scheduler = Arc::clone(&self.scheduler);
        let trigger = Arc::clone(&self.trigger);
        let policy = self.policy;
        let check_interval = self.check_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Renewal loop started");
            let sinks = ProgressSinks::new();
            loop {
                let triggered_by = tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Renewal loop received shutdown signal");
                        break;
                    }
                    _ = trigger.notified() => "trigger",
                    _ = tokio::time::sleep(check_interval) => "schedule",
                };

                if !running.load(Ordering::Relaxed) {
                    break;
                }

                if let Err(e) =
                    Self::run_pass(&scheduler, &passes, &policy, &sinks, triggered_by).await
                {
                    error!("Renewal pass failed: {}", e);
                }
            }
            info!("Renewal loop stopped");
        });
    }

    async fn run_pass(
        scheduler: &RenewalScheduler,
        passes: &PassState,
        policy: &RenewalPolicy,
        sinks: &ProgressSinks,
        triggered_by: &str,
    ) -> Result<RenewalPassReport, RenewalError> {
        let _pass = passes.lock.lock().await;

        passes.in_progress.store(true, Ordering::SeqCst);
        let started_at = Utc::now();
        let outcome = scheduler.renew_all(policy, sinks, triggered_by).await;
        passes.in_progress.store(false, Ordering::SeqCst);

        let summary = match &outcome {
            Ok(report) => RenewalPassSummary {
                triggered_by: triggered_by.to_string(),
                started_at,
                finished_at: Utc::now(),
                processed: report.results.len(),
                succeeded: report.succeeded(),
                failed: report.failed(),
                skipped: report.skipped.len(),
                error: None,
            },
            Err(e) => RenewalPassSummary {
                triggered_by: triggered_by.to_string(),
                started_at,
                finished_at: Utc::now(),
                processed: 0,
                succeeded: 0,
                failed: 0,
                skipped: 0,
                error: Some(e.to_string()),
            },
        };
        *passes.last_pass.write().await = Some(summary);

        outcome
    }
}

impl Drop for RenewalService {
    fn drop(&mut self) {
        if self.running.load(Ordering::Relaxed) {
            let _ = self.shutdown_tx.send(());
        }
    }
}
