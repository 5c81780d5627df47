//! Refresh scheduling.
//!
//! Two triggers drive the [`Refresher`]: a fixed-interval background task and
//! on-demand manual refreshes. They may overlap freely since cache merges are
//! idempotent and resolve per key by timestamp.

use crate::error::{Result, WhitelistError};
use crate::refresher::{RefreshReport, Refresher};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, Instrument};

/// Default period of the automatic refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A background job run on a fixed period until cancelled.
///
/// The first run happens immediately. Dropping the handle cancels the job.
#[derive(Debug)]
pub struct RecurringTask {
    name: String,
    handle: JoinHandle<()>,
}

impl RecurringTask {
    /// Spawns `job` on the current tokio runtime, once per `period`.
    ///
    /// A run that overruns the period delays the next tick rather than
    /// bursting to catch up.
    ///
    /// # Errors
    ///
    /// [`WhitelistError::InvalidSettings`] if `period` is zero.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut job: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        if period.is_zero() {
            return Err(WhitelistError::InvalidSettings(format!(
                "{name} needs a non-zero period"
            )));
        }
        let span = info_span!("recurring_task", task = %name);
        let handle = tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    job().await;
                }
            }
            .instrument(span),
        );

        Ok(Self { name, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the job. A run in progress is aborted at its next await point.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives refresh cycles for a fixed set of service identifiers.
#[derive(Clone)]
pub struct RefreshScheduler {
    refresher: Refresher,
    service_ids: Arc<Vec<String>>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(refresher: Refresher, service_ids: Vec<String>, interval: Duration) -> Self {
        Self {
            refresher,
            service_ids: Arc::new(service_ids),
            interval,
        }
    }

    pub fn service_ids(&self) -> &[String] {
        &self.service_ids
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the periodic refresh.
    ///
    /// With no service identifiers configured the task is never armed: the
    /// configuration error is logged here and returned to the caller.
    pub fn start(&self) -> Result<RecurringTask> {
        if self.service_ids.is_empty() {
            let err = WhitelistError::Configuration;
            error!("❌ {}", err);
            return Err(err);
        }

        let name = format!(
            "Twitch Whitelist Refresh - Auto ({})",
            describe_period(self.interval)
        );
        info!(
            "⏰ Scheduling whitelist refresh every {:?} for {} service id(s)",
            self.interval,
            self.service_ids.len()
        );

        let scheduler = self.clone();
        RecurringTask::spawn(name, self.interval, move || {
            let scheduler = scheduler.clone();
            async move {
                scheduler.run_cycle().await;
            }
        })
        .inspect_err(|err| error!("❌ {}", err))
    }

    /// Runs a refresh in its own task on behalf of `requested_by`.
    ///
    /// `on_complete` is invoked with the cycle report once the refresh has
    /// finished, whatever happened to the individual fetches.
    pub fn trigger_manual<F>(&self, requested_by: &str, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(RefreshReport) + Send + 'static,
    {
        let task_name = format!("Twitch Whitelist Refresh - Manual ({requested_by})");
        let span = info_span!("manual_refresh", task = %task_name);
        let scheduler = self.clone();
        tokio::spawn(
            async move {
                info!("🔄 Manual whitelist refresh started");
                let report = scheduler.run_cycle().await;
                on_complete(report);
            }
            .instrument(span),
        )
    }

    /// One refresh followed by an eager purge of expired entries.
    pub async fn run_cycle(&self) -> RefreshReport {
        let report = self
            .refresher
            .refresh(&self.service_ids, Instant::now())
            .await;
        self.refresher.cache().purge_expired(Instant::now());
        info!(
            "✅ Whitelist refreshed: {} distinct username(s) from {} service id(s)",
            report.written, report.identifiers
        );
        report
    }
}

/// Human form of a refresh period for task names, e.g. "5 Mins" or "90 Secs".
fn describe_period(period: Duration) -> String {
    let secs = period.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} Mins", secs / 60)
    } else {
        format!("{secs} Secs")
    }
}
