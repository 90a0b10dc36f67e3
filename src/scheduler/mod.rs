// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives time-triggered gateways.
//!
//! Each job belongs to one unit and runs at most one instance at a time: a
//! trigger that fires while the previous run is still executing is skipped,
//! not queued, and any number of ticks missed while the loop was asleep are
//! served by a single catch-up run.

mod trigger;

pub use trigger::CronTrigger;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::discovery::DiscoveredUnit;
use crate::engine::ExecutionEngine;
use crate::errors::GatewayConstructionError;
use crate::gateway::CronJob;
use crate::observability::messages::gateway::GatewaySkipped;
use crate::observability::messages::scheduler::{
    CompletionHookFailed, FetchInputsFailed, ItemFailed, RunCompleted, RunSkippedOverlap,
    RunStarted, SchedulerStarted, SchedulerStopped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::CronGateway;

/// What happened when a job was triggered.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A run was spawned; the handle resolves to its report.
    Started(JoinHandle<RunReport>),
    /// The previous run is still executing.
    SkippedOverlap,
    UnknownJob,
}

/// Outcome of one scheduled run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub fetch_error: Option<String>,
}

struct ScheduledJob {
    unit: Arc<DiscoveredUnit>,
    gateway: Arc<dyn CronGateway>,
    trigger: CronTrigger,
    running: Arc<AtomicBool>,
}

/// Clears a job's running flag when the run ends, including on panic.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScheduledJob {
    fn begin(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(Arc::clone(&self.running)))
    }
}

/// Source of wall-clock time for the timer loops.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Scheduler {
    engine: Arc<ExecutionEngine>,
    jobs: IndexMap<String, Arc<ScheduledJob>>,
    clock: Clock,
    cancel: CancellationToken,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self {
            engine,
            jobs: IndexMap::new(),
            clock: Arc::new(Utc::now),
            cancel: CancellationToken::new(),
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler holding every job of a routing plan whose schedule parses.
    pub fn with_jobs(engine: Arc<ExecutionEngine>, jobs: &[CronJob]) -> Self {
        let mut scheduler = Self::new(engine);
        for job in jobs {
            if let Err(error) = scheduler.add_job(job.clone()) {
                GatewaySkipped {
                    unit: &job.unit.name,
                    gateway: job.gateway.type_name(),
                    error: &error,
                }
                .log();
            }
        }
        scheduler
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Add a job keyed by unit name, replacing any earlier job for that unit.
    pub fn add_job(&mut self, job: CronJob) -> Result<(), GatewayConstructionError> {
        let trigger = CronTrigger::parse(job.gateway.schedule())?;
        self.jobs.insert(
            job.unit.name.clone(),
            Arc::new(ScheduledJob {
                unit: job.unit,
                gateway: job.gateway,
                trigger,
                running: Arc::new(AtomicBool::new(false)),
            }),
        );
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    /// Spawn one timer loop per job. Must be called from within a runtime.
    pub fn start(&self) {
        let mut loops = self.loops.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for job in self.jobs.values() {
            loops.push(tokio::spawn(job_loop(
                Arc::clone(job),
                Arc::clone(&self.engine),
                Arc::clone(&self.clock),
                self.cancel.clone(),
            )));
        }
        tracing::info!("{}", SchedulerStarted { jobs: self.jobs.len() });
    }

    /// Stop the timer loops. Runs already in flight finish on their own.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let loops: Vec<JoinHandle<()>> = self
            .loops
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for handle in loops {
            let _ = handle.await;
        }
        tracing::info!("{}", SchedulerStopped);
    }

    /// Fire a job now, honoring the one-instance rule.
    pub fn trigger(&self, unit: &str) -> TriggerOutcome {
        match self.jobs.get(unit) {
            Some(job) => fire(job, &self.engine),
            None => TriggerOutcome::UnknownJob,
        }
    }
}

fn fire(job: &Arc<ScheduledJob>, engine: &Arc<ExecutionEngine>) -> TriggerOutcome {
    let Some(guard) = job.begin() else {
        RunSkippedOverlap { unit: &job.unit.name }.log();
        return TriggerOutcome::SkippedOverlap;
    };
    let started = RunStarted { unit: &job.unit.name };
    started.log();
    let span = started.span("scheduled_run");

    let job = Arc::clone(job);
    let engine = Arc::clone(engine);
    TriggerOutcome::Started(tokio::spawn(
        async move {
            let _guard = guard;
            run_batch(&engine, &job.unit, job.gateway.as_ref()).await
        }
        .instrument(span),
    ))
}

async fn job_loop(
    job: Arc<ScheduledJob>,
    engine: Arc<ExecutionEngine>,
    clock: Clock,
    cancel: CancellationToken,
) {
    let mut last = clock();
    loop {
        let Some(next) = job.trigger.next_after(last) else {
            break;
        };
        let wait = (next - clock()).to_std().unwrap_or_default();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let now = clock();
        let missed = job.trigger.missed_between(last, now, 1000);
        if missed > 1 {
            tracing::debug!(unit = %job.unit.name, missed, "coalescing missed cron ticks into one run");
        }
        last = now;
        if missed > 0 {
            let _ = fire(&job, &engine);
        }
    }
}

/// Fetch a batch and invoke the unit once per item.
///
/// A fetch failure aborts the run. A failing item is reported to the
/// gateway's error hook and the batch continues.
pub async fn run_batch(
    engine: &ExecutionEngine,
    unit: &DiscoveredUnit,
    gateway: &dyn CronGateway,
) -> RunReport {
    let items = match gateway.fetch_inputs().await {
        Ok(items) => items,
        Err(error) => {
            FetchInputsFailed {
                unit: &unit.name,
                error: &error,
            }
            .log();
            return RunReport {
                fetch_error: Some(error.to_string()),
                ..RunReport::default()
            };
        }
    };

    let mut report = RunReport {
        items: items.len(),
        ..RunReport::default()
    };
    for (index, item) in items.iter().enumerate() {
        match engine
            .invoke(unit, strip_metadata(item), None, Vec::new())
            .await
        {
            Ok(output) => match gateway.on_complete(item, &output).await {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    report.failed += 1;
                    tracing::error!(
                        "{}",
                        CompletionHookFailed {
                            unit: &unit.name,
                            index,
                            error: &error,
                        }
                    );
                }
            },
            Err(error) => {
                report.failed += 1;
                ItemFailed {
                    unit: &unit.name,
                    index,
                    error: &error,
                }
                .log();
                gateway.on_error(item, &error).await;
            }
        }
    }

    RunCompleted {
        unit: &unit.name,
        succeeded: report.succeeded,
        failed: report.failed,
    }
    .log();
    report
}

/// Item keys starting with `_` are gateway metadata, not unit inputs.
pub fn strip_metadata(item: &Map<String, Value>) -> Map<String, Value> {
    item.iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
