//! Batch entry points invoked by the external scheduler: the dedup sweep,
//! the SLA pass, and the score pass. No internal timers; cadence is the
//! scheduler collaborator's concern. One active run per job at a time — a
//! trigger while a run is in flight is skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analytics::{performance_score, sla_summary};
use crate::configuration::JobSettings;
use crate::entity::MetricType;
use crate::error::EngineError;
use crate::sla::{SlaPassReport, SlaPolicy, run_sla_pass};
use crate::store::{NewScore, Store};
use crate::triage::TriagePipeline;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    /// Another run of the same job was already in flight.
    Skipped,
}

impl<T> JobOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, JobOutcome::Skipped)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScorePassReport {
    pub entries: usize,
}

/// Try-acquire guard for the single-active-run rule; releases on drop.
struct ActiveRun<'a>(&'a AtomicBool);

impl<'a> ActiveRun<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ActiveRun(flag))
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct JobRunner {
    store: Arc<dyn Store>,
    pipeline: Arc<TriagePipeline>,
    sla_policy: SlaPolicy,
    settings: JobSettings,
    sweep_running: AtomicBool,
    sla_running: AtomicBool,
    score_running: AtomicBool,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn Store>,
        pipeline: Arc<TriagePipeline>,
        sla_policy: SlaPolicy,
        settings: JobSettings,
    ) -> Self {
        JobRunner {
            store,
            pipeline,
            sla_policy,
            settings,
            sweep_running: AtomicBool::new(false),
            sla_running: AtomicBool::new(false),
            score_running: AtomicBool::new(false),
        }
    }

    /// Drain a batch of unprocessed reports through the triage pipeline on
    /// a bounded worker pool. Per-report failures are logged and counted,
    /// never abort the sweep.
    #[instrument(skip(self), fields(job_run_id = %Uuid::new_v4()))]
    pub async fn run_dedup_sweep(
        &self,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome<SweepReport>, EngineError> {
        let Some(_active) = ActiveRun::try_acquire(&self.sweep_running) else {
            info!("dedup sweep already in flight, skipping");
            return Ok(JobOutcome::Skipped);
        };

        let reports = self
            .store
            .list_unprocessed_reports(self.settings.sweep_batch)
            .await?;
        let results: Vec<(i64, Result<_, EngineError>)> = stream::iter(reports)
            .map(|report| {
                let pipeline = Arc::clone(&self.pipeline);
                async move { (report.id, pipeline.process(report.id, now, None).await) }
            })
            .buffer_unordered(self.settings.worker_concurrency)
            .collect()
            .await;

        let mut report = SweepReport::default();
        for (report_id, result) in results {
            match result {
                Ok(_) => report.processed += 1,
                Err(err) => {
                    warn!(report_id, error = %err, "report failed during dedup sweep");
                    report.failed += 1;
                }
            }
        }
        info!(processed = report.processed, failed = report.failed, "dedup sweep finished");
        Ok(JobOutcome::Completed(report))
    }

    #[instrument(skip(self), fields(job_run_id = %Uuid::new_v4()))]
    pub async fn run_sla_pass(
        &self,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome<SlaPassReport>, EngineError> {
        let Some(_active) = ActiveRun::try_acquire(&self.sla_running) else {
            info!("SLA pass already in flight, skipping");
            return Ok(JobOutcome::Skipped);
        };

        let report = run_sla_pass(self.store.as_ref(), &self.sla_policy, now).await?;
        info!(computed = report.computed, skipped = report.skipped, "SLA pass finished");
        Ok(JobOutcome::Completed(report))
    }

    /// Compute and append a fresh score entry per tenant, plus one per area
    /// that resolved anything in the window. Entries are append-only; the
    /// overlap guard is what prevents duplicates from double triggers.
    #[instrument(skip(self), fields(job_run_id = %Uuid::new_v4()))]
    pub async fn run_score_pass(
        &self,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome<ScorePassReport>, EngineError> {
        let Some(_active) = ActiveRun::try_acquire(&self.score_running) else {
            info!("score pass already in flight, skipping");
            return Ok(JobOutcome::Skipped);
        };

        let window = self.settings.score_window_days;
        let mut report = ScorePassReport::default();
        for tenant in self.store.list_tenants().await? {
            let summary = sla_summary(self.store.as_ref(), tenant.id, None, window, now).await?;
            let score =
                performance_score(summary.compliance_rate, summary.average_resolution_hours);
            self.store
                .append_score(NewScore {
                    tenant_id: tenant.id,
                    area_id: None,
                    score,
                    metric_type: MetricType::Overall,
                    calculated_at: now,
                })
                .await?;
            report.entries += 1;

            for area in self.store.list_areas(tenant.id).await? {
                let summary =
                    sla_summary(self.store.as_ref(), tenant.id, Some(area.id), window, now).await?;
                if summary.total_resolved == 0 {
                    continue;
                }
                let score =
                    performance_score(summary.compliance_rate, summary.average_resolution_hours);
                self.store
                    .append_score(NewScore {
                        tenant_id: tenant.id,
                        area_id: Some(area.id),
                        score,
                        metric_type: MetricType::Overall,
                        calculated_at: now,
                    })
                    .await?;
                report.entries += 1;
            }
        }
        info!(entries = report.entries, "score pass finished");
        Ok(JobOutcome::Completed(report))
    }
}
