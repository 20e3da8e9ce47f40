//! Service-level compliance: per-category/severity resolution deadlines and
//! the batch pass that materializes one metric per resolved issue.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::entity::{Category, Issue, IssueStatus, Severity, SlaMetric};
use crate::error::EngineError;
use crate::store::Store;

const CRITICAL_THRESHOLD_HOURS: f64 = 24.0;
const DEFAULT_THRESHOLD_HOURS: f64 = 72.0;

/// Resolution-deadline policy. The override table is consulted first, so
/// individual (category, severity) pairs can be tightened or relaxed
/// without touching the defaults.
#[derive(Clone, Debug, Default)]
pub struct SlaPolicy {
    overrides: HashMap<(Category, Severity), f64>,
}

impl SlaPolicy {
    pub fn new() -> Self {
        SlaPolicy::default()
    }

    pub fn with_override(mut self, category: Category, severity: Severity, hours: f64) -> Self {
        self.overrides.insert((category, severity), hours);
        self
    }

    pub fn threshold_hours(&self, category: Category, severity: Severity) -> f64 {
        if let Some(hours) = self.overrides.get(&(category, severity)) {
            return *hours;
        }
        if severity == Severity::Critical {
            CRITICAL_THRESHOLD_HOURS
        } else {
            DEFAULT_THRESHOLD_HOURS
        }
    }

    /// Pure computation for one resolved issue. Fails closed on an issue
    /// that is not resolved or carries an impossible resolution time.
    pub fn compute(&self, issue: &Issue, now: DateTime<Utc>) -> Result<SlaMetric, EngineError> {
        if issue.status != IssueStatus::Resolved {
            return Err(EngineError::validation(format!(
                "issue {} is not resolved",
                issue.id
            )));
        }
        let resolved_at = issue.resolved_at.ok_or_else(|| {
            EngineError::validation(format!("resolved issue {} has no resolution time", issue.id))
        })?;
        if resolved_at < issue.created_at {
            return Err(EngineError::validation(format!(
                "issue {} resolved before it was created",
                issue.id
            )));
        }

        let resolution_time_hours =
            (resolved_at - issue.created_at).num_milliseconds() as f64 / 3_600_000.0;
        let met_sla = resolution_time_hours <= self.threshold_hours(issue.category, issue.severity);

        Ok(SlaMetric {
            issue_id: issue.id,
            resolution_time_hours,
            met_sla,
            calculated_at: now,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlaPassReport {
    pub computed: usize,
    pub skipped: usize,
}

/// Batch entry point: computes metrics for every resolved issue, upserting
/// by issue id so recomputation overwrites rather than duplicates. Invoked
/// by the external scheduler.
pub async fn run_sla_pass(
    store: &dyn Store,
    policy: &SlaPolicy,
    now: DateTime<Utc>,
) -> Result<SlaPassReport, EngineError> {
    let mut report = SlaPassReport::default();
    for issue in store.list_resolved_issues().await? {
        match policy.compute(&issue, now) {
            Ok(metric) => {
                store.upsert_sla_metric(metric).await?;
                report.computed += 1;
            }
            Err(err) => {
                warn!(issue_id = issue.id, error = %err, "skipping SLA computation");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}
