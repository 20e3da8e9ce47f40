//! SLA aggregates and the performance score.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::EngineError;
use crate::store::Store;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaSummary {
    pub compliance_rate: f64,
    pub average_resolution_hours: f64,
    pub total_resolved: u64,
    pub met_sla: u64,
    pub missed_sla: u64,
}

/// Aggregate SLA metrics for a tenant (optionally one area) over the
/// trailing window. An empty window yields all-zero aggregates.
pub async fn sla_summary(
    store: &dyn Store,
    tenant_id: i64,
    area_id: Option<i64>,
    window_days: i64,
    now: DateTime<Utc>,
) -> Result<SlaSummary, EngineError> {
    store.tenant(tenant_id).await?;
    let since = now - Duration::days(window_days);
    let metrics = store.list_sla_metrics(tenant_id, area_id, since).await?;

    if metrics.is_empty() {
        return Ok(SlaSummary::default());
    }

    let total = metrics.len() as u64;
    let met = metrics.iter().filter(|metric| metric.met_sla).count() as u64;
    let hours_sum: f64 = metrics.iter().map(|metric| metric.resolution_time_hours).sum();

    Ok(SlaSummary {
        compliance_rate: met as f64 / total as f64,
        average_resolution_hours: hours_sum / total as f64,
        total_resolved: total,
        met_sla: met,
        missed_sla: total - met,
    })
}

/// Fixed scoring policy: compliance is weighted roughly 2.3x resolution
/// speed. Rounded to two decimal places.
pub fn performance_score(compliance_rate: f64, average_resolution_hours: f64) -> f64 {
    let speed_component = 100.0_f64.min(100.0 - average_resolution_hours);
    let score = compliance_rate * 70.0 + speed_component * 0.3;
    (score * 100.0).round() / 100.0
}
