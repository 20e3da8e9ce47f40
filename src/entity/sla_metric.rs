use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compliance record computed once an issue resolves.
///
/// Derived, never independently mutated: `resolution_time_hours` is always
/// `resolved_at - created_at` of the source issue. Exactly one metric
/// exists per resolved issue; recomputation overwrites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlaMetric {
    pub issue_id: i64,
    pub resolution_time_hours: f64,
    pub met_sla: bool,
    pub calculated_at: DateTime<Utc>,
}
