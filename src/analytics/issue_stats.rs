//! Per-tenant issue counts, breakdowns, and trend direction over a trailing
//! window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entity::{Category, Severity};
use crate::error::EngineError;
use crate::store::Store;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total_issues: u64,
    pub open_issues: u64,
    pub resolved_issues: u64,
    pub by_category: HashMap<Category, u64>,
    pub by_severity: HashMap<Severity, u64>,
    pub trend: Trend,
}

/// Trend of the current window count against the immediately preceding
/// window of equal length: more than 10% above is increasing, more than
/// 10% below is decreasing.
pub fn compute_trend(current: u64, previous: u64) -> Trend {
    let current = current as f64;
    let previous = previous as f64;
    if current > previous * 1.1 {
        Trend::Increasing
    } else if current < previous * 0.9 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Issue statistics for a tenant over the trailing `window_days`. Counts
/// and breakdowns cover issues created in the window; the open/resolved
/// split uses current status.
pub async fn issue_stats(
    store: &dyn Store,
    tenant_id: i64,
    window_days: i64,
    now: DateTime<Utc>,
) -> Result<IssueStats, EngineError> {
    store.tenant(tenant_id).await?;
    let issues = store.list_issues(tenant_id).await?;

    let window_start = now - Duration::days(window_days);
    let previous_start = window_start - Duration::days(window_days);

    let current: Vec<_> = issues
        .iter()
        .filter(|issue| issue.created_at >= window_start && issue.created_at <= now)
        .collect();
    let previous_count = issues
        .iter()
        .filter(|issue| issue.created_at >= previous_start && issue.created_at < window_start)
        .count() as u64;

    let mut by_category: HashMap<Category, u64> = HashMap::new();
    let mut by_severity: HashMap<Severity, u64> = HashMap::new();
    let mut open_issues = 0;
    for issue in &current {
        *by_category.entry(issue.category).or_default() += 1;
        *by_severity.entry(issue.severity).or_default() += 1;
        if issue.is_open() {
            open_issues += 1;
        }
    }

    let total_issues = current.len() as u64;
    Ok(IssueStats {
        total_issues,
        open_issues,
        resolved_issues: total_issues - open_issues,
        by_category,
        by_severity,
        trend: compute_trend(total_issues, previous_count),
    })
}
