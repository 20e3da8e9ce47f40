use serde::{Deserialize, Serialize};

/// Ingestion-boundary request: one citizen submission.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReportRequest {
    pub tenant_id: i64,
    pub description: String,
    pub location: Option<String>,
}

/// Ingestion-boundary response. `matched` is true when the report was
/// linked to an already-existing issue rather than creating a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub report_id: i64,
    pub issue_id: i64,
    pub matched: bool,
}
