use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw citizen submission, pre-deduplication.
///
/// `processed` is true iff `issue_id` is set; a report is linked exactly
/// once and re-processing a linked report is a no-op.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub tenant_id: i64,
    pub description: String,
    pub location: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub processed: bool,
}

impl Report {
    pub fn new(
        id: i64,
        tenant_id: i64,
        description: impl Into<String>,
        location: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Report {
            id,
            issue_id: None,
            tenant_id,
            description: description.into(),
            location,
            submitted_at,
            processed: false,
        }
    }

    pub fn mark_processed(&mut self, issue_id: i64) {
        self.issue_id = Some(issue_id);
        self.processed = true;
    }
}
