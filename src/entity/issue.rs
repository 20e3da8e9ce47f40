use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of incident categories. Classifier output outside this set is
/// a validation failure, never a new value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Sanitation,
    Safety,
    Noise,
    Maintenance,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Infrastructure,
        Category::Sanitation,
        Category::Safety,
        Category::Noise,
        Category::Maintenance,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "infrastructure",
            Category::Sanitation => "sanitation",
            Category::Safety => "safety",
            Category::Noise => "noise",
            Category::Maintenance => "maintenance",
            Category::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Category::ALL.iter().copied().find(|c| c.as_str() == value)
    }
}

/// Closed set of severities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Severity::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Resolved,
}

/// A deduplicated, tracked incident composed of one or more reports.
///
/// Category and severity are fixed at creation; later reports matched to
/// the issue never overwrite them. `resolved_at` is set iff the status is
/// `Resolved` and is never earlier than `created_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub tenant_id: i64,
    pub area_id: Option<i64>,
    pub category: Category,
    pub severity: Severity,
    /// One-line description used as the candidate text when matching new
    /// reports against this issue.
    pub summary: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn new(
        id: i64,
        tenant_id: i64,
        area_id: Option<i64>,
        category: Category,
        severity: Severity,
        summary: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Issue {
            id,
            tenant_id,
            area_id,
            category,
            severity,
            summary: summary.into(),
            status: IssueStatus::Open,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == IssueStatus::Open
    }

    pub fn resolve(&mut self, resolved_at: DateTime<Utc>) {
        self.status = IssueStatus::Resolved;
        self.resolved_at = Some(resolved_at);
    }
}
