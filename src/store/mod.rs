//! Persistence collaborator contract. The engine needs create, get-by-id,
//! list-by-tenant, and a conflict-detectable create for issues; everything
//! else about storage is the collaborator's concern.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::{
    Area, Category, Issue, MetricType, Report, ScoreEntry, Severity, SlaMetric, Tenant, TenantKind,
};
use crate::error::EngineError;

pub use memory::InMemoryStore;

#[derive(Clone, Debug)]
pub struct NewIssue {
    pub tenant_id: i64,
    pub area_id: Option<i64>,
    pub category: Category,
    pub severity: Severity,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewReport {
    pub tenant_id: i64,
    pub description: String,
    pub location: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewScore {
    pub tenant_id: i64,
    pub area_id: Option<i64>,
    pub score: f64,
    pub metric_type: MetricType,
    pub calculated_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_tenant(
        &self,
        name: &str,
        kind: TenantKind,
        created_at: DateTime<Utc>,
    ) -> Result<Tenant, EngineError>;
    async fn tenant(&self, tenant_id: i64) -> Result<Tenant, EngineError>;
    async fn list_tenants(&self) -> Result<Vec<Tenant>, EngineError>;

    async fn create_area(
        &self,
        tenant_id: i64,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Area, EngineError>;
    async fn list_areas(&self, tenant_id: i64) -> Result<Vec<Area>, EngineError>;

    /// Conflict-detectable create: implementations backed by a uniqueness
    /// constraint may return `Conflict` when a concurrent worker created an
    /// equivalent issue first; the pipeline compensates by re-matching.
    async fn create_issue(&self, new: NewIssue) -> Result<Issue, EngineError>;
    async fn issue(&self, issue_id: i64) -> Result<Issue, EngineError>;
    /// Open issues for a tenant, most recent first, optionally filtered by
    /// category, truncated to `limit`.
    async fn list_open_issues(
        &self,
        tenant_id: i64,
        category: Option<Category>,
        limit: usize,
    ) -> Result<Vec<Issue>, EngineError>;
    async fn list_issues(&self, tenant_id: i64) -> Result<Vec<Issue>, EngineError>;
    async fn list_resolved_issues(&self) -> Result<Vec<Issue>, EngineError>;
    /// Marks an issue resolved. Used by the external resolution workflow;
    /// fails on a resolution time earlier than the creation time.
    async fn resolve_issue(
        &self,
        issue_id: i64,
        resolved_at: DateTime<Utc>,
    ) -> Result<Issue, EngineError>;

    async fn create_report(&self, new: NewReport) -> Result<Report, EngineError>;
    async fn report(&self, report_id: i64) -> Result<Report, EngineError>;
    /// Atomically links a report to an issue and flips the processed flag.
    /// Linking an already-processed report is a no-op.
    async fn link_report(&self, report_id: i64, issue_id: i64) -> Result<Report, EngineError>;
    async fn list_unprocessed_reports(&self, limit: usize) -> Result<Vec<Report>, EngineError>;

    /// Upsert keyed by issue id: recomputation overwrites, never duplicates.
    async fn upsert_sla_metric(&self, metric: SlaMetric) -> Result<(), EngineError>;
    async fn sla_metric(&self, issue_id: i64) -> Result<Option<SlaMetric>, EngineError>;
    /// Metrics for a tenant (optionally narrowed to one area) calculated at
    /// or after `since`.
    async fn list_sla_metrics(
        &self,
        tenant_id: i64,
        area_id: Option<i64>,
        since: DateTime<Utc>,
    ) -> Result<Vec<SlaMetric>, EngineError>;

    async fn append_score(&self, new: NewScore) -> Result<ScoreEntry, EngineError>;
    /// The most recent score entry per (tenant, area) pair for the given
    /// metric type.
    async fn latest_scores(&self, metric_type: MetricType) -> Result<Vec<ScoreEntry>, EngineError>;
}
