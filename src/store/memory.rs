//! In-memory reference implementation of the persistence collaborator.
//! Used by the test suite and by embedders that do not need durability.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::entity::{
    Area, Category, Issue, IssueStatus, MetricType, Report, ScoreEntry, Severity, SlaMetric,
    Tenant, TenantKind,
};
use crate::error::EngineError;
use crate::store::{NewIssue, NewReport, NewScore, Store};

#[derive(Default)]
struct Inner {
    tenants: HashMap<i64, Tenant>,
    areas: HashMap<i64, Area>,
    issues: HashMap<i64, Issue>,
    reports: HashMap<i64, Report>,
    sla_metrics: HashMap<i64, SlaMetric>,
    scores: Vec<ScoreEntry>,
    next_id: i64,
}

impl Inner {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_tenant(
        &self,
        name: &str,
        kind: TenantKind,
        created_at: DateTime<Utc>,
    ) -> Result<Tenant, EngineError> {
        let mut inner = self.inner.write().await;
        let id = inner.allocate_id();
        let tenant = Tenant::new(id, name, kind, created_at);
        inner.tenants.insert(id, tenant.clone());
        Ok(tenant)
    }

    async fn tenant(&self, tenant_id: i64) -> Result<Tenant, EngineError> {
        self.inner
            .read()
            .await
            .tenants
            .get(&tenant_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("tenant", tenant_id))
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, EngineError> {
        let inner = self.inner.read().await;
        let mut tenants: Vec<Tenant> = inner.tenants.values().cloned().collect();
        tenants.sort_by_key(|tenant| tenant.id);
        Ok(tenants)
    }

    async fn create_area(
        &self,
        tenant_id: i64,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Area, EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.tenants.contains_key(&tenant_id) {
            return Err(EngineError::not_found("tenant", tenant_id));
        }
        let id = inner.allocate_id();
        let area = Area::new(id, tenant_id, name, created_at);
        inner.areas.insert(id, area.clone());
        Ok(area)
    }

    async fn list_areas(&self, tenant_id: i64) -> Result<Vec<Area>, EngineError> {
        let inner = self.inner.read().await;
        let mut areas: Vec<Area> = inner
            .areas
            .values()
            .filter(|area| area.tenant_id == tenant_id)
            .cloned()
            .collect();
        areas.sort_by_key(|area| area.id);
        Ok(areas)
    }

    async fn create_issue(&self, new: NewIssue) -> Result<Issue, EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.tenants.contains_key(&new.tenant_id) {
            return Err(EngineError::not_found("tenant", new.tenant_id));
        }
        let id = inner.allocate_id();
        let issue = Issue::new(
            id,
            new.tenant_id,
            new.area_id,
            new.category,
            new.severity,
            new.summary,
            new.created_at,
        );
        inner.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn issue(&self, issue_id: i64) -> Result<Issue, EngineError> {
        self.inner
            .read()
            .await
            .issues
            .get(&issue_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("issue", issue_id))
    }

    async fn list_open_issues(
        &self,
        tenant_id: i64,
        category: Option<Category>,
        limit: usize,
    ) -> Result<Vec<Issue>, EngineError> {
        let inner = self.inner.read().await;
        let mut issues: Vec<Issue> = inner
            .issues
            .values()
            .filter(|issue| issue.tenant_id == tenant_id && issue.is_open())
            .filter(|issue| category.is_none_or(|c| issue.category == c))
            .cloned()
            .collect();
        // Most recent first; id breaks creation-time ties.
        issues.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        issues.truncate(limit);
        Ok(issues)
    }

    async fn list_issues(&self, tenant_id: i64) -> Result<Vec<Issue>, EngineError> {
        let inner = self.inner.read().await;
        let mut issues: Vec<Issue> = inner
            .issues
            .values()
            .filter(|issue| issue.tenant_id == tenant_id)
            .cloned()
            .collect();
        issues.sort_by_key(|issue| issue.id);
        Ok(issues)
    }

    async fn list_resolved_issues(&self) -> Result<Vec<Issue>, EngineError> {
        let inner = self.inner.read().await;
        let mut issues: Vec<Issue> = inner
            .issues
            .values()
            .filter(|issue| issue.status == IssueStatus::Resolved)
            .cloned()
            .collect();
        issues.sort_by_key(|issue| issue.id);
        Ok(issues)
    }

    async fn resolve_issue(
        &self,
        issue_id: i64,
        resolved_at: DateTime<Utc>,
    ) -> Result<Issue, EngineError> {
        let mut inner = self.inner.write().await;
        let issue = inner
            .issues
            .get_mut(&issue_id)
            .ok_or_else(|| EngineError::not_found("issue", issue_id))?;
        if resolved_at < issue.created_at {
            return Err(EngineError::validation(format!(
                "issue {issue_id} resolved before it was created"
            )));
        }
        issue.resolve(resolved_at);
        Ok(issue.clone())
    }

    async fn create_report(&self, new: NewReport) -> Result<Report, EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.tenants.contains_key(&new.tenant_id) {
            return Err(EngineError::not_found("tenant", new.tenant_id));
        }
        let id = inner.allocate_id();
        let report = Report::new(id, new.tenant_id, new.description, new.location, new.submitted_at);
        inner.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn report(&self, report_id: i64) -> Result<Report, EngineError> {
        self.inner
            .read()
            .await
            .reports
            .get(&report_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("report", report_id))
    }

    async fn link_report(&self, report_id: i64, issue_id: i64) -> Result<Report, EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.issues.contains_key(&issue_id) {
            return Err(EngineError::not_found("issue", issue_id));
        }
        let report = inner
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| EngineError::not_found("report", report_id))?;
        if !report.processed {
            report.mark_processed(issue_id);
        }
        Ok(report.clone())
    }

    async fn list_unprocessed_reports(&self, limit: usize) -> Result<Vec<Report>, EngineError> {
        let inner = self.inner.read().await;
        let mut reports: Vec<Report> = inner
            .reports
            .values()
            .filter(|report| !report.processed)
            .cloned()
            .collect();
        reports.sort_by_key(|report| report.id);
        reports.truncate(limit);
        Ok(reports)
    }

    async fn upsert_sla_metric(&self, metric: SlaMetric) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.issues.contains_key(&metric.issue_id) {
            return Err(EngineError::not_found("issue", metric.issue_id));
        }
        inner.sla_metrics.insert(metric.issue_id, metric);
        Ok(())
    }

    async fn sla_metric(&self, issue_id: i64) -> Result<Option<SlaMetric>, EngineError> {
        Ok(self.inner.read().await.sla_metrics.get(&issue_id).cloned())
    }

    async fn list_sla_metrics(
        &self,
        tenant_id: i64,
        area_id: Option<i64>,
        since: DateTime<Utc>,
    ) -> Result<Vec<SlaMetric>, EngineError> {
        let inner = self.inner.read().await;
        let mut metrics: Vec<SlaMetric> = inner
            .sla_metrics
            .values()
            .filter(|metric| metric.calculated_at >= since)
            .filter(|metric| {
                inner.issues.get(&metric.issue_id).is_some_and(|issue| {
                    issue.tenant_id == tenant_id
                        && area_id.is_none_or(|area| issue.area_id == Some(area))
                })
            })
            .cloned()
            .collect();
        metrics.sort_by_key(|metric| metric.issue_id);
        Ok(metrics)
    }

    async fn append_score(&self, new: NewScore) -> Result<ScoreEntry, EngineError> {
        let mut inner = self.inner.write().await;
        if !inner.tenants.contains_key(&new.tenant_id) {
            return Err(EngineError::not_found("tenant", new.tenant_id));
        }
        let id = inner.allocate_id();
        let entry = ScoreEntry {
            id,
            tenant_id: new.tenant_id,
            area_id: new.area_id,
            score: new.score,
            metric_type: new.metric_type,
            calculated_at: new.calculated_at,
        };
        inner.scores.push(entry.clone());
        Ok(entry)
    }

    async fn latest_scores(&self, metric_type: MetricType) -> Result<Vec<ScoreEntry>, EngineError> {
        let inner = self.inner.read().await;
        let mut latest: HashMap<(i64, Option<i64>), ScoreEntry> = HashMap::new();
        for entry in inner.scores.iter().filter(|e| e.metric_type == metric_type) {
            let key = (entry.tenant_id, entry.area_id);
            let newer = latest.get(&key).is_none_or(|existing| {
                (entry.calculated_at, entry.id) > (existing.calculated_at, existing.id)
            });
            if newer {
                latest.insert(key, entry.clone());
            }
        }
        let mut entries: Vec<ScoreEntry> = latest.into_values().collect();
        entries.sort_by_key(|entry| (entry.tenant_id, entry.area_id));
        Ok(entries)
    }
}
