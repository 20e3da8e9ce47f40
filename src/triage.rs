//! Report intake: normalize -> classify -> match-or-create -> link.
//!
//! The single entry point for report processing. Owns the issue-creation
//! race guard: the match-or-create decision is serialized per
//! (tenant, category), and a store-level creation conflict is compensated
//! by one re-match before surfacing.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entity::{Category, Report};
use crate::error::EngineError;
use crate::llm::{Classifier, SimilarityMatcher};
use crate::model::{Classification, MatchCandidate, NewReportRequest, TriageOutcome};
use crate::store::{NewIssue, NewReport, Store};
use crate::util::sync::KeyedMutex;
use crate::util::text;

pub struct TriagePipeline {
    store: Arc<dyn Store>,
    classifier: Classifier,
    matcher: SimilarityMatcher,
    creation_locks: KeyedMutex<(i64, Category)>,
    candidate_limit: usize,
}

impl TriagePipeline {
    pub fn new(
        store: Arc<dyn Store>,
        classifier: Classifier,
        matcher: SimilarityMatcher,
        candidate_limit: usize,
    ) -> Self {
        TriagePipeline {
            store,
            classifier,
            matcher,
            creation_locks: KeyedMutex::new(),
            candidate_limit,
        }
    }

    /// Ingestion boundary: persist the submission, then triage it.
    #[instrument(
        skip(self, request),
        fields(triage_id = %Uuid::new_v4(), tenant_id = request.tenant_id)
    )]
    pub async fn submit(
        &self,
        request: NewReportRequest,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<TriageOutcome, EngineError> {
        self.store.tenant(request.tenant_id).await?;
        let report = self
            .store
            .create_report(NewReport {
                tenant_id: request.tenant_id,
                description: request.description,
                location: request.location,
                submitted_at: now,
            })
            .await?;
        self.run(report, now, deadline).await
    }

    /// Re-entrant processing for delivery retries and the dedup sweep.
    /// Idempotent: an already-processed report returns its existing linkage
    /// with no state change.
    #[instrument(skip(self), fields(triage_id = %Uuid::new_v4()))]
    pub async fn process(
        &self,
        report_id: i64,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<TriageOutcome, EngineError> {
        let report = self.store.report(report_id).await?;
        self.run(report, now, deadline).await
    }

    async fn run(
        &self,
        report: Report,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<TriageOutcome, EngineError> {
        if report.processed {
            // Upstream redelivery of a finished report.
            let issue_id = report.issue_id.ok_or_else(|| {
                EngineError::Store(format!("processed report {} has no issue", report.id))
            })?;
            return Ok(TriageOutcome {
                report_id: report.id,
                issue_id,
                matched: true,
            });
        }

        let classification = self
            .with_deadline(deadline, self.classifier.classify(&report.description, report.location.as_deref()))
            .await?;

        let match_text = match &report.location {
            Some(location) => format!(
                "{} ({})",
                text::normalize(&report.description),
                text::normalize_location(location)
            ),
            None => text::normalize(&report.description),
        };

        let area_id = match &classification.suggested_area {
            Some(suggested) => self.resolve_area(report.tenant_id, suggested).await?,
            None => None,
        };

        // Serialize match-or-create per (tenant, category): two reports of
        // the same new incident must not both create an issue.
        let _guard = self
            .creation_locks
            .lock((report.tenant_id, classification.category))
            .await;

        let candidates = self
            .candidates(report.tenant_id, classification.category)
            .await?;
        let verdict = self
            .with_deadline(deadline, self.matcher.match_report(&match_text, &candidates))
            .await?;

        let (issue_id, matched) = match verdict.issue_id.filter(|_| verdict.matched) {
            Some(issue_id) => {
                info!(
                    report_id = report.id,
                    issue_id,
                    confidence = verdict.confidence,
                    "report matched an existing issue"
                );
                (issue_id, true)
            }
            None => {
                self.create_issue(&report, &classification, area_id, &match_text, now, deadline)
                    .await?
            }
        };

        self.store.link_report(report.id, issue_id).await?;
        Ok(TriageOutcome {
            report_id: report.id,
            issue_id,
            matched,
        })
    }

    async fn create_issue(
        &self,
        report: &Report,
        classification: &Classification,
        area_id: Option<i64>,
        match_text: &str,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<(i64, bool), EngineError> {
        let new_issue = NewIssue {
            tenant_id: report.tenant_id,
            area_id,
            category: classification.category,
            severity: classification.severity,
            summary: classification.summary.clone(),
            created_at: now,
        };

        match self.store.create_issue(new_issue).await {
            Ok(issue) => {
                info!(report_id = report.id, issue_id = issue.id, "created a new issue");
                Ok((issue.id, false))
            }
            Err(EngineError::Conflict { .. }) => {
                // A concurrent worker won the create; re-fetch and re-match
                // once before giving up.
                warn!(report_id = report.id, "issue creation conflicted, re-matching");
                let candidates = self
                    .candidates(report.tenant_id, classification.category)
                    .await?;
                let verdict = self
                    .with_deadline(deadline, self.matcher.match_report(match_text, &candidates))
                    .await?;
                match verdict.issue_id.filter(|_| verdict.matched) {
                    Some(issue_id) => Ok((issue_id, true)),
                    None => Err(EngineError::Conflict {
                        tenant_id: report.tenant_id,
                    }),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn candidates(
        &self,
        tenant_id: i64,
        category: Category,
    ) -> Result<Vec<MatchCandidate>, EngineError> {
        let issues = self
            .store
            .list_open_issues(tenant_id, Some(category), self.candidate_limit)
            .await?;
        Ok(issues
            .into_iter()
            .map(|issue| MatchCandidate {
                issue_id: issue.id,
                description: issue.summary,
            })
            .collect())
    }

    /// Resolve a classifier-suggested area name against the tenant's areas
    /// by normalized-location comparison; unresolvable suggestions are
    /// dropped rather than creating areas.
    async fn resolve_area(
        &self,
        tenant_id: i64,
        suggested: &str,
    ) -> Result<Option<i64>, EngineError> {
        let suggested = text::normalize_location(suggested);
        if suggested.is_empty() {
            return Ok(None);
        }
        let areas = self.store.list_areas(tenant_id).await?;
        Ok(areas
            .iter()
            .find(|area| {
                let name = text::normalize_location(&area.name);
                name == suggested || name.contains(&suggested) || suggested.contains(&name)
            })
            .map(|area| area.id))
    }

    /// Bound a pipeline step by the caller's deadline. On expiry the report
    /// is left unprocessed, safe to retry later.
    async fn with_deadline<T>(
        &self,
        deadline: Option<Instant>,
        step: impl Future<Output = T>,
    ) -> Result<T, EngineError> {
        match deadline {
            Some(at) => tokio::time::timeout_at(at, step)
                .await
                .map_err(|_| EngineError::Cancelled),
            None => Ok(step.await),
        }
    }
}
