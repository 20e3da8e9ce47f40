//! Similarity-based deduplication: decides whether a new report describes
//! the same underlying incident as one of a bounded set of open issues.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::EngineError;
use crate::llm::client::Inference;
use crate::llm::retry::RetryPolicy;
use crate::model::{MatchCandidate, MatchResult};
use crate::util::text;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// Matcher over a bounded candidate set, with the confidence threshold
/// enforced inside the component. Built without an inference capability it
/// runs purely on token-set similarity; with one, it degrades to the token
/// path when transient retries are exhausted.
pub struct SimilarityMatcher {
    inference: Option<Arc<dyn Inference>>,
    retry: RetryPolicy,
    threshold: f64,
    max_candidates: usize,
}

impl SimilarityMatcher {
    pub fn new(
        inference: Arc<dyn Inference>,
        retry: RetryPolicy,
        threshold: f64,
        max_candidates: usize,
    ) -> Self {
        SimilarityMatcher {
            inference: Some(inference),
            retry,
            threshold,
            max_candidates,
        }
    }

    /// Deterministic matcher: token-set similarity only, no external calls.
    pub fn deterministic(threshold: f64, max_candidates: usize) -> Self {
        SimilarityMatcher {
            inference: None,
            retry: RetryPolicy::default(),
            threshold,
            max_candidates,
        }
    }

    pub async fn match_report(
        &self,
        report_text: &str,
        candidates: &[MatchCandidate],
    ) -> MatchResult {
        let candidates = &candidates[..candidates.len().min(self.max_candidates)];
        if candidates.is_empty() {
            return MatchResult::no_match("no open issues to compare against");
        }

        let result = match &self.inference {
            Some(inference) => match self.infer(inference.as_ref(), report_text, candidates).await {
                Ok(result) => result,
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "inference unavailable, degrading to token similarity");
                    self.token_match(report_text, candidates)
                }
                Err(err) => {
                    warn!(error = %err, "discarding invalid match output");
                    MatchResult::no_match("capability output failed validation")
                }
            },
            None => self.token_match(report_text, candidates),
        };

        self.apply_threshold(result)
    }

    async fn infer(
        &self,
        inference: &dyn Inference,
        report_text: &str,
        candidates: &[MatchCandidate],
    ) -> Result<MatchResult, EngineError> {
        let prompt = build_prompt(report_text, candidates);
        let value = self.retry.run(|| inference.compare(&prompt)).await?;
        parse_match(&value, candidates)
    }

    fn token_match(&self, report_text: &str, candidates: &[MatchCandidate]) -> MatchResult {
        let mut best: Option<(&MatchCandidate, f64)> = None;
        for candidate in candidates {
            let score = text::token_similarity(report_text, &candidate.description);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((candidate, score)) => MatchResult {
                matched: true,
                issue_id: Some(candidate.issue_id),
                confidence: score,
                reasoning: format!(
                    "token overlap {score:.2} with issue {}",
                    candidate.issue_id
                ),
            },
            None => MatchResult::no_match("no open issues to compare against"),
        }
    }

    /// Policy boundary: a claimed match below the threshold is reported as
    /// no match, regardless of what the capability asserted.
    fn apply_threshold(&self, result: MatchResult) -> MatchResult {
        if result.matched && result.confidence < self.threshold {
            return MatchResult {
                matched: false,
                issue_id: None,
                confidence: result.confidence,
                reasoning: format!(
                    "confidence {:.2} below threshold {:.2}: {}",
                    result.confidence, self.threshold, result.reasoning
                ),
            };
        }
        result
    }
}

fn build_prompt(report_text: &str, candidates: &[MatchCandidate]) -> String {
    let issues_text = candidates
        .iter()
        .map(|candidate| format!("Issue {}: {}", candidate.issue_id, candidate.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are matching a new incident report to existing open issues.\n\
         \n\
         New Report: {report_text}\n\
         \n\
         Existing Open Issues:\n\
         {issues_text}\n\
         \n\
         Respond with JSON:\n\
         - match: true if the new report is essentially the same issue as an existing one\n\
         - issue_id: the ID of the matching issue (or null if no match)\n\
         - confidence: 0.0 to 1.0 indicating match confidence\n\
         - reasoning: brief explanation of your decision\n"
    )
}

fn parse_match(value: &Value, candidates: &[MatchCandidate]) -> Result<MatchResult, EngineError> {
    let matched = value
        .get("match")
        .and_then(Value::as_bool)
        .ok_or_else(|| EngineError::validation("match result missing match flag"))?;

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| EngineError::validation("match result missing confidence"))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(EngineError::validation(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let issue_id = value.get("issue_id").and_then(Value::as_i64);
    if matched {
        let id = issue_id
            .ok_or_else(|| EngineError::validation("match asserted without an issue id"))?;
        if !candidates.iter().any(|candidate| candidate.issue_id == id) {
            return Err(EngineError::validation(format!(
                "matched issue {id} is not in the candidate set"
            )));
        }
    }

    Ok(MatchResult {
        matched,
        issue_id: if matched { issue_id } else { None },
        confidence,
        reasoning,
    })
}
