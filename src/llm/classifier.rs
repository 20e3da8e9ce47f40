//! Report classification with strict output validation and a deterministic
//! fallback. Classification never fails fatally: the fallback is a designed
//! degradation, not an error.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::entity::{Category, Severity};
use crate::error::EngineError;
use crate::llm::client::Inference;
use crate::llm::retry::RetryPolicy;
use crate::model::Classification;
use crate::util::text;

/// Upper bound on the description portion of the prompt, in characters.
const PROMPT_DESCRIPTION_CAP: usize = 2000;
/// Fallback summaries are the report description truncated to this length.
const FALLBACK_SUMMARY_CAP: usize = 100;

pub struct Classifier {
    inference: Arc<dyn Inference>,
    retry: RetryPolicy,
}

impl Classifier {
    pub fn new(inference: Arc<dyn Inference>, retry: RetryPolicy) -> Self {
        Classifier { inference, retry }
    }

    /// Classify a report description. Transient capability failures are
    /// retried per policy; malformed output is discarded without retry.
    /// Either way the caller always receives a classification.
    pub async fn classify(&self, description: &str, location: Option<&str>) -> Classification {
        let prompt = build_prompt(description, location);
        let outcome = self
            .retry
            .run(|| self.inference.classify(&prompt))
            .await
            .and_then(|value| parse_classification(&value));

        match outcome {
            Ok(classification) => classification,
            Err(err) => {
                warn!(error = %err, "classification degraded to deterministic fallback");
                fallback_classification(description)
            }
        }
    }
}

fn build_prompt(description: &str, location: Option<&str>) -> String {
    let description = text::truncate_chars(description, PROMPT_DESCRIPTION_CAP);
    let location = location.unwrap_or("Not specified");
    format!(
        "You are analyzing a civic incident report. Classify it and extract key information.\n\
         \n\
         Report Description: {description}\n\
         Location: {location}\n\
         \n\
         Respond with JSON containing:\n\
         - category: One of [infrastructure, sanitation, safety, noise, maintenance, other]\n\
         - severity: One of [low, medium, high, critical]\n\
         - summary: A brief 1-sentence summary\n\
         - suggested_area: If you can infer a specific area/zone from the description\n"
    )
}

fn parse_classification(value: &Value) -> Result<Classification, EngineError> {
    let category = value
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::validation("classification missing category"))?;
    let category = Category::parse(category)
        .ok_or_else(|| EngineError::validation(format!("unknown category: {category}")))?;

    let severity = value
        .get("severity")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::validation("classification missing severity"))?;
    let severity = Severity::parse(severity)
        .ok_or_else(|| EngineError::validation(format!("unknown severity: {severity}")))?;

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::validation("classification missing summary"))?
        .to_string();

    let suggested_area = value
        .get("suggested_area")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Classification {
        category,
        severity,
        summary,
        suggested_area,
    })
}

fn fallback_classification(description: &str) -> Classification {
    Classification {
        category: Category::Other,
        severity: Severity::Medium,
        summary: text::truncate_chars(description, FALLBACK_SUMMARY_CAP),
        suggested_area: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeInference {
        responses: Mutex<VecDeque<Result<Value, EngineError>>>,
        calls: AtomicUsize,
    }

    impl FakeInference {
        fn new(responses: Vec<Result<Value, EngineError>>) -> Arc<Self> {
            Arc::new(FakeInference {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<Value, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("responses poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(EngineError::external("fake exhausted")))
        }
    }

    #[async_trait]
    impl Inference for FakeInference {
        async fn classify(&self, _prompt: &str) -> Result<Value, EngineError> {
            self.next()
        }

        async fn compare(&self, _prompt: &str) -> Result<Value, EngineError> {
            self.next()
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn valid_output_becomes_a_classification() {
        let inference = FakeInference::new(vec![Ok(json!({
            "category": "infrastructure",
            "severity": "high",
            "summary": "Broken traffic light at Main St intersection",
            "suggested_area": "downtown",
        }))]);
        let classifier = Classifier::new(inference, fast_retry());

        let classification = classifier
            .classify("Traffic light stuck on red at Main St", Some("Main St"))
            .await;

        assert_eq!(classification.category, Category::Infrastructure);
        assert_eq!(classification.severity, Severity::High);
        assert_eq!(classification.suggested_area.as_deref(), Some("downtown"));
    }

    #[tokio::test]
    async fn category_outside_the_enumeration_falls_back_without_retry() {
        let inference = FakeInference::new(vec![Ok(json!({
            "category": "potholes",
            "severity": "high",
            "summary": "whatever",
        }))]);
        let classifier = Classifier::new(Arc::clone(&inference) as Arc<dyn Inference>, fast_retry());

        let classification = classifier.classify("Deep pothole on Elm", None).await;

        assert_eq!(classification.category, Category::Other);
        assert_eq!(classification.severity, Severity::Medium);
        assert_eq!(inference.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_summary_falls_back() {
        let inference = FakeInference::new(vec![Ok(json!({
            "category": "safety",
            "severity": "low",
        }))]);
        let classifier = Classifier::new(inference, fast_retry());

        let classification = classifier.classify("Loose railing", None).await;

        assert_eq!(classification.category, Category::Other);
        assert_eq!(classification.summary, "Loose railing");
    }

    #[tokio::test]
    async fn transient_failures_retry_then_fall_back() {
        let inference = FakeInference::new(vec![
            Err(EngineError::external("timeout")),
            Err(EngineError::external("timeout")),
            Err(EngineError::external("timeout")),
        ]);
        let classifier = Classifier::new(Arc::clone(&inference) as Arc<dyn Inference>, fast_retry());

        let classification = classifier.classify("Overflowing bin", None).await;

        assert_eq!(classification.category, Category::Other);
        assert_eq!(inference.call_count(), 3);
    }

    #[tokio::test]
    async fn transient_failure_then_success_recovers() {
        let inference = FakeInference::new(vec![
            Err(EngineError::external("connection reset")),
            Ok(json!({
                "category": "sanitation",
                "severity": "medium",
                "summary": "Overflowing bin near the park",
            })),
        ]);
        let classifier = Classifier::new(Arc::clone(&inference) as Arc<dyn Inference>, fast_retry());

        let classification = classifier.classify("Overflowing bin near the park", None).await;

        assert_eq!(classification.category, Category::Sanitation);
        assert_eq!(inference.call_count(), 2);
    }

    #[tokio::test]
    async fn fallback_summary_is_char_safe_and_capped() {
        let inference = FakeInference::new(vec![Err(EngineError::external("down"))]);
        let classifier = Classifier::new(inference, RetryPolicy::new(1, Duration::from_millis(1)));

        let description = "ü".repeat(150);
        let classification = classifier.classify(&description, None).await;

        assert_eq!(classification.summary.chars().count(), 100);
    }

    #[test]
    fn prompt_mentions_location_or_placeholder() {
        let with_location = build_prompt("desc", Some("5th Ave"));
        assert!(with_location.contains("Location: 5th Ave"));
        let without = build_prompt("desc", None);
        assert!(without.contains("Location: Not specified"));
    }

    #[test]
    fn prompt_description_is_bounded() {
        let long = "x".repeat(10_000);
        let prompt = build_prompt(&long, None);
        assert!(prompt.len() < 3000);
    }
}
