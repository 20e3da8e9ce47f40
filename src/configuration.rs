//! Env-based settings loader.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::llm::matcher::{DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_CANDIDATES};
use crate::llm::{Classifier, HttpInference, Inference, RetryPolicy, SimilarityMatcher};
use crate::store::Store;
use crate::triage::TriagePipeline;

#[derive(Clone, Debug)]
pub struct Settings {
    pub inference: InferenceSettings,
    pub triage: TriageSettings,
    pub jobs: JobSettings,
}

#[derive(Clone, Debug)]
pub struct InferenceSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Clone, Copy, Debug)]
pub struct TriageSettings {
    pub match_threshold: f64,
    pub max_candidates: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for TriageSettings {
    fn default() -> Self {
        TriageSettings {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            retry_max_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl TriageSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.retry_base_delay)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct JobSettings {
    pub sweep_batch: usize,
    pub worker_concurrency: usize,
    pub score_window_days: i64,
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            sweep_batch: 100,
            worker_concurrency: 8,
            score_window_days: 30,
        }
    }
}

impl Settings {
    /// Wire a pipeline against the HTTP inference capability described by
    /// these settings.
    pub fn build_pipeline(&self, store: Arc<dyn Store>) -> TriagePipeline {
        let inference: Arc<dyn Inference> = Arc::new(HttpInference::new(&self.inference));
        let retry = self.triage.retry_policy();
        let classifier = Classifier::new(Arc::clone(&inference), retry);
        let matcher = SimilarityMatcher::new(
            inference,
            retry,
            self.triage.match_threshold,
            self.triage.max_candidates,
        );
        TriagePipeline::new(store, classifier, matcher, self.triage.max_candidates)
    }
}

pub fn get_configuration() -> anyhow::Result<Settings> {
    dotenv::dotenv().ok();

    let inference = InferenceSettings {
        base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string())?,
        api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
        model: env_or("OPENAI_MODEL", "gpt-4".to_string())?,
        timeout: Duration::from_secs(env_or("INFERENCE_TIMEOUT_SECS", 10u64)?),
    };

    let triage = TriageSettings {
        match_threshold: env_or("MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD)?,
        max_candidates: env_or("MAX_CANDIDATES", DEFAULT_MAX_CANDIDATES)?,
        retry_max_attempts: env_or("INFERENCE_RETRY_ATTEMPTS", 3u32)?,
        retry_base_delay: Duration::from_millis(env_or("INFERENCE_RETRY_BASE_MS", 100u64)?),
    };

    let jobs = JobSettings {
        sweep_batch: env_or("SWEEP_BATCH_SIZE", 100)?,
        worker_concurrency: env_or("WORKER_CONCURRENCY", 8)?,
        score_window_days: env_or("SCORE_WINDOW_DAYS", 30)?,
    };

    Ok(Settings {
        inference,
        triage,
        jobs,
    })
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("failed to read {key}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns all env mutation to keep it race-free under the
    // parallel test runner.
    #[test]
    fn configuration_requires_api_key_and_applies_defaults() {
        unsafe {
            env::remove_var("OPENAI_API_KEY");
        }
        assert!(get_configuration().is_err());

        unsafe {
            env::set_var("OPENAI_API_KEY", "test-key");
            env::set_var("MATCH_THRESHOLD", "0.8");
        }
        let settings = get_configuration().expect("configuration loads");
        assert_eq!(settings.inference.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.inference.model, "gpt-4");
        assert_eq!(settings.triage.match_threshold, 0.8);
        assert_eq!(settings.triage.max_candidates, 10);
        assert_eq!(settings.jobs.sweep_batch, 100);
        assert_eq!(settings.jobs.score_window_days, 30);
    }
}
