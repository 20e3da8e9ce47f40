//! The OpenAI-style inference client, driven end-to-end through the
//! pipeline against a local HTTP test server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use httptest::matchers::{contains, request};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server};
use serde_json::json;

use civicpulse::configuration::{InferenceSettings, JobSettings, Settings, TriageSettings};
use civicpulse::entity::{Category, Severity, TenantKind};
use civicpulse::error::EngineError;
use civicpulse::llm::{HttpInference, Inference};
use civicpulse::model::NewReportRequest;
use civicpulse::store::{InMemoryStore, Store};

fn settings_for(server: &Server) -> Settings {
    Settings {
        inference: InferenceSettings {
            base_url: server.url_str(""),
            api_key: "test-key".into(),
            model: "gpt-4".into(),
            timeout: Duration::from_secs(2),
        },
        triage: TriageSettings {
            retry_base_delay: Duration::from_millis(5),
            ..TriageSettings::default()
        },
        jobs: JobSettings::default(),
    }
}

fn completion_with(content: serde_json::Value) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "content": content.to_string(),
            }
        }]
    })
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).single().expect("valid time")
}

#[tokio::test]
async fn classification_flows_from_the_wire_into_an_issue() {
    let server = Server::run();
    server.expect(
        Expectation::matching(httptest::all_of![
            request::method_path("POST", "/chat/completions"),
            request::headers(contains(("authorization", "Bearer test-key"))),
        ])
        .times(1)
        .respond_with(json_encoded(completion_with(json!({
            "category": "sanitation",
            "severity": "high",
            "summary": "Dumpster fire behind the depot",
            "suggested_area": null,
        })))),
    );

    let store = Arc::new(InMemoryStore::new());
    let tenant = store
        .create_tenant("Springfield", TenantKind::City, now())
        .await
        .expect("tenant");
    let pipeline = settings_for(&server).build_pipeline(Arc::clone(&store) as Arc<dyn Store>);

    let outcome = pipeline
        .submit(
            NewReportRequest {
                tenant_id: tenant.id,
                description: "dumpster fire behind the depot".into(),
                location: None,
            },
            now(),
            None,
        )
        .await
        .expect("triaged");

    let issue = store.issue(outcome.issue_id).await.expect("issue");
    assert_eq!(issue.category, Category::Sanitation);
    assert_eq!(issue.severity, Severity::High);
    assert_eq!(issue.summary, "Dumpster fire behind the depot");
}

#[tokio::test]
async fn server_errors_exhaust_retries_then_fall_back() {
    let server = Server::run();
    // Default policy: three attempts for the classify call. The candidate
    // set is empty so the matcher never reaches the wire.
    server.expect(
        Expectation::matching(request::method_path("POST", "/chat/completions"))
            .times(3)
            .respond_with(status_code(500)),
    );

    let store = Arc::new(InMemoryStore::new());
    let tenant = store
        .create_tenant("Springfield", TenantKind::City, now())
        .await
        .expect("tenant");
    let pipeline = settings_for(&server).build_pipeline(Arc::clone(&store) as Arc<dyn Store>);

    let outcome = pipeline
        .submit(
            NewReportRequest {
                tenant_id: tenant.id,
                description: "something is leaking".into(),
                location: None,
            },
            now(),
            None,
        )
        .await
        .expect("degraded, not failed");

    let issue = store.issue(outcome.issue_id).await.expect("issue");
    assert_eq!(issue.category, Category::Other);
    assert_eq!(issue.severity, Severity::Medium);
    assert_eq!(issue.summary, "something is leaking");
}

#[tokio::test]
async fn malformed_content_is_not_retried() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/chat/completions"))
            .times(1)
            .respond_with(json_encoded(json!({
                "choices": [{"message": {"content": "not json at all"}}]
            }))),
    );

    let store = Arc::new(InMemoryStore::new());
    let tenant = store
        .create_tenant("Springfield", TenantKind::City, now())
        .await
        .expect("tenant");
    let pipeline = settings_for(&server).build_pipeline(Arc::clone(&store) as Arc<dyn Store>);

    let outcome = pipeline
        .submit(
            NewReportRequest {
                tenant_id: tenant.id,
                description: "graffiti on the underpass".into(),
                location: None,
            },
            now(),
            None,
        )
        .await
        .expect("degraded, not failed");

    let issue = store.issue(outcome.issue_id).await.expect("issue");
    assert_eq!(issue.category, Category::Other);
}

#[tokio::test]
async fn unreachable_endpoint_is_an_external_service_error() {
    // Bind a server, capture its address, then shut it down.
    let dead_url = {
        let server = Server::run();
        server.url_str("")
    };

    let inference = HttpInference::new(&InferenceSettings {
        base_url: dead_url,
        api_key: "test-key".into(),
        model: "gpt-4".into(),
        timeout: Duration::from_secs(1),
    });

    let result = inference.classify("anything").await;
    assert!(matches!(result, Err(EngineError::ExternalService(_))));
}
