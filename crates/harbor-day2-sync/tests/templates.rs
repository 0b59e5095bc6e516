//! Placeholder rendering and document loading.

use std::fs;

use assert_json_diff::assert_json_eq;
use harbor_day2_api::{ClientConfig, Credentials, HarborClient, RetentionPolicy};
use harbor_day2_memory::{Action, MemoryRegistry};
use harbor_day2_sync::{DocumentLoader, ResourceKind, SyncError, TemplateError, TemplateRenderer};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETENTION: &str = r#"[
  {
    "algorithm": "or",
    "scope": {"level": "project", "ref": {{ project:p1 }}},
    "rules": [{"action": "retain", "template": "latestPushedK", "params": {"latestPushedK": 5}}]
  }
]"#;

async fn project_listing(projects: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/projects"))
        .and(query_param("q", "name=p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> HarborClient {
    HarborClient::new(ClientConfig::new(
        server.uri(),
        Credentials::new("admin", "Harbor12345"),
    ))
    .expect("client")
}

#[tokio::test]
async fn test_project_placeholder_resolves_to_project_id() {
    let server = project_listing(json!([{"name": "p1", "project_id": 42}])).await;
    let client = client_for(&server);

    let rendered = TemplateRenderer::new(&client)
        .render(RETENTION)
        .await
        .expect("render");

    let policies: Vec<RetentionPolicy> = serde_json::from_str(&rendered).expect("decode");
    assert_eq!(policies[0].scope.reference.as_id(), Some(42));
}

#[tokio::test]
async fn test_unresolved_placeholder_fails_the_render() {
    let server = project_listing(json!([])).await;
    let client = client_for(&server);

    let err = TemplateRenderer::new(&client)
        .render(RETENTION)
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::Unresolved { ref name, .. } if name == "p1"));
}

#[tokio::test]
async fn test_document_without_placeholders_is_returned_unchanged() {
    let registry = MemoryRegistry::new();
    let document = "{\n  \"note\": \"{{ not-a-placeholder }}\"\n}";

    let rendered = TemplateRenderer::new(&registry)
        .render(document)
        .await
        .expect("render");

    assert_eq!(rendered, document);
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn test_each_distinct_placeholder_is_resolved_once() {
    let registry = MemoryRegistry::new();
    let p1 = registry.add_project("p1");
    let hub = registry.add_registry("hub", "docker-hub");
    let document = r#"[
      {"name": "a", "src_registry": {"id": {{ registry:hub }}}, "project": {{project:p1}}},
      {"name": "b", "src_registry": {"id": {{ registry:hub }}}, "project": {{ project:p1 }}}
    ]"#;

    let rendered = TemplateRenderer::new(&registry)
        .render(document)
        .await
        .expect("render");

    let value: Value = serde_json::from_str(&rendered).expect("valid json");
    assert_json_eq!(
        value,
        json!([
            {"name": "a", "src_registry": {"id": hub}, "project": p1},
            {"name": "b", "src_registry": {"id": hub}, "project": p1}
        ])
    );
    let lookups = registry
        .calls()
        .into_iter()
        .filter(|c| c.action == Action::List)
        .count();
    assert_eq!(lookups, 2);
}

#[tokio::test]
async fn test_dotted_placeholders_render_independently() {
    let registry = MemoryRegistry::new();
    let eu = registry.add_project("team.eu");
    let us = registry.add_project("team.us");

    let rendered = TemplateRenderer::new(&registry)
        .render(r#"{"eu": {{ project:team.eu }}, "us": {{ project:team.us }}}"#)
        .await
        .expect("render");

    let value: Value = serde_json::from_str(&rendered).expect("valid json");
    assert_json_eq!(value, json!({"eu": eu, "us": us}));
}

#[tokio::test]
async fn test_name_extended_by_a_dotted_name_renders_both() {
    let registry = MemoryRegistry::new();
    let team = registry.add_project("team");
    let team_eu = registry.add_project("team.eu");

    let rendered = TemplateRenderer::new(&registry)
        .render(r#"{"a": {{ project:team }}, "b": {{ project:team.eu }}}"#)
        .await
        .expect("render");

    let value: Value = serde_json::from_str(&rendered).expect("valid json");
    assert_json_eq!(value, json!({"a": team, "b": team_eu}));
}

#[tokio::test]
async fn test_ambiguous_name_uses_the_first_match() {
    let server = project_listing(json!([
        {"name": "p1", "project_id": 42},
        {"name": "p1", "project_id": 43}
    ]))
    .await;
    let client = client_for(&server);

    let rendered = TemplateRenderer::new(&client)
        .render(RETENTION)
        .await
        .expect("render");

    let policies: Vec<RetentionPolicy> = serde_json::from_str(&rendered).expect("decode");
    assert_eq!(policies[0].scope.reference.as_id(), Some(42));
}

#[tokio::test]
async fn test_loader_renders_and_decodes_documents() {
    let registry = MemoryRegistry::new();
    let p1 = registry.add_project("p1");
    let dir = tempfile::tempdir().expect("tmp dir");
    fs::write(dir.path().join("retention-policies.json"), RETENTION).expect("write document");

    let loader = DocumentLoader::new(dir.path(), &registry);
    let policies: Vec<RetentionPolicy> = loader
        .load(ResourceKind::RetentionPolicy)
        .await
        .expect("load")
        .expect("document present");

    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].scope.reference.as_id(), Some(p1));
}

#[tokio::test]
async fn test_loader_skips_missing_documents_and_reports_bad_ones() {
    let registry = MemoryRegistry::new();
    let dir = tempfile::tempdir().expect("tmp dir");
    let loader = DocumentLoader::new(dir.path(), &registry);

    let missing: Option<Vec<Value>> = loader.load(ResourceKind::Registry).await.expect("load");
    assert!(missing.is_none());

    fs::write(dir.path().join("projects.json"), "[{\"project_name\": ").expect("write");
    let err = loader
        .load::<Vec<Value>>(ResourceKind::Project)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode { .. }));

    fs::write(dir.path().join("webhooks.json"), "[{{ project:ghost }}]").expect("write");
    let err = loader
        .load::<Vec<Value>>(ResourceKind::WebhookPolicy)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Render {
            source: TemplateError::Unresolved { .. },
            ..
        }
    ));
}
