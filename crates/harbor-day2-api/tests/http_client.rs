use harbor_day2_api::{
    ApiError, ClientConfig, Credentials, HarborClient, ProjectRef, ProjectRole, RegistryClient,
    ScheduleKind,
};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, page_size: usize) -> HarborClient {
    HarborClient::new(
        ClientConfig::new(server.uri(), Credentials::new("admin", "Harbor12345"))
            .with_page_size(page_size),
    )
    .expect("client")
}

#[tokio::test]
async fn test_list_registries_pages_until_short_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/registries"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "2"))
        .and(basic_auth("admin", "Harbor12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "a", "type": "harbor"},
            {"id": 2, "name": "b", "type": "docker-hub"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/registries"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "c", "type": "quay"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let registries = client_for(&server, 2).list_registries(None).await.unwrap();
    let names: Vec<&str> = registries.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(registries[1].registry_type.as_deref(), Some("docker-hub"));
}

#[tokio::test]
async fn test_list_projects_by_exact_name_uses_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/projects"))
        .and(query_param("q", "name=p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"project_id": 42, "name": "p1"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let projects = client_for(&server, 10)
        .list_projects(Some("p1"))
        .await
        .unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].project_id, Some(42));
}

#[tokio::test]
async fn test_empty_listing_body_is_empty_vec() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/replication/policies"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let policies = client_for(&server, 10)
        .list_replication_policies()
        .await
        .unwrap();
    assert!(policies.is_empty());
}

#[tokio::test]
async fn test_create_returns_id_from_location_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2.0/registries"))
        .and(body_json(json!({"name": "hub", "type": "docker-hub", "url": "https://hub.docker.com"})))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", "/api/v2.0/registries/17"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = serde_json::from_value(json!({
        "name": "hub",
        "type": "docker-hub",
        "url": "https://hub.docker.com"
    }))
    .unwrap();
    let id = client_for(&server, 10)
        .create_registry(&registry)
        .await
        .unwrap();
    assert_eq!(id, Some(17));
}

#[tokio::test]
async fn test_conflict_status_maps_to_conflict_error_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2.0/robots"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "errors": [{"code": "CONFLICT", "message": "robot ci already exists"}]
        })))
        .mount(&server)
        .await;

    let robot = serde_json::from_value(json!({
        "name": "ci",
        "permissions": [{"kind": "project", "namespace": "*", "access": []}]
    }))
    .unwrap();
    let err = client_for(&server, 10).create_robot(&robot).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("robot ci already exists"));
}

#[tokio::test]
async fn test_name_addressed_project_sets_resource_name_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2.0/projects/library/members"))
        .and(header("X-Is-Resource-Name", "true"))
        .and(body_json(json!({"role_id": 1, "member_user": {"username": "bob"}})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", "/api/v2.0/projects/library/members/8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server, 10)
        .add_project_member(&ProjectRef::name("library"), "bob", ProjectRole::Admin)
        .await
        .unwrap();
    assert_eq!(id, Some(8));
}

#[tokio::test]
async fn test_project_retention_id_parses_string_and_reports_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/projects/42/metadatas/retention_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retention_id": "5"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/projects/43/metadatas/retention_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    assert_eq!(
        client.project_retention_id(&ProjectRef::Id(42)).await.unwrap(),
        5
    );
    let err = client
        .project_retention_id(&ProjectRef::Id(43))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_missing_schedule_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/system/gc/schedule"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server, 10)
        .get_schedule(ScheduleKind::GarbageCollection)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
}

#[tokio::test]
async fn test_wrong_credentials_are_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/users/current"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server, 10).current_user().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_robot_secret_refresh_patches_secret() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v2.0/robots/3"))
        .and(body_json(json!({"secret": "Sup3rSecret"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, 10)
        .refresh_robot_secret(3, "Sup3rSecret")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_robots_listing_selects_scope_via_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2.0/robots"))
        .and(query_param("q", "Level=project,ProjectID=4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "name": "robot$p1+ci", "level": "project",
             "permissions": [{"kind": "project", "namespace": "p1", "access": []}]}
        ])))
        .mount(&server)
        .await;

    let robots = client_for(&server, 10)
        .list_robots(harbor_day2_api::RobotScope::Project(4))
        .await
        .unwrap();
    assert_eq!(robots.len(), 1);
    assert_eq!(robots[0].permissions[0].namespace, "p1");
    assert_json_diff::assert_json_include!(
        actual: serde_json::to_value(&robots[0]).unwrap(),
        expected: json!({"id": 9, "name": "robot$p1+ci", "level": "project"})
    );
}
