//! Reconciliation of every resource kind against the in-memory registry.

use harbor_day2_api::{
    ProjectRequest, ProjectRole, Registry, RegistryClient, ReplicationPolicy, RetentionPolicy,
    ScheduleKind,
};
use harbor_day2_memory::{Action, Call, Failure, MemoryRegistry, document};
use harbor_day2_sync::adapters::{
    DesiredRobot, ProjectAdapter, ProjectMembership, ProjectWebhooks, RegistryAdapter,
    ReplicationAdapter, RetentionAdapter, RobotAdapter, RobotNaming, RobotSecrets,
    sync_project_members, sync_schedule, sync_webhooks,
};
use harbor_day2_sync::{ReconcileResult, SyncError, sync, upsert};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

fn parse<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("valid document")
}

fn mutation_keys(registry: &MemoryRegistry) -> Vec<String> {
    registry.mutations().iter().map(Call::to_string).collect()
}

fn robot_adapter(registry: &MemoryRegistry) -> RobotAdapter<'_> {
    RobotAdapter::new(
        registry,
        RobotNaming::new("robot$"),
        RobotSecrets::from_pairs([("DEPLOY", "deploy-secret")]),
    )
}

async fn sync_registries(registry: &MemoryRegistry, target: &[Registry]) -> ReconcileResult {
    sync(&RegistryAdapter::new(registry), target)
        .await
        .expect("registries sync")
}

#[tokio::test]
async fn test_registries_update_matched_and_create_missing() {
    let registry = MemoryRegistry::new();
    registry.add_registry("a", "harbor");

    let target: Vec<Registry> = parse(json!([
        {"name": "a", "type": "harbor", "url": "https://a.example.com"},
        {"name": "b", "type": "harbor", "url": "https://b.example.com"}
    ]));
    let result = sync_registries(&registry, &target).await;

    assert_eq!(
        mutation_keys(&registry),
        vec!["Update registry a", "Create registry b"]
    );
    assert_eq!(result.updated, vec!["a"]);
    assert_eq!(result.created, vec!["b"]);
    assert!(result.deleted.is_empty());
}

#[tokio::test]
async fn test_registry_type_change_recreates() {
    let registry = MemoryRegistry::new();
    registry.add_registry("hub", "docker-hub");

    let target: Vec<Registry> = parse(json!([
        {"name": "hub", "type": "harbor", "url": "https://hub.example.com"}
    ]));
    let result = sync_registries(&registry, &target).await;

    assert_eq!(
        mutation_keys(&registry),
        vec!["Delete registry hub", "Create registry hub"]
    );
    assert_eq!(result.recreated, vec!["hub"]);
    assert_eq!(
        registry.registries()[0].registry_type.as_deref(),
        Some("harbor")
    );
}

#[tokio::test]
async fn test_unlisted_registries_are_deleted() {
    let registry = MemoryRegistry::new();
    registry.add_registry("keep", "harbor");
    registry.add_registry("drop", "harbor");

    let target: Vec<Registry> = parse(json!([{"name": "keep", "type": "harbor"}]));
    let result = sync_registries(&registry, &target).await;

    assert_eq!(result.deleted, vec!["drop"]);
    let names: Vec<String> = registry.registries().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["keep"]);
}

#[tokio::test]
async fn test_projects_with_repositories_are_kept() {
    let registry = MemoryRegistry::new();
    registry.add_project("busy");
    registry.add_repository("busy", "app");
    registry.add_project("idle");

    let target: Vec<ProjectRequest> = parse(json!([
        {"project_name": "new", "metadata": {"public": "false"}}
    ]));
    let result = sync(&ProjectAdapter::new(&registry), &target)
        .await
        .expect("projects sync");

    assert_eq!(result.retained, vec!["busy"]);
    assert_eq!(result.deleted, vec!["idle"]);
    assert_eq!(result.created, vec!["new"]);
    let mut names: Vec<String> = registry.projects().into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["busy", "new"]);
}

#[tokio::test]
async fn test_failing_project_guard_aborts_the_kind() {
    let registry = MemoryRegistry::new();
    let id = registry.add_project("idle");
    registry.fail(Action::List, "repository", &id.to_string(), Failure::Internal);

    let target: Vec<ProjectRequest> = parse(json!([{"project_name": "new"}]));
    let err = sync(&ProjectAdapter::new(&registry), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Guard { ref key, .. } if key == "idle"));
    assert!(registry.mutations().is_empty());
}

#[tokio::test]
async fn test_members_are_flattened_per_role() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_user("bob");
    registry.add_member("p1", "alice", ProjectRole::Guest);

    let memberships: Vec<ProjectMembership> = parse(json!([
        {"project_name": "p1", "admin": ["bob"], "guest": ["alice"]}
    ]));
    let result = sync_project_members(&registry, &memberships)
        .await
        .expect("members sync");

    assert_eq!(
        mutation_keys(&registry),
        vec!["Update member p1/alice", "Create member p1/bob"]
    );
    assert_eq!(result.updated, vec!["p1/alice"]);
    assert_eq!(result.created, vec!["p1/bob"]);
    let bob = registry
        .members("p1")
        .into_iter()
        .find(|m| m.entity_name == "bob")
        .expect("bob is a member");
    assert_eq!(bob.role_id, ProjectRole::Admin.id());
}

#[tokio::test]
async fn test_unknown_member_user_is_skipped() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_user("bob");

    let memberships: Vec<ProjectMembership> = parse(json!([
        {"project_name": "p1", "developer": ["ghost", "bob"]}
    ]));
    let result = sync_project_members(&registry, &memberships)
        .await
        .expect("members sync");

    assert_eq!(result.skipped, vec!["p1/ghost"]);
    assert_eq!(result.created, vec!["p1/bob"]);
}

#[tokio::test]
async fn test_unlisted_members_are_removed_from_project() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_member("p1", "alice", ProjectRole::Developer);

    let memberships: Vec<ProjectMembership> = parse(json!([{"project_name": "p1"}]));
    let result = sync_project_members(&registry, &memberships)
        .await
        .expect("members sync");

    assert_eq!(result.deleted, vec!["p1/alice"]);
    assert!(registry.members("p1").is_empty());
}

#[tokio::test]
async fn test_robot_conflict_is_skipped_and_others_continue() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.fail(Action::Create, "robot", "robot$ci", Failure::Conflict);

    let target: Vec<DesiredRobot> = parse(json!([
        {"name": "ci", "permissions": [{"kind": "system", "namespace": "*", "access": []}]},
        {"name": "deploy", "permissions": [{"kind": "project", "namespace": "p1", "access": []}]}
    ]));
    let result = sync(&robot_adapter(&registry), &target)
        .await
        .expect("robots sync");

    assert_eq!(result.skipped, vec!["robot$ci"]);
    assert_eq!(result.created, vec!["robot$p1+deploy"]);
    assert_eq!(
        registry.robot_secret("robot$p1+deploy").as_deref(),
        Some("deploy-secret")
    );
}

#[tokio::test]
async fn test_rejected_robot_is_skipped_and_others_continue() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");

    let target: Vec<DesiredRobot> = parse(json!([
        {"name": "lonely"},
        {"name": "deploy", "permissions": [{"kind": "project", "namespace": "p1", "access": []}]}
    ]));
    let result = sync(&robot_adapter(&registry), &target)
        .await
        .expect("robots sync");

    assert_eq!(result.skipped, vec!["robot$lonely"]);
    assert_eq!(result.created, vec!["robot$p1+deploy"]);
    assert!(registry.robots().iter().all(|r| r.name != "robot$lonely"));
}

#[tokio::test]
async fn test_robot_namespace_change_is_create_and_delete() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_project("p2");
    registry.add_robot("robot$p1+ci", "p1");

    let target: Vec<DesiredRobot> = parse(json!([
        {"name": "ci", "permissions": [{"kind": "project", "namespace": "p2", "access": []}]}
    ]));
    let result = sync(&robot_adapter(&registry), &target)
        .await
        .expect("robots sync");

    assert_eq!(result.deleted, vec!["robot$p1+ci"]);
    assert_eq!(result.created, vec!["robot$p2+ci"]);
    assert!(result.updated.is_empty());
}

#[tokio::test]
async fn test_robot_update_sends_full_name_and_document_secret() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_robot("robot$p1+deploy", "p1");

    let target: Vec<DesiredRobot> = parse(json!([{
        "name": "deploy",
        "description": "pushes releases",
        "permissions": [{"kind": "project", "namespace": "p1", "access": []}],
        "secret": "document-secret"
    }]));
    let result = sync(&robot_adapter(&registry), &target)
        .await
        .expect("robots sync");

    assert_eq!(result.updated, vec!["robot$p1+deploy"]);
    assert_eq!(
        mutation_keys(&registry),
        vec![
            "Update robot robot$p1+deploy",
            "RefreshSecret robot robot$p1+deploy"
        ]
    );
    assert_eq!(
        registry.robot_secret("robot$p1+deploy").as_deref(),
        Some("document-secret")
    );
}

#[tokio::test]
async fn test_second_run_issues_no_create_or_delete() {
    let registry = MemoryRegistry::new();
    registry.add_registry("stale", "harbor");
    registry.add_robot("robot$old", "*");

    let registries: Vec<Registry> = parse(json!([{"name": "hub", "type": "docker-hub"}]));
    let projects: Vec<ProjectRequest> = parse(json!([{"project_name": "p1"}]));
    let robots: Vec<DesiredRobot> = parse(json!([
        {"name": "ci", "permissions": [{"kind": "project", "namespace": "p1", "access": []}]}
    ]));

    for _ in 0..2 {
        registry.clear_calls();
        sync(&RegistryAdapter::new(&registry), &registries)
            .await
            .expect("registries sync");
        sync(&ProjectAdapter::new(&registry), &projects)
            .await
            .expect("projects sync");
        sync(&robot_adapter(&registry), &robots)
            .await
            .expect("robots sync");
    }

    let structural: Vec<String> = registry
        .mutations()
        .into_iter()
        .filter(|c| matches!(c.action, Action::Create | Action::Delete))
        .map(|c| c.to_string())
        .collect();
    assert!(structural.is_empty(), "unexpected: {structural:?}");

    let registries: Vec<String> = registry.registries().into_iter().map(|r| r.name).collect();
    assert_eq!(registries, vec!["hub"]);
    let robots: Vec<String> = registry.robots().into_iter().map(|r| r.name).collect();
    assert_eq!(robots, vec!["robot$p1+ci"]);
}

#[tokio::test]
async fn test_webhooks_reconcile_within_each_listed_project() {
    let registry = MemoryRegistry::new();
    registry.add_project("p1");
    registry.add_project("p2");
    registry.add_webhook_policy("p1", "old-hook");
    registry.add_webhook_policy("p2", "untouched");

    let documents: Vec<ProjectWebhooks> = parse(json!([{
        "project_name": "p1",
        "policies": [{
            "name": "notify",
            "enabled": true,
            "event_types": ["PUSH_ARTIFACT"],
            "targets": [{"type": "http", "address": "https://hooks.example.com"}]
        }]
    }]));
    let result = sync_webhooks(&registry, &documents)
        .await
        .expect("webhooks sync");

    assert_eq!(result.deleted, vec!["p1/old-hook"]);
    assert_eq!(result.created, vec!["p1/notify"]);
    assert_eq!(registry.webhook_policies("p2").len(), 1);
}

#[tokio::test]
async fn test_replication_policies_reconcile_by_name() {
    let registry = MemoryRegistry::new();
    registry.add_replication_policy("nightly");
    registry.add_replication_policy("legacy");

    let target: Vec<ReplicationPolicy> = parse(json!([
        {"name": "nightly", "enabled": true},
        {"name": "mirror", "enabled": false}
    ]));
    let result = sync(&ReplicationAdapter::new(&registry), &target)
        .await
        .expect("replications sync");

    assert_eq!(result.deleted, vec!["legacy"]);
    assert_eq!(result.updated, vec!["nightly"]);
    assert_eq!(result.created, vec!["mirror"]);
}

#[tokio::test]
async fn test_retention_policies_upsert_and_never_shrink() {
    let registry = MemoryRegistry::new();
    let p1 = registry.add_project("p1");
    let p2 = registry.add_project("p2");

    let both: Vec<RetentionPolicy> = parse(json!([
        {"algorithm": "or", "scope": {"level": "project", "ref": p1}, "rules": []},
        {"algorithm": "or", "scope": {"level": "project", "ref": p2}, "rules": []}
    ]));
    let first = upsert(&RetentionAdapter::new(&registry), &both)
        .await
        .expect("retention sync");
    assert_eq!(first.created.len(), 2);

    let only_p1: Vec<RetentionPolicy> = parse(json!([
        {"algorithm": "or", "scope": {"level": "project", "ref": p1}, "rules": [{"action": "retain"}]}
    ]));
    let second = upsert(&RetentionAdapter::new(&registry), &only_p1)
        .await
        .expect("retention sync");

    assert_eq!(second.updated, vec![p1.to_string()]);
    assert!(second.created.is_empty());
    assert_eq!(registry.retention_policies().len(), 2);
}

#[tokio::test]
async fn test_schedules_create_then_update() {
    let registry = MemoryRegistry::new();
    let schedule = document(json!({"schedule": {"type": "Daily", "cron": "0 0 0 * * *"}}));

    let first = sync_schedule(&registry, ScheduleKind::GarbageCollection, &schedule)
        .await
        .expect("schedule sync");
    assert_eq!(first.created, vec!["system/gc/schedule"]);

    let weekly = document(json!({"schedule": {"type": "Weekly", "cron": "0 0 0 * * 0"}}));
    let second = sync_schedule(&registry, ScheduleKind::GarbageCollection, &weekly)
        .await
        .expect("schedule sync");
    assert_eq!(second.updated, vec!["system/gc/schedule"]);
    assert_eq!(
        registry.schedule(ScheduleKind::GarbageCollection),
        Some(weekly)
    );
    assert!(registry.schedule(ScheduleKind::PurgeAudit).is_none());
}

#[tokio::test]
async fn test_listing_failure_aborts_before_any_mutation() {
    let registry = MemoryRegistry::new();
    registry.fail(Action::List, "registry", "", Failure::Unauthorized);

    let target: Vec<Registry> = parse(json!([{"name": "hub", "type": "harbor"}]));
    let err = sync(&RegistryAdapter::new(&registry), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Listing { .. }));
    assert!(registry.mutations().is_empty());
    // The client is usable through the trait object as well.
    let client: &dyn RegistryClient = &registry;
    assert!(client.list_projects(None).await.expect("projects").is_empty());
}
