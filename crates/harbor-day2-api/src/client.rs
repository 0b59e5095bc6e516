//! The control API capability consumed by the reconciler.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{
    Document, Health, Project, ProjectMember, ProjectRef, ProjectRequest, ProjectRole, Registry,
    ReplicationPolicy, Repository, ResourceId, RetentionPolicy, Robot, RobotCreated, RobotScope,
    ScheduleKind, User, WebhookPolicy,
};

/// Operations the operator needs from the registry control API.
///
/// The operator never depends on a wire protocol directly; everything goes
/// through this trait. [`HarborClient`](crate::HarborClient) implements it over
/// HTTP, and an in-memory implementation backs the tests.
///
/// Listing calls return every entity (implementations handle paging). Calls
/// that create an entity return its id when the service reports one.
///
/// # Errors
///
/// Implementations report a missing entity as `ApiError::NotFound`, an
/// existing one as `ApiError::Conflict`, and a rejected payload as
/// `ApiError::BadRequest`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    // ==================== System ====================

    async fn health(&self) -> ApiResult<Health>;

    /// Returns the user the client is authenticated as.
    ///
    /// Fails with `ApiError::Unauthorized` when the credentials are wrong,
    /// which is how a stale admin password is detected.
    async fn current_user(&self) -> ApiResult<User>;

    async fn set_user_password(
        &self,
        user_id: ResourceId,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()>;

    async fn update_configurations(&self, configurations: &Document) -> ApiResult<()>;

    // ==================== Registries ====================

    /// Lists registries, optionally restricted to an exact name.
    async fn list_registries(&self, name: Option<&str>) -> ApiResult<Vec<Registry>>;

    async fn create_registry(&self, registry: &Registry) -> ApiResult<Option<ResourceId>>;

    async fn update_registry(&self, id: ResourceId, registry: &Registry) -> ApiResult<()>;

    async fn delete_registry(&self, id: ResourceId) -> ApiResult<()>;

    // ==================== Projects ====================

    /// Lists projects, optionally restricted to an exact name.
    async fn list_projects(&self, name: Option<&str>) -> ApiResult<Vec<Project>>;

    async fn create_project(&self, project: &ProjectRequest) -> ApiResult<Option<ResourceId>>;

    async fn update_project(&self, project: &ProjectRef, request: &ProjectRequest)
    -> ApiResult<()>;

    async fn delete_project(&self, project: &ProjectRef) -> ApiResult<()>;

    async fn list_repositories(&self, project: &ProjectRef) -> ApiResult<Vec<Repository>>;

    // ==================== Project members ====================

    async fn list_project_members(&self, project: &ProjectRef) -> ApiResult<Vec<ProjectMember>>;

    /// Adds an existing user to a project.
    ///
    /// Fails with `ApiError::NotFound` when the user is unknown to the service.
    async fn add_project_member(
        &self,
        project: &ProjectRef,
        username: &str,
        role: ProjectRole,
    ) -> ApiResult<Option<ResourceId>>;

    async fn update_project_member_role(
        &self,
        project: &ProjectRef,
        member_id: ResourceId,
        role: ProjectRole,
    ) -> ApiResult<()>;

    async fn remove_project_member(&self, project: &ProjectRef, member_id: ResourceId)
    -> ApiResult<()>;

    // ==================== Robot accounts ====================

    async fn list_robots(&self, scope: RobotScope) -> ApiResult<Vec<Robot>>;

    async fn create_robot(&self, robot: &Robot) -> ApiResult<RobotCreated>;

    async fn update_robot(&self, id: ResourceId, robot: &Robot) -> ApiResult<()>;

    async fn delete_robot(&self, id: ResourceId) -> ApiResult<()>;

    /// Replaces the secret of a robot account.
    async fn refresh_robot_secret(&self, id: ResourceId, secret: &str) -> ApiResult<()>;

    // ==================== Webhook policies ====================

    async fn list_webhook_policies(&self, project: &ProjectRef) -> ApiResult<Vec<WebhookPolicy>>;

    async fn create_webhook_policy(
        &self,
        project: &ProjectRef,
        policy: &WebhookPolicy,
    ) -> ApiResult<Option<ResourceId>>;

    async fn update_webhook_policy(
        &self,
        project: &ProjectRef,
        id: ResourceId,
        policy: &WebhookPolicy,
    ) -> ApiResult<()>;

    async fn delete_webhook_policy(&self, project: &ProjectRef, id: ResourceId) -> ApiResult<()>;

    // ==================== Replication policies ====================

    async fn list_replication_policies(&self) -> ApiResult<Vec<ReplicationPolicy>>;

    async fn create_replication_policy(
        &self,
        policy: &ReplicationPolicy,
    ) -> ApiResult<Option<ResourceId>>;

    async fn update_replication_policy(
        &self,
        id: ResourceId,
        policy: &ReplicationPolicy,
    ) -> ApiResult<()>;

    async fn delete_replication_policy(&self, id: ResourceId) -> ApiResult<()>;

    // ==================== Retention policies ====================

    /// Returns the id of the retention policy attached to a project.
    ///
    /// Fails with `ApiError::NotFound` when the project has none.
    async fn project_retention_id(&self, project: &ProjectRef) -> ApiResult<ResourceId>;

    async fn create_retention_policy(
        &self,
        policy: &RetentionPolicy,
    ) -> ApiResult<Option<ResourceId>>;

    async fn update_retention_policy(
        &self,
        id: ResourceId,
        policy: &RetentionPolicy,
    ) -> ApiResult<()>;

    // ==================== Schedules ====================

    /// Reads a system schedule. Fails with `ApiError::NotFound` if none exists.
    async fn get_schedule(&self, kind: ScheduleKind) -> ApiResult<Document>;

    async fn create_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()>;

    async fn update_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()>;
}
