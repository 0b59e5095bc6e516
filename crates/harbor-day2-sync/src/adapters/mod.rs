//! Per-kind bindings of the reconciler to the control API.

mod members;
mod projects;
mod registries;
mod replications;
mod retention;
mod robots;
mod schedules;
mod webhooks;

use harbor_day2_api::{ApiError, ApiResult, ResourceId};

pub use members::{DesiredMember, MemberAdapter, ProjectMembership, sync_project_members};
pub use projects::ProjectAdapter;
pub use registries::RegistryAdapter;
pub use replications::ReplicationAdapter;
pub use retention::RetentionAdapter;
pub use robots::{DesiredRobot, RobotAdapter, RobotNaming, RobotSecrets};
pub use schedules::{ScheduleAdapter, sync_schedule};
pub use webhooks::{ProjectWebhooks, WebhookAdapter, sync_webhooks};

/// The service id of an observed entity.
///
/// Listings always carry ids; a missing one is reported as not-found so the
/// entity is skipped rather than addressed blindly.
fn require_id(id: Option<ResourceId>, what: &str, name: &str) -> ApiResult<ResourceId> {
    id.ok_or_else(|| ApiError::not_found(format!("{what} {name} has no id")))
}
