//! Wire models for the registry control API.
//!
//! Each model names only the fields the operator reasons about (identifiers,
//! comparison keys, immutable attributes). Everything else is carried in a
//! flattened `attributes` map and passed through to the service verbatim, so
//! documents may use any field the API accepts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service-assigned numeric identifier.
pub type ResourceId = i64;

/// Free-form JSON object (configurations, schedules).
pub type Document = Map<String, Value>;

/// Overall health reported by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub components: Vec<ComponentHealth>,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
}

/// The authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: ResourceId,
    pub username: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A remote registry endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub name: String,
    /// Registry provider type. The service does not allow changing it in place.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub registry_type: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A project as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ResourceId>,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A project create/update payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub project_name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// How a project is addressed in a request path.
///
/// Documents may refer to projects by name or, after placeholder rendering,
/// by numeric id. A string made only of digits is treated as an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Id(ResourceId),
    Name(String),
}

impl ProjectRef {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Path segment and whether it must be flagged as a resource name.
    pub fn path_segment(&self) -> (String, bool) {
        match self {
            Self::Id(id) => (id.to_string(), false),
            Self::Name(name) => match name.parse::<ResourceId>() {
                Ok(id) => (id.to_string(), false),
                Err(_) => (name.clone(), true),
            },
        }
    }

    /// The numeric id, if this reference carries one.
    pub fn as_id(&self) -> Option<ResourceId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A repository inside a project. Only its presence matters to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Fixed project roles and their service role ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectRole {
    Admin,
    Developer,
    Guest,
    Maintainer,
}

impl ProjectRole {
    /// All roles in the order a membership document is read.
    pub const ALL: [ProjectRole; 4] = [
        ProjectRole::Admin,
        ProjectRole::Developer,
        ProjectRole::Guest,
        ProjectRole::Maintainer,
    ];

    pub fn id(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::Developer => 2,
            Self::Guest => 3,
            Self::Maintainer => 4,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.id() == id)
    }

    /// Field name used for this role in membership documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Developer => "developer",
            Self::Guest => "guest",
            Self::Maintainer => "maintainer",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of a project (user or group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: ResourceId,
    pub entity_name: String,
    pub role_id: i64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A robot account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub permissions: Vec<RobotPermission>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// One permission grant of a robot account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotPermission {
    /// `*` for system-wide grants, otherwise the project name.
    pub namespace: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Response to a robot creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotCreated {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Which robots a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotScope {
    System,
    Project(ResourceId),
}

impl RobotScope {
    /// Value of the `q` query parameter selecting this scope.
    pub fn query(self) -> String {
        match self {
            Self::System => "Level=system".to_string(),
            Self::Project(id) => format!("Level=project,ProjectID={id}"),
        }
    }
}

/// A webhook policy of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A replication policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A tag retention policy, scoped to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    pub scope: RetentionScope,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "ref")]
    pub reference: ProjectRef,
}

/// The singleton system schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    GarbageCollection,
    PurgeAudit,
}

impl ScheduleKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::GarbageCollection => "system/gc/schedule",
            Self::PurgeAudit => "system/purgeaudit/schedule",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GarbageCollection => f.write_str("garbage-collection schedule"),
            Self::PurgeAudit => f.write_str("purge-job schedule"),
        }
    }
}
