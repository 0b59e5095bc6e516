use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use harbor_day2_api::{
    ApiError, ApiResult, Document, Health, Project, ProjectMember, ProjectRef, ProjectRequest,
    ProjectRole, Registry, RegistryClient, ReplicationPolicy, Repository, ResourceId,
    RetentionPolicy, Robot, RobotCreated, RobotPermission, RobotScope, ScheduleKind, User,
    WebhookPolicy,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::journal::{Action, Call, Failure, InjectedFailure};

struct ProjectRecord {
    project: Project,
    repositories: Vec<String>,
    retention_id: Option<ResourceId>,
    members: Vec<ProjectMember>,
    webhooks: Vec<WebhookPolicy>,
}

struct RobotRecord {
    robot: Robot,
    project_id: Option<ResourceId>,
    secret: String,
}

struct State {
    next_id: ResourceId,
    health: String,
    admin: User,
    admin_password: String,
    users: BTreeSet<String>,
    robot_prefix: String,
    registries: Vec<Registry>,
    projects: Vec<ProjectRecord>,
    robots: Vec<RobotRecord>,
    replications: Vec<ReplicationPolicy>,
    retentions: Vec<RetentionPolicy>,
    schedules: HashMap<ScheduleKind, Document>,
    configurations: Document,
    journal: Vec<Call>,
    failures: Vec<InjectedFailure>,
}

impl State {
    fn new() -> Self {
        Self {
            next_id: 1,
            health: "healthy".to_string(),
            admin: User {
                user_id: 1,
                username: "admin".to_string(),
                attributes: Map::new(),
            },
            admin_password: "Harbor12345".to_string(),
            users: BTreeSet::from(["admin".to_string()]),
            robot_prefix: "robot$".to_string(),
            registries: Vec::new(),
            projects: Vec::new(),
            robots: Vec::new(),
            replications: Vec::new(),
            retentions: Vec::new(),
            schedules: HashMap::new(),
            configurations: Map::new(),
            journal: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn next_id(&mut self) -> ResourceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn project_index(&self, project: &ProjectRef) -> Option<usize> {
        self.projects.iter().position(|p| match project.as_id() {
            Some(id) => p.project.project_id == Some(id),
            None => p.project.name == project.to_string(),
        })
    }

    fn project_mut(&mut self, project: &ProjectRef) -> ApiResult<&mut ProjectRecord> {
        match self.project_index(project) {
            Some(idx) => Ok(&mut self.projects[idx]),
            None => Err(ApiError::not_found(format!("project {project} not found"))),
        }
    }

    fn project(&self, project: &ProjectRef) -> ApiResult<&ProjectRecord> {
        self.project_index(project)
            .map(|idx| &self.projects[idx])
            .ok_or_else(|| ApiError::not_found(format!("project {project} not found")))
    }

    /// Service-side robot name: prefix, then `namespace+` for project robots.
    fn stored_robot_name(&self, robot: &Robot) -> String {
        match robot.permissions.first().map(|p| p.namespace.as_str()) {
            Some(ns) if ns != "*" => format!("{}{}+{}", self.robot_prefix, ns, robot.name),
            _ => format!("{}{}", self.robot_prefix, robot.name),
        }
    }
}

/// An in-memory registry service.
///
/// Cloning yields another handle onto the same state. A handle created with
/// [`MemoryRegistry::login`] carries a password that `current_user` checks
/// against the admin password; the default handle is always authenticated.
#[derive(Clone)]
pub struct MemoryRegistry {
    state: Arc<Mutex<State>>,
    password: Option<String>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
            password: None,
        }
    }

    /// Uses `prefix` for service-side robot names (default `robot$`).
    #[must_use]
    pub fn with_robot_prefix(self, prefix: impl Into<String>) -> Self {
        self.state.lock().robot_prefix = prefix.into();
        self
    }

    /// Sets the admin password the service currently accepts.
    #[must_use]
    pub fn with_admin_password(self, password: impl Into<String>) -> Self {
        self.state.lock().admin_password = password.into();
        self
    }

    /// Returns a handle on the same state that authenticates with `password`.
    pub fn login(&self, password: impl Into<String>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            password: Some(password.into()),
        }
    }

    // ==================== Seeding ====================

    pub fn set_health(&self, status: impl Into<String>) {
        self.state.lock().health = status.into();
    }

    pub fn add_user(&self, username: impl Into<String>) {
        self.state.lock().users.insert(username.into());
    }

    pub fn add_registry(&self, name: &str, registry_type: &str) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.registries.push(Registry {
            id: Some(id),
            name: name.to_string(),
            registry_type: Some(registry_type.to_string()),
            attributes: Map::new(),
        });
        id
    }

    pub fn add_project(&self, name: &str) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.projects.push(ProjectRecord {
            project: Project {
                project_id: Some(id),
                name: name.to_string(),
                attributes: Map::new(),
            },
            repositories: Vec::new(),
            retention_id: None,
            members: Vec::new(),
            webhooks: Vec::new(),
        });
        id
    }

    /// Pushes a repository into a project, making it non-empty.
    pub fn add_repository(&self, project: &str, repository: &str) {
        let mut state = self.state.lock();
        if let Ok(record) = state.project_mut(&ProjectRef::name(project)) {
            record.repositories.push(repository.to_string());
        }
    }

    pub fn add_member(&self, project: &str, username: &str, role: ProjectRole) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.users.insert(username.to_string());
        if let Ok(record) = state.project_mut(&ProjectRef::name(project)) {
            record.members.push(ProjectMember {
                id,
                entity_name: username.to_string(),
                role_id: role.id(),
                attributes: Map::new(),
            });
        }
        id
    }

    /// Seeds a robot under its service-side name.
    pub fn add_robot(&self, full_name: &str, namespace: &str) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        let project_id = if namespace == "*" {
            None
        } else {
            state
                .project(&ProjectRef::name(namespace))
                .ok()
                .and_then(|p| p.project.project_id)
        };
        let robot = Robot {
            id: Some(id),
            name: full_name.to_string(),
            level: Some(if project_id.is_some() { "project" } else { "system" }.to_string()),
            permissions: vec![RobotPermission {
                namespace: namespace.to_string(),
                attributes: Map::new(),
            }],
            attributes: Map::new(),
        };
        state.robots.push(RobotRecord {
            robot,
            project_id,
            secret: format!("generated-{id}"),
        });
        id
    }

    pub fn add_webhook_policy(&self, project: &str, name: &str) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        if let Ok(record) = state.project_mut(&ProjectRef::name(project)) {
            record.webhooks.push(WebhookPolicy {
                id: Some(id),
                name: name.to_string(),
                attributes: Map::new(),
            });
        }
        id
    }

    pub fn add_replication_policy(&self, name: &str) -> ResourceId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.replications.push(ReplicationPolicy {
            id: Some(id),
            name: name.to_string(),
            attributes: Map::new(),
        });
        id
    }

    pub fn set_schedule(&self, kind: ScheduleKind, schedule: Document) {
        self.state.lock().schedules.insert(kind, schedule);
    }

    /// Makes every call matching `action`, `resource` and `key` fail.
    pub fn fail(&self, action: Action, resource: &'static str, key: &str, failure: Failure) {
        self.state.lock().failures.push(InjectedFailure {
            action,
            resource,
            key: key.to_string(),
            failure,
        });
    }

    // ==================== Inspection ====================

    pub fn registries(&self) -> Vec<Registry> {
        self.state.lock().registries.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state
            .lock()
            .projects
            .iter()
            .map(|p| p.project.clone())
            .collect()
    }

    pub fn members(&self, project: &str) -> Vec<ProjectMember> {
        self.state
            .lock()
            .project(&ProjectRef::name(project))
            .map(|p| p.members.clone())
            .unwrap_or_default()
    }

    pub fn robots(&self) -> Vec<Robot> {
        self.state
            .lock()
            .robots
            .iter()
            .map(|r| r.robot.clone())
            .collect()
    }

    pub fn robot_secret(&self, full_name: &str) -> Option<String> {
        self.state
            .lock()
            .robots
            .iter()
            .find(|r| r.robot.name == full_name)
            .map(|r| r.secret.clone())
    }

    pub fn webhook_policies(&self, project: &str) -> Vec<WebhookPolicy> {
        self.state
            .lock()
            .project(&ProjectRef::name(project))
            .map(|p| p.webhooks.clone())
            .unwrap_or_default()
    }

    pub fn replication_policies(&self) -> Vec<ReplicationPolicy> {
        self.state.lock().replications.clone()
    }

    pub fn retention_policies(&self) -> Vec<RetentionPolicy> {
        self.state.lock().retentions.clone()
    }

    pub fn schedule(&self, kind: ScheduleKind) -> Option<Document> {
        self.state.lock().schedules.get(&kind).cloned()
    }

    pub fn configurations(&self) -> Document {
        self.state.lock().configurations.clone()
    }

    pub fn admin_password(&self) -> String {
        self.state.lock().admin_password.clone()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().journal.clone()
    }

    /// Only the calls that changed state.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.action.is_mutation())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().journal.clear();
    }

    /// Journals a call and returns an injected failure if one matches.
    fn record(&self, action: Action, resource: &'static str, key: impl Into<String>) -> ApiResult<()> {
        let call = Call::new(action, resource, key);
        let mut state = self.state.lock();
        let injected = state
            .failures
            .iter()
            .find(|f| f.matches(&call))
            .map(|f| f.failure);
        let result = match injected {
            Some(failure) => Err(failure.to_error(&call)),
            None => Ok(()),
        };
        state.journal.push(call);
        result
    }
}

fn matches_name(filter: Option<&str>, name: &str) -> bool {
    filter.is_none_or(|f| f == name)
}

fn project_key(project: &ProjectRef, name: &str) -> String {
    format!("{project}/{name}")
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn health(&self) -> ApiResult<Health> {
        self.record(Action::Get, "health", "")?;
        Ok(Health {
            status: self.state.lock().health.clone(),
            components: Vec::new(),
        })
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.record(Action::Get, "user", "current")?;
        let state = self.state.lock();
        match &self.password {
            Some(password) if *password != state.admin_password => {
                Err(ApiError::unauthorized("invalid credentials"))
            }
            _ => Ok(state.admin.clone()),
        }
    }

    async fn set_user_password(
        &self,
        user_id: ResourceId,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        self.record(Action::SetPassword, "user", user_id.to_string())?;
        let mut state = self.state.lock();
        if user_id != state.admin.user_id {
            return Err(ApiError::not_found(format!("user {user_id} not found")));
        }
        if old_password != state.admin_password {
            return Err(ApiError::bad_request("old password is incorrect"));
        }
        state.admin_password = new_password.to_string();
        Ok(())
    }

    async fn update_configurations(&self, configurations: &Document) -> ApiResult<()> {
        self.record(Action::Configure, "configurations", "")?;
        let mut state = self.state.lock();
        for (key, value) in configurations {
            state.configurations.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn list_registries(&self, name: Option<&str>) -> ApiResult<Vec<Registry>> {
        self.record(Action::List, "registry", name.unwrap_or_default())?;
        Ok(self
            .state
            .lock()
            .registries
            .iter()
            .filter(|r| matches_name(name, &r.name))
            .cloned()
            .collect())
    }

    async fn create_registry(&self, registry: &Registry) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "registry", &registry.name)?;
        let mut state = self.state.lock();
        if state.registries.iter().any(|r| r.name == registry.name) {
            return Err(ApiError::conflict(format!("registry {} exists", registry.name)));
        }
        let id = state.next_id();
        let mut stored = registry.clone();
        stored.id = Some(id);
        state.registries.push(stored);
        Ok(Some(id))
    }

    async fn update_registry(&self, id: ResourceId, registry: &Registry) -> ApiResult<()> {
        self.record(Action::Update, "registry", &registry.name)?;
        let mut state = self.state.lock();
        let existing = state
            .registries
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("registry {id} not found")))?;
        if registry.registry_type.is_some() && registry.registry_type != existing.registry_type {
            return Err(ApiError::bad_request("registry type cannot be changed"));
        }
        existing.name = registry.name.clone();
        existing.attributes = registry.attributes.clone();
        Ok(())
    }

    async fn delete_registry(&self, id: ResourceId) -> ApiResult<()> {
        let name = self
            .state
            .lock()
            .registries
            .iter()
            .find(|r| r.id == Some(id))
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.to_string());
        self.record(Action::Delete, "registry", name)?;
        let mut state = self.state.lock();
        let before = state.registries.len();
        state.registries.retain(|r| r.id != Some(id));
        if state.registries.len() == before {
            return Err(ApiError::not_found(format!("registry {id} not found")));
        }
        Ok(())
    }

    async fn list_projects(&self, name: Option<&str>) -> ApiResult<Vec<Project>> {
        self.record(Action::List, "project", name.unwrap_or_default())?;
        Ok(self
            .state
            .lock()
            .projects
            .iter()
            .filter(|p| matches_name(name, &p.project.name))
            .map(|p| p.project.clone())
            .collect())
    }

    async fn create_project(&self, project: &ProjectRequest) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "project", &project.project_name)?;
        let mut state = self.state.lock();
        if state
            .projects
            .iter()
            .any(|p| p.project.name == project.project_name)
        {
            return Err(ApiError::conflict(format!(
                "project {} exists",
                project.project_name
            )));
        }
        let id = state.next_id();
        state.projects.push(ProjectRecord {
            project: Project {
                project_id: Some(id),
                name: project.project_name.clone(),
                attributes: project.attributes.clone(),
            },
            repositories: Vec::new(),
            retention_id: None,
            members: Vec::new(),
            webhooks: Vec::new(),
        });
        Ok(Some(id))
    }

    async fn update_project(
        &self,
        project: &ProjectRef,
        request: &ProjectRequest,
    ) -> ApiResult<()> {
        self.record(Action::Update, "project", project.to_string())?;
        let mut state = self.state.lock();
        let record = state.project_mut(project)?;
        record.project.attributes = request.attributes.clone();
        Ok(())
    }

    async fn delete_project(&self, project: &ProjectRef) -> ApiResult<()> {
        self.record(Action::Delete, "project", project.to_string())?;
        let mut state = self.state.lock();
        let idx = state
            .project_index(project)
            .ok_or_else(|| ApiError::not_found(format!("project {project} not found")))?;
        if !state.projects[idx].repositories.is_empty() {
            return Err(ApiError::from_status(
                412,
                format!("project {project} contains repositories"),
            ));
        }
        state.projects.remove(idx);
        Ok(())
    }

    async fn list_repositories(&self, project: &ProjectRef) -> ApiResult<Vec<Repository>> {
        self.record(Action::List, "repository", project.to_string())?;
        let state = self.state.lock();
        let record = state.project(project)?;
        Ok(record
            .repositories
            .iter()
            .map(|name| Repository {
                id: None,
                name: format!("{}/{}", record.project.name, name),
                attributes: Map::new(),
            })
            .collect())
    }

    async fn list_project_members(&self, project: &ProjectRef) -> ApiResult<Vec<ProjectMember>> {
        self.record(Action::List, "member", project.to_string())?;
        Ok(self.state.lock().project(project)?.members.clone())
    }

    async fn add_project_member(
        &self,
        project: &ProjectRef,
        username: &str,
        role: ProjectRole,
    ) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "member", project_key(project, username))?;
        let mut state = self.state.lock();
        if !state.users.contains(username) {
            return Err(ApiError::not_found(format!("user {username} not found")));
        }
        let id = state.next_id();
        let record = state.project_mut(project)?;
        if record.members.iter().any(|m| m.entity_name == username) {
            return Err(ApiError::conflict(format!("{username} is already a member")));
        }
        record.members.push(ProjectMember {
            id,
            entity_name: username.to_string(),
            role_id: role.id(),
            attributes: Map::new(),
        });
        Ok(Some(id))
    }

    async fn update_project_member_role(
        &self,
        project: &ProjectRef,
        member_id: ResourceId,
        role: ProjectRole,
    ) -> ApiResult<()> {
        let username = self.member_name(project, member_id);
        self.record(Action::Update, "member", project_key(project, &username))?;
        let mut state = self.state.lock();
        let member = state
            .project_mut(project)?
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| ApiError::not_found(format!("member {member_id} not found")))?;
        member.role_id = role.id();
        Ok(())
    }

    async fn remove_project_member(
        &self,
        project: &ProjectRef,
        member_id: ResourceId,
    ) -> ApiResult<()> {
        let username = self.member_name(project, member_id);
        self.record(Action::Delete, "member", project_key(project, &username))?;
        let mut state = self.state.lock();
        let record = state.project_mut(project)?;
        let before = record.members.len();
        record.members.retain(|m| m.id != member_id);
        if record.members.len() == before {
            return Err(ApiError::not_found(format!("member {member_id} not found")));
        }
        Ok(())
    }

    async fn list_robots(&self, scope: RobotScope) -> ApiResult<Vec<Robot>> {
        self.record(Action::List, "robot", scope.query())?;
        let state = self.state.lock();
        Ok(state
            .robots
            .iter()
            .filter(|r| match scope {
                RobotScope::System => r.project_id.is_none(),
                RobotScope::Project(id) => r.project_id == Some(id),
            })
            .map(|r| r.robot.clone())
            .collect())
    }

    async fn create_robot(&self, robot: &Robot) -> ApiResult<RobotCreated> {
        let full_name = self.state.lock().stored_robot_name(robot);
        self.record(Action::Create, "robot", &full_name)?;
        let mut state = self.state.lock();
        if robot.permissions.is_empty() {
            return Err(ApiError::bad_request("robot needs at least one permission"));
        }
        if state.robots.iter().any(|r| r.robot.name == full_name) {
            return Err(ApiError::conflict(format!("robot {full_name} exists")));
        }
        let namespace = robot.permissions[0].namespace.clone();
        let project_id = if namespace == "*" {
            None
        } else {
            let project = state
                .project(&ProjectRef::name(namespace.as_str()))
                .map_err(|_| ApiError::bad_request(format!("unknown project {namespace}")))?;
            project.project.project_id
        };
        let id = state.next_id();
        let mut stored = robot.clone();
        stored.id = Some(id);
        stored.name = full_name.clone();
        stored.level = Some(if project_id.is_some() { "project" } else { "system" }.to_string());
        let secret = format!("generated-{id}");
        state.robots.push(RobotRecord {
            robot: stored,
            project_id,
            secret: secret.clone(),
        });
        Ok(RobotCreated {
            id,
            name: full_name,
            secret: Some(secret),
        })
    }

    async fn update_robot(&self, id: ResourceId, robot: &Robot) -> ApiResult<()> {
        self.record(Action::Update, "robot", &robot.name)?;
        let mut state = self.state.lock();
        let record = state
            .robots
            .iter_mut()
            .find(|r| r.robot.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("robot {id} not found")))?;
        if record.robot.name != robot.name {
            return Err(ApiError::bad_request(format!(
                "robot name {} does not match {}",
                robot.name, record.robot.name
            )));
        }
        record.robot.permissions = robot.permissions.clone();
        record.robot.attributes = robot.attributes.clone();
        Ok(())
    }

    async fn delete_robot(&self, id: ResourceId) -> ApiResult<()> {
        let name = self.robot_name(id);
        self.record(Action::Delete, "robot", name)?;
        let mut state = self.state.lock();
        let before = state.robots.len();
        state.robots.retain(|r| r.robot.id != Some(id));
        if state.robots.len() == before {
            return Err(ApiError::not_found(format!("robot {id} not found")));
        }
        Ok(())
    }

    async fn refresh_robot_secret(&self, id: ResourceId, secret: &str) -> ApiResult<()> {
        let name = self.robot_name(id);
        self.record(Action::RefreshSecret, "robot", name)?;
        let mut state = self.state.lock();
        let record = state
            .robots
            .iter_mut()
            .find(|r| r.robot.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("robot {id} not found")))?;
        record.secret = secret.to_string();
        Ok(())
    }

    async fn list_webhook_policies(&self, project: &ProjectRef) -> ApiResult<Vec<WebhookPolicy>> {
        self.record(Action::List, "webhook", project.to_string())?;
        Ok(self.state.lock().project(project)?.webhooks.clone())
    }

    async fn create_webhook_policy(
        &self,
        project: &ProjectRef,
        policy: &WebhookPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "webhook", project_key(project, &policy.name))?;
        let mut state = self.state.lock();
        let id = state.next_id();
        let record = state.project_mut(project)?;
        if record.webhooks.iter().any(|w| w.name == policy.name) {
            return Err(ApiError::conflict(format!("webhook {} exists", policy.name)));
        }
        let mut stored = policy.clone();
        stored.id = Some(id);
        record.webhooks.push(stored);
        Ok(Some(id))
    }

    async fn update_webhook_policy(
        &self,
        project: &ProjectRef,
        id: ResourceId,
        policy: &WebhookPolicy,
    ) -> ApiResult<()> {
        self.record(Action::Update, "webhook", project_key(project, &policy.name))?;
        let mut state = self.state.lock();
        let existing = state
            .project_mut(project)?
            .webhooks
            .iter_mut()
            .find(|w| w.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("webhook {id} not found")))?;
        existing.name = policy.name.clone();
        existing.attributes = policy.attributes.clone();
        Ok(())
    }

    async fn delete_webhook_policy(&self, project: &ProjectRef, id: ResourceId) -> ApiResult<()> {
        let name = {
            let state = self.state.lock();
            state
                .project(project)
                .ok()
                .and_then(|p| p.webhooks.iter().find(|w| w.id == Some(id)))
                .map(|w| w.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        self.record(Action::Delete, "webhook", project_key(project, &name))?;
        let mut state = self.state.lock();
        let record = state.project_mut(project)?;
        let before = record.webhooks.len();
        record.webhooks.retain(|w| w.id != Some(id));
        if record.webhooks.len() == before {
            return Err(ApiError::not_found(format!("webhook {id} not found")));
        }
        Ok(())
    }

    async fn list_replication_policies(&self) -> ApiResult<Vec<ReplicationPolicy>> {
        self.record(Action::List, "replication", "")?;
        Ok(self.state.lock().replications.clone())
    }

    async fn create_replication_policy(
        &self,
        policy: &ReplicationPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "replication", &policy.name)?;
        let mut state = self.state.lock();
        if state.replications.iter().any(|r| r.name == policy.name) {
            return Err(ApiError::conflict(format!("replication {} exists", policy.name)));
        }
        let id = state.next_id();
        let mut stored = policy.clone();
        stored.id = Some(id);
        state.replications.push(stored);
        Ok(Some(id))
    }

    async fn update_replication_policy(
        &self,
        id: ResourceId,
        policy: &ReplicationPolicy,
    ) -> ApiResult<()> {
        self.record(Action::Update, "replication", &policy.name)?;
        let mut state = self.state.lock();
        let existing = state
            .replications
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("replication {id} not found")))?;
        existing.name = policy.name.clone();
        existing.attributes = policy.attributes.clone();
        Ok(())
    }

    async fn delete_replication_policy(&self, id: ResourceId) -> ApiResult<()> {
        let name = self
            .state
            .lock()
            .replications
            .iter()
            .find(|r| r.id == Some(id))
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.to_string());
        self.record(Action::Delete, "replication", name)?;
        let mut state = self.state.lock();
        let before = state.replications.len();
        state.replications.retain(|r| r.id != Some(id));
        if state.replications.len() == before {
            return Err(ApiError::not_found(format!("replication {id} not found")));
        }
        Ok(())
    }

    async fn project_retention_id(&self, project: &ProjectRef) -> ApiResult<ResourceId> {
        self.record(Action::Get, "retention", project.to_string())?;
        self.state
            .lock()
            .project(project)?
            .retention_id
            .ok_or_else(|| ApiError::not_found(format!("project {project} has no retention policy")))
    }

    async fn create_retention_policy(
        &self,
        policy: &RetentionPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.record(Action::Create, "retention", policy.scope.reference.to_string())?;
        let mut state = self.state.lock();
        let id = state.next_id();
        let record = state.project_mut(&policy.scope.reference)?;
        if record.retention_id.is_some() {
            return Err(ApiError::conflict(format!(
                "project {} already has a retention policy",
                policy.scope.reference
            )));
        }
        record.retention_id = Some(id);
        let mut stored = policy.clone();
        stored.id = Some(id);
        state.retentions.push(stored);
        Ok(Some(id))
    }

    async fn update_retention_policy(
        &self,
        id: ResourceId,
        policy: &RetentionPolicy,
    ) -> ApiResult<()> {
        self.record(Action::Update, "retention", policy.scope.reference.to_string())?;
        let mut state = self.state.lock();
        let existing = state
            .retentions
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| ApiError::not_found(format!("retention {id} not found")))?;
        let mut stored = policy.clone();
        stored.id = Some(id);
        *existing = stored;
        Ok(())
    }

    async fn get_schedule(&self, kind: ScheduleKind) -> ApiResult<Document> {
        self.record(Action::Get, "schedule", kind.path())?;
        self.state
            .lock()
            .schedules
            .get(&kind)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("no {kind} configured")))
    }

    async fn create_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()> {
        self.record(Action::Create, "schedule", kind.path())?;
        let mut state = self.state.lock();
        if state.schedules.contains_key(&kind) {
            return Err(ApiError::conflict(format!("{kind} exists")));
        }
        state.schedules.insert(kind, schedule.clone());
        Ok(())
    }

    async fn update_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()> {
        self.record(Action::Update, "schedule", kind.path())?;
        let mut state = self.state.lock();
        match state.schedules.get_mut(&kind) {
            Some(existing) => {
                *existing = schedule.clone();
                Ok(())
            }
            None => Err(ApiError::not_found(format!("no {kind} configured"))),
        }
    }
}

impl MemoryRegistry {
    fn member_name(&self, project: &ProjectRef, member_id: ResourceId) -> String {
        let state = self.state.lock();
        state
            .project(project)
            .ok()
            .and_then(|p| p.members.iter().find(|m| m.id == member_id))
            .map(|m| m.entity_name.clone())
            .unwrap_or_else(|| member_id.to_string())
    }

    fn robot_name(&self, id: ResourceId) -> String {
        self.state
            .lock()
            .robots
            .iter()
            .find(|r| r.robot.id == Some(id))
            .map(|r| r.robot.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Reads a document out of a JSON literal, for seeding schedules in tests.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
