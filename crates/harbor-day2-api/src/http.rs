//! `RegistryClient` over the Harbor v2.0 HTTP API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::RegistryClient;
use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::models::{
    Document, Health, Project, ProjectMember, ProjectRef, ProjectRequest, ProjectRole, Registry,
    ReplicationPolicy, Repository, ResourceId, RetentionPolicy, Robot, RobotCreated, RobotScope,
    ScheduleKind, User, WebhookPolicy,
};

const API_PREFIX: &str = "api/v2.0";
const RESOURCE_NAME_HEADER: &str = "X-Is-Resource-Name";

/// Basic-auth credentials for the control API.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`HarborClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service origin, e.g. `https://harbor.example.com`.
    pub api_url: String,
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Page size used when listing.
    pub page_size: usize,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            api_url: api_url.into(),
            credentials,
            timeout: Duration::from_secs(100),
            accept_invalid_certs: false,
            page_size: 100,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// HTTP client for the Harbor control API.
pub struct HarborClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    page_size: usize,
}

impl HarborClient {
    /// Builds a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        let base_url = config.api_url.trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
            page_size: config.page_size.max(1),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.api_url(path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Accept", "application/json")
    }

    /// Request against `projects/{project}{suffix}`, flagging name-addressed projects.
    fn project_request(&self, method: Method, project: &ProjectRef, suffix: &str) -> RequestBuilder {
        let (segment, is_name) = project.path_segment();
        let path = format!("projects/{}{}", encode_segment(&segment), suffix);
        let req = self.request(method, &path);
        if is_name {
            req.header(RESOURCE_NAME_HEADER, HeaderValue::from_static("true"))
        } else {
            req
        }
    }

    /// Fetches every page of a listing.
    async fn list_all<T, F>(&self, build: F) -> ApiResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let resp = send(
                build().query(&[("page", page), ("page_size", self.page_size)]),
            )
            .await?;
            let batch: Option<Vec<T>> = decode_body(resp).await?;
            let batch = batch.unwrap_or_default();
            let len = batch.len();
            items.extend(batch);
            if len < self.page_size {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    async fn post_created<B: Serialize + ?Sized>(
        &self,
        req: RequestBuilder,
        body: &B,
    ) -> ApiResult<Option<ResourceId>> {
        let resp = send(req.json(body)).await?;
        Ok(created_id(&resp))
    }
}

/// Percent-encodes a single path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn name_query(name: Option<&str>) -> Vec<(&'static str, String)> {
    name.map(|n| vec![("q", format!("name={n}"))])
        .unwrap_or_default()
}

/// Sends a request and turns non-success statuses into [`ApiError`].
async fn send(req: RequestBuilder) -> ApiResult<Response> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.summary())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                body
            }
        });
    tracing::debug!(status = status.as_u16(), %message, "Control API request failed");
    Err(ApiError::from_status(status.as_u16(), message))
}

/// Decodes a JSON body, mapping an empty body to `None`.
async fn decode_body<T: DeserializeOwned>(resp: Response) -> ApiResult<Option<T>> {
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str(&body)?)
}

async fn decode_required<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Extracts the id of a created entity from the `Location` header.
fn created_id(resp: &Response) -> Option<ResourceId> {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_location_id)
}

fn parse_location_id(location: &str) -> Option<ResourceId> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|last| last.parse().ok())
}

/// Reads `retention_id` from a project metadata response; the service sends it as a string.
fn parse_retention_id(metadata: &Value) -> Option<ResourceId> {
    match metadata.get("retention_id")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[async_trait]
impl RegistryClient for HarborClient {
    async fn health(&self) -> ApiResult<Health> {
        let resp = send(self.request(Method::GET, "health")).await?;
        decode_required(resp).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        let resp = send(self.request(Method::GET, "users/current")).await?;
        decode_required(resp).await
    }

    async fn set_user_password(
        &self,
        user_id: ResourceId,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let body = json!({
            "old_password": old_password,
            "new_password": new_password,
        });
        send(
            self.request(Method::PUT, &format!("users/{user_id}/password"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn update_configurations(&self, configurations: &Document) -> ApiResult<()> {
        send(self.request(Method::PUT, "configurations").json(configurations)).await?;
        Ok(())
    }

    async fn list_registries(&self, name: Option<&str>) -> ApiResult<Vec<Registry>> {
        let query = name_query(name);
        self.list_all(|| self.request(Method::GET, "registries").query(&query))
            .await
    }

    async fn create_registry(&self, registry: &Registry) -> ApiResult<Option<ResourceId>> {
        self.post_created(self.request(Method::POST, "registries"), registry)
            .await
    }

    async fn update_registry(&self, id: ResourceId, registry: &Registry) -> ApiResult<()> {
        send(
            self.request(Method::PUT, &format!("registries/{id}"))
                .json(registry),
        )
        .await?;
        Ok(())
    }

    async fn delete_registry(&self, id: ResourceId) -> ApiResult<()> {
        send(self.request(Method::DELETE, &format!("registries/{id}"))).await?;
        Ok(())
    }

    async fn list_projects(&self, name: Option<&str>) -> ApiResult<Vec<Project>> {
        let query = name_query(name);
        self.list_all(|| self.request(Method::GET, "projects").query(&query))
            .await
    }

    async fn create_project(&self, project: &ProjectRequest) -> ApiResult<Option<ResourceId>> {
        self.post_created(self.request(Method::POST, "projects"), project)
            .await
    }

    async fn update_project(
        &self,
        project: &ProjectRef,
        request: &ProjectRequest,
    ) -> ApiResult<()> {
        send(self.project_request(Method::PUT, project, "").json(request)).await?;
        Ok(())
    }

    async fn delete_project(&self, project: &ProjectRef) -> ApiResult<()> {
        send(self.project_request(Method::DELETE, project, "")).await?;
        Ok(())
    }

    async fn list_repositories(&self, project: &ProjectRef) -> ApiResult<Vec<Repository>> {
        // The repositories endpoint only accepts project names.
        let name = match project {
            ProjectRef::Name(name) => name.clone(),
            ProjectRef::Id(id) => {
                let resp = send(self.project_request(Method::GET, project, "")).await?;
                let found: Project = decode_required(resp).await?;
                tracing::trace!(project_id = id, name = %found.name, "Resolved project name");
                found.name
            }
        };
        let path = format!("projects/{}/repositories", encode_segment(&name));
        self.list_all(|| self.request(Method::GET, &path)).await
    }

    async fn list_project_members(&self, project: &ProjectRef) -> ApiResult<Vec<ProjectMember>> {
        self.list_all(|| self.project_request(Method::GET, project, "/members"))
            .await
    }

    async fn add_project_member(
        &self,
        project: &ProjectRef,
        username: &str,
        role: ProjectRole,
    ) -> ApiResult<Option<ResourceId>> {
        let body = json!({
            "role_id": role.id(),
            "member_user": { "username": username },
        });
        self.post_created(self.project_request(Method::POST, project, "/members"), &body)
            .await
    }

    async fn update_project_member_role(
        &self,
        project: &ProjectRef,
        member_id: ResourceId,
        role: ProjectRole,
    ) -> ApiResult<()> {
        let body = json!({ "role_id": role.id() });
        send(
            self.project_request(Method::PUT, project, &format!("/members/{member_id}"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn remove_project_member(
        &self,
        project: &ProjectRef,
        member_id: ResourceId,
    ) -> ApiResult<()> {
        send(self.project_request(Method::DELETE, project, &format!("/members/{member_id}")))
            .await?;
        Ok(())
    }

    async fn list_robots(&self, scope: RobotScope) -> ApiResult<Vec<Robot>> {
        let q = scope.query();
        self.list_all(|| self.request(Method::GET, "robots").query(&[("q", &q)]))
            .await
    }

    async fn create_robot(&self, robot: &Robot) -> ApiResult<RobotCreated> {
        let resp = send(self.request(Method::POST, "robots").json(robot)).await?;
        decode_required(resp).await
    }

    async fn update_robot(&self, id: ResourceId, robot: &Robot) -> ApiResult<()> {
        send(self.request(Method::PUT, &format!("robots/{id}")).json(robot)).await?;
        Ok(())
    }

    async fn delete_robot(&self, id: ResourceId) -> ApiResult<()> {
        send(self.request(Method::DELETE, &format!("robots/{id}"))).await?;
        Ok(())
    }

    async fn refresh_robot_secret(&self, id: ResourceId, secret: &str) -> ApiResult<()> {
        send(
            self.request(Method::PATCH, &format!("robots/{id}"))
                .json(&json!({ "secret": secret })),
        )
        .await?;
        Ok(())
    }

    async fn list_webhook_policies(&self, project: &ProjectRef) -> ApiResult<Vec<WebhookPolicy>> {
        self.list_all(|| self.project_request(Method::GET, project, "/webhook/policies"))
            .await
    }

    async fn create_webhook_policy(
        &self,
        project: &ProjectRef,
        policy: &WebhookPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.post_created(
            self.project_request(Method::POST, project, "/webhook/policies"),
            policy,
        )
        .await
    }

    async fn update_webhook_policy(
        &self,
        project: &ProjectRef,
        id: ResourceId,
        policy: &WebhookPolicy,
    ) -> ApiResult<()> {
        send(
            self.project_request(Method::PUT, project, &format!("/webhook/policies/{id}"))
                .json(policy),
        )
        .await?;
        Ok(())
    }

    async fn delete_webhook_policy(&self, project: &ProjectRef, id: ResourceId) -> ApiResult<()> {
        send(self.project_request(Method::DELETE, project, &format!("/webhook/policies/{id}")))
            .await?;
        Ok(())
    }

    async fn list_replication_policies(&self) -> ApiResult<Vec<ReplicationPolicy>> {
        self.list_all(|| self.request(Method::GET, "replication/policies"))
            .await
    }

    async fn create_replication_policy(
        &self,
        policy: &ReplicationPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.post_created(self.request(Method::POST, "replication/policies"), policy)
            .await
    }

    async fn update_replication_policy(
        &self,
        id: ResourceId,
        policy: &ReplicationPolicy,
    ) -> ApiResult<()> {
        send(
            self.request(Method::PUT, &format!("replication/policies/{id}"))
                .json(policy),
        )
        .await?;
        Ok(())
    }

    async fn delete_replication_policy(&self, id: ResourceId) -> ApiResult<()> {
        send(self.request(Method::DELETE, &format!("replication/policies/{id}"))).await?;
        Ok(())
    }

    async fn project_retention_id(&self, project: &ProjectRef) -> ApiResult<ResourceId> {
        let resp = send(self.project_request(
            Method::GET,
            project,
            "/metadatas/retention_id",
        ))
        .await?;
        let metadata: Option<Value> = decode_body(resp).await?;
        metadata
            .as_ref()
            .and_then(parse_retention_id)
            .ok_or_else(|| ApiError::not_found(format!("project {project} has no retention policy")))
    }

    async fn create_retention_policy(
        &self,
        policy: &RetentionPolicy,
    ) -> ApiResult<Option<ResourceId>> {
        self.post_created(self.request(Method::POST, "retentions"), policy)
            .await
    }

    async fn update_retention_policy(
        &self,
        id: ResourceId,
        policy: &RetentionPolicy,
    ) -> ApiResult<()> {
        send(self.request(Method::PUT, &format!("retentions/{id}")).json(policy)).await?;
        Ok(())
    }

    async fn get_schedule(&self, kind: ScheduleKind) -> ApiResult<Document> {
        let resp = send(self.request(Method::GET, kind.path())).await?;
        let schedule: Option<Document> = decode_body(resp).await?;
        schedule.ok_or_else(|| ApiError::not_found(format!("no {kind} configured")))
    }

    async fn create_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()> {
        send(self.request(Method::POST, kind.path()).json(schedule)).await?;
        Ok(())
    }

    async fn update_schedule(&self, kind: ScheduleKind, schedule: &Document) -> ApiResult<()> {
        send(self.request(Method::PUT, kind.path()).json(schedule)).await?;
        Ok(())
    }
}
