use async_trait::async_trait;
use harbor_day2_api::{ApiResult, Project, ProjectRef, ProjectRequest, RegistryClient};
use tracing::debug;

use crate::engine::KindAdapter;
use crate::kind::ResourceKind;

/// Projects keyed by name. Only empty projects are deleted.
pub struct ProjectAdapter<'a> {
    client: &'a dyn RegistryClient,
}

impl<'a> ProjectAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self { client }
    }
}

fn reference(project: &Project) -> ProjectRef {
    match project.project_id {
        Some(id) => ProjectRef::Id(id),
        None => ProjectRef::name(project.name.as_str()),
    }
}

#[async_trait]
impl<'a> KindAdapter for ProjectAdapter<'a> {
    type Desired = ProjectRequest;
    type Observed = Project;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Project
    }

    fn desired_key(&self, desired: &ProjectRequest) -> String {
        desired.project_name.clone()
    }

    fn observed_key(&self, observed: &Project) -> String {
        observed.name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<Project>> {
        self.client.list_projects(None).await
    }

    async fn create(&self, desired: &ProjectRequest) -> ApiResult<()> {
        self.client.create_project(desired).await.map(|_| ())
    }

    async fn update(&self, observed: &Project, desired: &ProjectRequest) -> ApiResult<()> {
        self.client.update_project(&reference(observed), desired).await
    }

    async fn delete(&self, observed: &Project) -> ApiResult<()> {
        self.client.delete_project(&reference(observed)).await
    }

    async fn can_delete(&self, observed: &Project) -> ApiResult<bool> {
        let repositories = self.client.list_repositories(&reference(observed)).await?;
        debug!(project = %observed.name, repositories = repositories.len(), "Checked project contents");
        Ok(repositories.is_empty())
    }
}
