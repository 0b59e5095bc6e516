use async_trait::async_trait;
use harbor_day2_api::{ApiResult, RegistryClient, ResourceId, RetentionPolicy};

use crate::engine::{Existence, UpsertAdapter};
use crate::kind::ResourceKind;

/// Tag retention policies, one per project, addressed by `scope.ref`.
///
/// Policies are never deleted: a project dropped from the document keeps
/// its policy.
pub struct RetentionAdapter<'a> {
    client: &'a dyn RegistryClient,
}

impl<'a> RetentionAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a> UpsertAdapter for RetentionAdapter<'a> {
    type Desired = RetentionPolicy;
    type Handle = ResourceId;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RetentionPolicy
    }

    fn describe(&self, desired: &RetentionPolicy) -> String {
        desired.scope.reference.to_string()
    }

    async fn lookup(&self, desired: &RetentionPolicy) -> ApiResult<Existence<ResourceId>> {
        Existence::from_lookup(self.client.project_retention_id(&desired.scope.reference).await)
    }

    async fn create(&self, desired: &RetentionPolicy) -> ApiResult<()> {
        self.client
            .create_retention_policy(desired)
            .await
            .map(|_| ())
    }

    async fn update(&self, id: &ResourceId, desired: &RetentionPolicy) -> ApiResult<()> {
        let mut policy = desired.clone();
        policy.id = Some(*id);
        self.client.update_retention_policy(*id, &policy).await
    }
}
