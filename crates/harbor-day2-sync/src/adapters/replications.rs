use async_trait::async_trait;
use harbor_day2_api::{ApiResult, RegistryClient, ReplicationPolicy};

use super::require_id;
use crate::engine::KindAdapter;
use crate::kind::ResourceKind;

/// Replication policies keyed by name.
pub struct ReplicationAdapter<'a> {
    client: &'a dyn RegistryClient,
}

impl<'a> ReplicationAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a> KindAdapter for ReplicationAdapter<'a> {
    type Desired = ReplicationPolicy;
    type Observed = ReplicationPolicy;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ReplicationPolicy
    }

    fn desired_key(&self, desired: &ReplicationPolicy) -> String {
        desired.name.clone()
    }

    fn observed_key(&self, observed: &ReplicationPolicy) -> String {
        observed.name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<ReplicationPolicy>> {
        self.client.list_replication_policies().await
    }

    async fn create(&self, desired: &ReplicationPolicy) -> ApiResult<()> {
        self.client
            .create_replication_policy(desired)
            .await
            .map(|_| ())
    }

    async fn update(&self, observed: &ReplicationPolicy, desired: &ReplicationPolicy) -> ApiResult<()> {
        let id = require_id(observed.id, "replication policy", &observed.name)?;
        self.client.update_replication_policy(id, desired).await
    }

    async fn delete(&self, observed: &ReplicationPolicy) -> ApiResult<()> {
        let id = require_id(observed.id, "replication policy", &observed.name)?;
        self.client.delete_replication_policy(id).await
    }
}
