use async_trait::async_trait;
use harbor_day2_api::{ApiResult, Registry, RegistryClient};

use super::require_id;
use crate::engine::{KindAdapter, UpdatePlan};
use crate::kind::ResourceKind;

/// Registries keyed by name. A changed provider type cannot be updated in
/// place, so it is recreated.
pub struct RegistryAdapter<'a> {
    client: &'a dyn RegistryClient,
}

impl<'a> RegistryAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a> KindAdapter for RegistryAdapter<'a> {
    type Desired = Registry;
    type Observed = Registry;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Registry
    }

    fn desired_key(&self, desired: &Registry) -> String {
        desired.name.clone()
    }

    fn observed_key(&self, observed: &Registry) -> String {
        observed.name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<Registry>> {
        self.client.list_registries(None).await
    }

    async fn create(&self, desired: &Registry) -> ApiResult<()> {
        self.client.create_registry(desired).await.map(|_| ())
    }

    async fn update(&self, observed: &Registry, desired: &Registry) -> ApiResult<()> {
        let id = require_id(observed.id, "registry", &observed.name)?;
        self.client.update_registry(id, desired).await
    }

    async fn delete(&self, observed: &Registry) -> ApiResult<()> {
        let id = require_id(observed.id, "registry", &observed.name)?;
        self.client.delete_registry(id).await
    }

    fn plan_update(&self, observed: &Registry, desired: &Registry) -> UpdatePlan {
        match (&observed.registry_type, &desired.registry_type) {
            (Some(current), Some(wanted)) if current != wanted => UpdatePlan::Recreate,
            _ => UpdatePlan::Update,
        }
    }
}
