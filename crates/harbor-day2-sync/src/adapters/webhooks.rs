use async_trait::async_trait;
use harbor_day2_api::{ApiResult, ProjectRef, RegistryClient, WebhookPolicy};
use serde::{Deserialize, Serialize};

use super::require_id;
use crate::engine::{KindAdapter, ReconcileResult, sync};
use crate::error::SyncResult;
use crate::kind::ResourceKind;

/// Webhook policies declared for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWebhooks {
    pub project_name: String,
    #[serde(default)]
    pub policies: Vec<WebhookPolicy>,
}

/// Webhook policies of one project, keyed by policy name.
pub struct WebhookAdapter<'a> {
    client: &'a dyn RegistryClient,
    project: ProjectRef,
    scope: String,
}

impl<'a> WebhookAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient, project: ProjectRef) -> Self {
        let scope = project.to_string();
        Self {
            client,
            project,
            scope,
        }
    }
}

#[async_trait]
impl<'a> KindAdapter for WebhookAdapter<'a> {
    type Desired = WebhookPolicy;
    type Observed = WebhookPolicy;

    fn kind(&self) -> ResourceKind {
        ResourceKind::WebhookPolicy
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn desired_key(&self, desired: &WebhookPolicy) -> String {
        desired.name.clone()
    }

    fn observed_key(&self, observed: &WebhookPolicy) -> String {
        observed.name.clone()
    }

    async fn list(&self) -> ApiResult<Vec<WebhookPolicy>> {
        self.client.list_webhook_policies(&self.project).await
    }

    async fn create(&self, desired: &WebhookPolicy) -> ApiResult<()> {
        self.client
            .create_webhook_policy(&self.project, desired)
            .await
            .map(|_| ())
    }

    async fn update(&self, observed: &WebhookPolicy, desired: &WebhookPolicy) -> ApiResult<()> {
        let id = require_id(observed.id, "webhook policy", &observed.name)?;
        self.client
            .update_webhook_policy(&self.project, id, desired)
            .await
    }

    async fn delete(&self, observed: &WebhookPolicy) -> ApiResult<()> {
        let id = require_id(observed.id, "webhook policy", &observed.name)?;
        self.client.delete_webhook_policy(&self.project, id).await
    }
}

/// Reconciles the webhook policies of every project listed in `projects`.
///
/// Projects absent from the document keep their policies.
pub async fn sync_webhooks(
    client: &dyn RegistryClient,
    projects: &[ProjectWebhooks],
) -> SyncResult<ReconcileResult> {
    let mut result = ReconcileResult::default();
    for project in projects {
        let adapter = WebhookAdapter::new(client, ProjectRef::name(project.project_name.as_str()));
        result.merge(sync(&adapter, &project.policies).await?);
    }
    Ok(result)
}
