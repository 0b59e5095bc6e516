//! Sequencing of a full synchronization run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use harbor_day2_api::{
    Document, ProjectRequest, Registry, RegistryClient, ReplicationPolicy, RetentionPolicy,
    ScheduleKind,
};
use harbor_day2_sync::adapters::{
    DesiredRobot, ProjectAdapter, ProjectMembership, ProjectWebhooks, RegistryAdapter,
    ReplicationAdapter, RetentionAdapter, RobotAdapter, RobotNaming, RobotSecrets,
    sync_project_members, sync_schedule, sync_webhooks,
};
use harbor_day2_sync::{DocumentLoader, ReconcileResult, ResourceKind, sync, upsert};
use tracing::{Instrument, info, info_span};

use crate::config::{AppConfig, OidcSettings};
use crate::configurations::sync_configurations;
use crate::credentials::{PasswordSync, sync_admin_password};
use crate::health::wait_until_healthy;

/// Outcome of one run, per kind in application order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub password: Option<PasswordSync>,
    pub kinds: Vec<(ResourceKind, ReconcileResult)>,
    /// Kinds whose document was absent.
    pub skipped: Vec<ResourceKind>,
}

impl RunSummary {
    pub fn result(&self, kind: ResourceKind) -> Option<&ReconcileResult> {
        self.kinds.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, result) in &self.kinds {
            writeln!(f, "{kind}: {result}")?;
        }
        for kind in &self.skipped {
            writeln!(f, "{kind}: no document")?;
        }
        Ok(())
    }
}

/// Drives one synchronization run against a registry.
pub struct Operator<'a> {
    client: &'a dyn RegistryClient,
    /// Client authenticated with the previous admin password, if any.
    previous: Option<&'a dyn RegistryClient>,
    folder: PathBuf,
    admin_password: String,
    old_admin_password: Option<String>,
    naming: RobotNaming,
    secrets: RobotSecrets,
    oidc: OidcSettings,
    health_poll_interval: Duration,
}

impl<'a> Operator<'a> {
    pub fn new(cfg: &AppConfig, client: &'a dyn RegistryClient) -> Self {
        Self {
            client,
            previous: None,
            folder: cfg.config_folder(),
            admin_password: cfg.admin.password.clone().unwrap_or_default(),
            old_admin_password: cfg.admin.old_password.clone(),
            naming: RobotNaming::new(cfg.sync.robot_prefix.clone()),
            secrets: RobotSecrets::default(),
            oidc: cfg.oidc.clone(),
            health_poll_interval: cfg.health_poll_interval(),
        }
    }

    #[must_use]
    pub fn with_previous_client(mut self, previous: &'a dyn RegistryClient) -> Self {
        self.previous = Some(previous);
        self
    }

    #[must_use]
    pub fn with_robot_secrets(mut self, secrets: RobotSecrets) -> Self {
        self.secrets = secrets;
        self
    }

    /// Runs every step in order. The first failure aborts the run; kinds
    /// already synchronized stay as they are.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        wait_until_healthy(self.client, self.health_poll_interval).await;
        summary.password = Some(
            sync_admin_password(
                self.client,
                self.previous,
                self.old_admin_password.as_deref(),
                &self.admin_password,
            )
            .await?,
        );

        let loader = DocumentLoader::new(&self.folder, self.client);
        for kind in ResourceKind::ALL {
            let span = info_span!("sync", kind = %kind);
            let outcome = self
                .sync_kind(&loader, kind)
                .instrument(span)
                .await
                .with_context(|| format!("Failed to synchronize {kind}"))?;
            match outcome {
                Some(result) => summary.kinds.push((kind, result)),
                None => summary.skipped.push(kind),
            }
        }

        info!("Synchronization finished\n{summary}");
        Ok(summary)
    }

    async fn sync_kind(
        &self,
        loader: &DocumentLoader<'_>,
        kind: ResourceKind,
    ) -> Result<Option<ReconcileResult>> {
        let client = self.client;
        let result = match kind {
            ResourceKind::Configurations => {
                let Some(document) = loader.load::<Document>(kind).await? else {
                    return Ok(None);
                };
                sync_configurations(client, document, &self.oidc).await?;
                ReconcileResult {
                    updated: vec![kind.to_string()],
                    ..ReconcileResult::default()
                }
            }
            ResourceKind::Registry => {
                let Some(target) = loader.load::<Vec<Registry>>(kind).await? else {
                    return Ok(None);
                };
                sync(&RegistryAdapter::new(client), &target).await?
            }
            ResourceKind::Project => {
                let Some(target) = loader.load::<Vec<ProjectRequest>>(kind).await? else {
                    return Ok(None);
                };
                sync(&ProjectAdapter::new(client), &target).await?
            }
            ResourceKind::ProjectMember => {
                let Some(target) = loader.load::<Vec<ProjectMembership>>(kind).await? else {
                    return Ok(None);
                };
                sync_project_members(client, &target).await?
            }
            ResourceKind::RobotAccount => {
                let Some(target) = loader.load::<Vec<DesiredRobot>>(kind).await? else {
                    return Ok(None);
                };
                let adapter = RobotAdapter::new(client, self.naming.clone(), self.secrets.clone());
                sync(&adapter, &target).await?
            }
            ResourceKind::WebhookPolicy => {
                let Some(target) = loader.load::<Vec<ProjectWebhooks>>(kind).await? else {
                    return Ok(None);
                };
                sync_webhooks(client, &target).await?
            }
            ResourceKind::ReplicationPolicy => {
                let Some(target) = loader.load::<Vec<ReplicationPolicy>>(kind).await? else {
                    return Ok(None);
                };
                sync(&ReplicationAdapter::new(client), &target).await?
            }
            ResourceKind::PurgeJobSchedule => {
                let Some(schedule) = loader.load::<Document>(kind).await? else {
                    return Ok(None);
                };
                sync_schedule(client, ScheduleKind::PurgeAudit, &schedule).await?
            }
            ResourceKind::GarbageCollectionSchedule => {
                let Some(schedule) = loader.load::<Document>(kind).await? else {
                    return Ok(None);
                };
                sync_schedule(client, ScheduleKind::GarbageCollection, &schedule).await?
            }
            ResourceKind::RetentionPolicy => {
                let Some(target) = loader.load::<Vec<RetentionPolicy>>(kind).await? else {
                    return Ok(None);
                };
                upsert(&RetentionAdapter::new(client), &target).await?
            }
        };
        Ok(Some(result))
    }
}
