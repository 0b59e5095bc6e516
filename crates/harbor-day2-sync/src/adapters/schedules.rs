use async_trait::async_trait;
use harbor_day2_api::{ApiResult, Document, RegistryClient, ScheduleKind};

use crate::engine::{Existence, ReconcileResult, UpsertAdapter, upsert};
use crate::error::SyncResult;
use crate::kind::ResourceKind;

/// A singleton system schedule (garbage collection or audit-log purge).
pub struct ScheduleAdapter<'a> {
    client: &'a dyn RegistryClient,
    schedule: ScheduleKind,
}

impl<'a> ScheduleAdapter<'a> {
    pub fn new(client: &'a dyn RegistryClient, schedule: ScheduleKind) -> Self {
        Self { client, schedule }
    }
}

#[async_trait]
impl<'a> UpsertAdapter for ScheduleAdapter<'a> {
    type Desired = Document;
    type Handle = ();

    fn kind(&self) -> ResourceKind {
        self.schedule.into()
    }

    fn describe(&self, _desired: &Document) -> String {
        self.schedule.path().to_string()
    }

    async fn lookup(&self, _desired: &Document) -> ApiResult<Existence<()>> {
        Existence::from_lookup(self.client.get_schedule(self.schedule).await.map(|_| ()))
    }

    async fn create(&self, desired: &Document) -> ApiResult<()> {
        self.client.create_schedule(self.schedule, desired).await
    }

    async fn update(&self, _handle: &(), desired: &Document) -> ApiResult<()> {
        self.client.update_schedule(self.schedule, desired).await
    }
}

/// Creates or updates one system schedule.
pub async fn sync_schedule(
    client: &dyn RegistryClient,
    schedule: ScheduleKind,
    desired: &Document,
) -> SyncResult<ReconcileResult> {
    upsert(&ScheduleAdapter::new(client, schedule), std::slice::from_ref(desired)).await
}
