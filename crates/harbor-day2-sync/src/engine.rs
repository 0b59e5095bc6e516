//! Kind-independent reconciliation.
//!
//! [`reconcile`] partitions observed and desired entities by comparison key
//! and drives the resulting deletions, updates and creations through a
//! [`KindAdapter`]. Kinds that are never deleted and have at most one live
//! entity per desired entry (retention policies, system schedules) go
//! through [`upsert`] instead, which looks the entity up and branches on an
//! explicit [`Existence`] value.

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use harbor_day2_api::{ApiError, ApiResult};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::kind::ResourceKind;

/// How a matched entity is brought in line with its desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Issue the kind's update call.
    Update,
    /// Delete the observed entity, then create the desired one.
    Recreate,
}

/// Binds one resource kind to the control API.
#[async_trait]
pub trait KindAdapter: Send + Sync {
    type Desired: Send + Sync;
    type Observed: Send + Sync;

    fn kind(&self) -> ResourceKind;

    /// Parent scope shown in logs and results, e.g. the owning project.
    fn scope(&self) -> Option<&str> {
        None
    }

    fn desired_key(&self, desired: &Self::Desired) -> String;

    fn observed_key(&self, observed: &Self::Observed) -> String;

    async fn list(&self) -> ApiResult<Vec<Self::Observed>>;

    async fn create(&self, desired: &Self::Desired) -> ApiResult<()>;

    async fn update(&self, observed: &Self::Observed, desired: &Self::Desired) -> ApiResult<()>;

    async fn delete(&self, observed: &Self::Observed) -> ApiResult<()>;

    /// Whether entities absent from the desired set are deleted.
    fn deletable(&self) -> bool {
        true
    }

    /// Precondition checked before deleting an unlisted entity.
    ///
    /// `Ok(false)` keeps the entity; an error aborts the kind.
    async fn can_delete(&self, _observed: &Self::Observed) -> ApiResult<bool> {
        Ok(true)
    }

    fn plan_update(&self, _observed: &Self::Observed, _desired: &Self::Desired) -> UpdatePlan {
        UpdatePlan::Update
    }
}

/// Partition of observed and desired entities by comparison key.
///
/// Every entity lands in exactly one bucket. Desired entries repeating an
/// earlier key go to `duplicates`; observed entries repeating a key go to
/// `to_delete`.
pub struct Diff<'a, O, D> {
    pub to_delete: Vec<&'a O>,
    pub to_update: Vec<(&'a O, &'a D)>,
    pub to_create: Vec<&'a D>,
    pub duplicates: Vec<&'a D>,
}

impl<O, D> fmt::Debug for Diff<'_, O, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diff")
            .field("to_delete", &self.to_delete.len())
            .field("to_update", &self.to_update.len())
            .field("to_create", &self.to_create.len())
            .field("duplicates", &self.duplicates.len())
            .finish()
    }
}

pub fn compute_diff<'a, O, D>(
    current: &'a [O],
    target: &'a [D],
    observed_key: impl Fn(&O) -> String,
    desired_key: impl Fn(&D) -> String,
) -> Diff<'a, O, D> {
    let mut desired_keys = HashSet::new();
    let mut unique = Vec::with_capacity(target.len());
    let mut duplicates = Vec::new();
    for desired in target {
        let key = desired_key(desired);
        if desired_keys.insert(key.clone()) {
            unique.push((key, desired));
        } else {
            duplicates.push(desired);
        }
    }

    let mut observed: HashMap<String, &'a O> = HashMap::new();
    let mut to_delete = Vec::new();
    for entity in current {
        let key = observed_key(entity);
        if desired_keys.contains(&key) && !observed.contains_key(&key) {
            observed.insert(key, entity);
        } else {
            to_delete.push(entity);
        }
    }

    let mut to_update = Vec::new();
    let mut to_create = Vec::new();
    for (key, desired) in unique {
        match observed.get(&key) {
            Some(entity) => to_update.push((*entity, desired)),
            None => to_create.push(desired),
        }
    }

    Diff {
        to_delete,
        to_update,
        to_create,
        duplicates,
    }
}

/// Keys touched by one reconciliation, grouped by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub recreated: Vec<String>,
    pub deleted: Vec<String>,
    /// Entities whose call failed with an entity-scoped error.
    pub skipped: Vec<String>,
    /// Unlisted entities kept because the kind or a guard forbids deletion.
    pub retained: Vec<String>,
}

impl ReconcileResult {
    pub fn merge(&mut self, other: ReconcileResult) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.recreated.extend(other.recreated);
        self.deleted.extend(other.deleted);
        self.skipped.extend(other.skipped);
        self.retained.extend(other.retained);
    }

    /// Number of entities changed on the service.
    pub fn changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.recreated.len() + self.deleted.len()
    }

    /// Whether any entity was created or deleted.
    pub fn is_structural(&self) -> bool {
        !(self.created.is_empty() && self.recreated.is_empty() && self.deleted.is_empty())
    }
}

impl fmt::Display for ReconcileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} recreated={} deleted={} skipped={} retained={}",
            self.created.len(),
            self.updated.len(),
            self.recreated.len(),
            self.deleted.len(),
            self.skipped.len(),
            self.retained.len()
        )
    }
}

fn scoped_key(scope: Option<&str>, key: String) -> String {
    match scope {
        Some(scope) => format!("{scope}/{key}"),
        None => key,
    }
}

/// Logs and records an entity-scoped failure, or aborts the kind.
fn absorb(
    kind: ResourceKind,
    key: String,
    operation: &str,
    error: ApiError,
    result: &mut ReconcileResult,
) -> SyncResult<()> {
    if error.is_entity_scoped() || error.is_not_found() {
        warn!(kind = %kind, key = %key, operation, error = %error, "Skipping entity");
        result.skipped.push(key);
        Ok(())
    } else {
        Err(SyncError::Api {
            kind,
            key,
            source: error,
        })
    }
}

async fn create_entity<A: KindAdapter + ?Sized>(
    adapter: &A,
    desired: &A::Desired,
    key: String,
    result: &mut ReconcileResult,
) -> SyncResult<()> {
    let kind = adapter.kind();
    info!(kind = %kind, key = %key, "Creating");
    match adapter.create(desired).await {
        Ok(()) => {
            result.created.push(key);
            Ok(())
        }
        Err(error) => absorb(kind, key, "create", error, result),
    }
}

/// Reconciles one snapshot of observed entities against the desired set.
///
/// Deletions run first, then updates, then creations. Conflict, bad-request
/// and not-found answers are logged and the entity skipped; any other API
/// error, or a failing deletion guard, aborts the kind.
pub async fn reconcile<A: KindAdapter + ?Sized>(
    adapter: &A,
    current: &[A::Observed],
    target: &[A::Desired],
) -> SyncResult<ReconcileResult> {
    let kind = adapter.kind();
    let scope = adapter.scope();
    let diff = compute_diff(
        current,
        target,
        |o| adapter.observed_key(o),
        |d| adapter.desired_key(d),
    );
    debug!(kind = %kind, scope, diff = ?diff, "Computed diff");

    let mut result = ReconcileResult::default();

    for desired in diff.duplicates {
        let key = scoped_key(scope, adapter.desired_key(desired));
        warn!(kind = %kind, key = %key, "Duplicate entry in configuration, keeping the first");
        result.skipped.push(key);
    }

    for observed in diff.to_delete {
        let key = scoped_key(scope, adapter.observed_key(observed));
        if !adapter.deletable() {
            result.retained.push(key);
            continue;
        }
        let allowed = adapter
            .can_delete(observed)
            .await
            .map_err(|source| SyncError::Guard {
                kind,
                key: key.clone(),
                source,
            })?;
        if !allowed {
            warn!(kind = %kind, key = %key, "Not defined in configuration but still in use, keeping it");
            result.retained.push(key);
            continue;
        }
        info!(kind = %kind, key = %key, "Deleting, not defined in configuration");
        match adapter.delete(observed).await {
            Ok(()) => result.deleted.push(key),
            Err(error) => absorb(kind, key, "delete", error, &mut result)?,
        }
    }

    for (observed, desired) in diff.to_update {
        let key = scoped_key(scope, adapter.desired_key(desired));
        match adapter.plan_update(observed, desired) {
            UpdatePlan::Recreate => {
                info!(kind = %kind, key = %key, "Immutable field changed, recreating");
                if let Err(error) = adapter.delete(observed).await {
                    absorb(kind, key, "delete", error, &mut result)?;
                    continue;
                }
                match adapter.create(desired).await {
                    Ok(()) => result.recreated.push(key),
                    Err(error) => absorb(kind, key, "create", error, &mut result)?,
                }
            }
            UpdatePlan::Update => {
                info!(kind = %kind, key = %key, "Updating");
                match adapter.update(observed, desired).await {
                    Ok(()) => result.updated.push(key),
                    Err(error) if error.is_not_found() => {
                        warn!(kind = %kind, key = %key, "Vanished before update, creating instead");
                        create_entity(adapter, desired, key, &mut result).await?;
                    }
                    Err(error) => absorb(kind, key, "update", error, &mut result)?,
                }
            }
        }
    }

    for desired in diff.to_create {
        let key = scoped_key(scope, adapter.desired_key(desired));
        create_entity(adapter, desired, key, &mut result).await?;
    }

    info!(kind = %kind, scope, summary = %result, "Reconciled");
    Ok(result)
}

/// Lists the live entities of a kind and reconciles them against `target`.
pub async fn sync<A: KindAdapter + ?Sized>(
    adapter: &A,
    target: &[A::Desired],
) -> SyncResult<ReconcileResult> {
    let current = adapter
        .list()
        .await
        .map_err(|source| SyncError::Listing {
            kind: adapter.kind(),
            source,
        })?;
    reconcile(adapter, &current, target).await
}

/// Outcome of looking up the live counterpart of a desired entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence<T> {
    Found(T),
    NotFound,
}

impl<T> Existence<T> {
    /// Turns a not-found answer into [`Existence::NotFound`].
    pub fn from_lookup(lookup: ApiResult<T>) -> ApiResult<Self> {
        match lookup {
            Ok(value) => Ok(Self::Found(value)),
            Err(error) if error.is_not_found() => Ok(Self::NotFound),
            Err(error) => Err(error),
        }
    }
}

/// Binds an upsert-only kind to the control API.
#[async_trait]
pub trait UpsertAdapter: Send + Sync {
    type Desired: Send + Sync;
    /// What a successful lookup yields, typically the live id.
    type Handle: Send + Sync;

    fn kind(&self) -> ResourceKind;

    fn describe(&self, desired: &Self::Desired) -> String;

    async fn lookup(&self, desired: &Self::Desired) -> ApiResult<Existence<Self::Handle>>;

    async fn create(&self, desired: &Self::Desired) -> ApiResult<()>;

    async fn update(&self, handle: &Self::Handle, desired: &Self::Desired) -> ApiResult<()>;
}

/// Creates or updates each desired entity. Nothing is ever deleted.
pub async fn upsert<A: UpsertAdapter + ?Sized>(
    adapter: &A,
    target: &[A::Desired],
) -> SyncResult<ReconcileResult> {
    let kind = adapter.kind();
    let mut result = ReconcileResult::default();

    for desired in target {
        let key = adapter.describe(desired);
        let existence = adapter
            .lookup(desired)
            .await
            .map_err(|source| SyncError::Api {
                kind,
                key: key.clone(),
                source,
            })?;
        match existence {
            Existence::Found(handle) => {
                info!(kind = %kind, key = %key, "Updating");
                match adapter.update(&handle, desired).await {
                    Ok(()) => result.updated.push(key),
                    Err(error) if error.is_not_found() => {
                        warn!(kind = %kind, key = %key, "Vanished before update, creating instead");
                        match adapter.create(desired).await {
                            Ok(()) => result.created.push(key),
                            Err(error) => absorb(kind, key, "create", error, &mut result)?,
                        }
                    }
                    Err(error) => absorb(kind, key, "update", error, &mut result)?,
                }
            }
            Existence::NotFound => {
                info!(kind = %kind, key = %key, "Creating");
                match adapter.create(desired).await {
                    Ok(()) => result.created.push(key),
                    Err(error) => absorb(kind, key, "create", error, &mut result)?,
                }
            }
        }
    }

    info!(kind = %kind, summary = %result, "Reconciled");
    Ok(result)
}
