//! # harbor-day2-sync
//!
//! Declarative reconciliation for registry resources.
//!
//! The crate turns configuration documents into the exact set of create,
//! update and delete calls that bring a running registry in line with them:
//!
//! - [`engine`] holds the kind-independent reconciler: a diff by natural key
//!   followed by deletions, updates and creations, plus a lookup-then-write
//!   variant for resources that are never deleted.
//! - [`adapters`] binds each resource kind (registries, projects, members,
//!   robot accounts, webhooks, replications, retention policies, system
//!   schedules) to the [`RegistryClient`](harbor_day2_api::RegistryClient).
//! - [`template`] resolves `{{ project:NAME }}` and `{{ registry:NAME }}`
//!   placeholders to numeric ids before a document is parsed.
//! - [`loader`] reads, renders and decodes documents from disk.

pub mod adapters;
pub mod engine;
pub mod error;
pub mod kind;
pub mod loader;
pub mod template;

pub use engine::{
    Diff, Existence, KindAdapter, ReconcileResult, UpdatePlan, UpsertAdapter, compute_diff,
    reconcile, sync, upsert,
};
pub use error::{SyncError, SyncResult, TemplateError};
pub use kind::ResourceKind;
pub use loader::DocumentLoader;
pub use template::{IdentifierResolver, Placeholder, PlaceholderKind, TemplateRenderer};
