//! Error types for reconciliation and document rendering.

use std::path::PathBuf;

use harbor_day2_api::ApiError;
use thiserror::Error;

use crate::kind::ResourceKind;
use crate::template::PlaceholderKind;

/// Errors that abort the synchronization of a resource kind.
///
/// Failures scoped to a single entity (a conflicting create, a rejected
/// update) are logged and skipped by the reconciler and never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to render {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        source: TemplateError,
    },

    #[error("Failed to list {kind}: {source}")]
    Listing { kind: ResourceKind, source: ApiError },

    #[error("Deletion guard for {kind} '{key}' failed: {source}")]
    Guard {
        kind: ResourceKind,
        key: String,
        source: ApiError,
    },

    #[error("Failed to sync {kind} '{key}': {source}")]
    Api {
        kind: ResourceKind,
        key: String,
        source: ApiError,
    },
}

impl SyncError {
    /// Kind whose synchronization failed, if the error is tied to one.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Listing { kind, .. } | Self::Guard { kind, .. } | Self::Api { kind, .. } => {
                Some(*kind)
            }
            Self::Read { .. } | Self::Decode { .. } | Self::Render { .. } => None,
        }
    }
}

/// Errors raised while rendering placeholders in a document.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("No {kind} named '{name}' exists")]
    Unresolved { kind: PlaceholderKind, name: String },

    #[error("Failed to look up {kind} '{name}': {source}")]
    Lookup {
        kind: PlaceholderKind,
        name: String,
        source: ApiError,
    },

    #[error("{kind} '{name}' has no identifier")]
    MissingId { kind: PlaceholderKind, name: String },

    #[error("Placeholder path '{path}' is bound to two different values")]
    ConflictingPath { path: String },

    #[error("Placeholder '{token}' has no value")]
    Unbound { token: String },
}

pub type SyncResult<T> = Result<T, SyncError>;
