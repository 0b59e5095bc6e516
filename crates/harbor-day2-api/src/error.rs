//! Error types for control API calls.
//!
//! Every failure returned by a [`RegistryClient`](crate::RegistryClient) is an
//! [`ApiError`]. The reconciler classifies these into "skip this entity" and
//! "abort the run" using the predicates defined here.

use serde::Deserialize;

/// Errors that can occur while talking to the registry control API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The addressed entity does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Message reported by the service.
        message: String,
    },

    /// The entity already exists.
    #[error("Conflict: {message}")]
    Conflict {
        /// Message reported by the service.
        message: String,
    },

    /// The payload was rejected as invalid.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Message reported by the service.
        message: String,
    },

    /// The credentials were rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Message reported by the service.
        message: String,
    },

    /// The credentials are valid but lack permission.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Message reported by the service.
        message: String,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Maps a non-success HTTP status and message to the matching variant.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::BadRequest { message },
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            _ => Self::Status { status, message },
        }
    }

    /// Returns `true` if the entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the entity already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the payload was rejected.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest { .. })
    }

    /// Returns `true` if the credentials were rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` for failures scoped to a single entity.
    ///
    /// Conflicts and rejected payloads concern only the entity being written,
    /// so a reconciliation pass logs them and moves on.
    #[must_use]
    pub fn is_entity_scoped(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::BadRequest { .. })
    }

    /// HTTP status code, when the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Result alias for control API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error payload returned by the service: `{"errors":[{"code","message"}]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ErrorBody {
    /// Flattens the error list into one message, if there is anything to say.
    pub(crate) fn summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| match (e.code.is_empty(), e.message.is_empty()) {
                (false, false) => format!("{}: {}", e.code, e.message),
                (true, false) => e.message.clone(),
                (false, true) => e.code.clone(),
                (true, true) => String::new(),
            })
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(ApiError::from_status(404, "x").is_not_found());
        assert!(ApiError::from_status(409, "x").is_conflict());
        assert!(ApiError::from_status(400, "x").is_bad_request());
        assert!(ApiError::from_status(401, "x").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(403, "x"),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            ApiError::from_status(412, "x"),
            ApiError::Status { status: 412, .. }
        ));
    }

    #[test]
    fn test_entity_scoped() {
        assert!(ApiError::conflict("exists").is_entity_scoped());
        assert!(ApiError::bad_request("bad").is_entity_scoped());
        assert!(!ApiError::not_found("gone").is_entity_scoped());
        assert!(!ApiError::from_status(500, "boom").is_entity_scoped());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::from_status(502, "bad gateway");
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
        assert_eq!(err.status(), Some(502));

        let err = ApiError::conflict("robot exists");
        assert_eq!(err.to_string(), "Conflict: robot exists");
    }

    #[test]
    fn test_error_body_summary() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"errors":[{"code":"NOT_FOUND","message":"project p1 not found"}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.summary().as_deref(),
            Some("NOT_FOUND: project p1 not found")
        );

        let empty: ErrorBody = serde_json::from_str(r#"{"errors":[]}"#).unwrap();
        assert!(empty.summary().is_none());
    }
}
