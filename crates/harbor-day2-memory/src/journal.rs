use std::fmt;

use harbor_day2_api::ApiError;

/// What a recorded call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
    RefreshSecret,
    SetPassword,
    Configure,
}

impl Action {
    /// Whether the call changes service state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::List | Self::Get)
    }
}

/// One journaled call against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub action: Action,
    /// Resource kind, e.g. `"registry"`, `"member"`.
    pub resource: &'static str,
    /// Natural key of the addressed entity (name, `project/username`, id).
    pub key: String,
}

impl Call {
    pub fn new(action: Action, resource: &'static str, key: impl Into<String>) -> Self {
        Self {
            action,
            resource,
            key: key.into(),
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.action, self.resource, self.key)
    }
}

/// Failure to inject for a matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Conflict,
    BadRequest,
    Unauthorized,
    Internal,
}

impl Failure {
    pub(crate) fn to_error(self, call: &Call) -> ApiError {
        let message = format!("injected failure for {call}");
        match self {
            Self::NotFound => ApiError::not_found(message),
            Self::Conflict => ApiError::conflict(message),
            Self::BadRequest => ApiError::bad_request(message),
            Self::Unauthorized => ApiError::unauthorized(message),
            Self::Internal => ApiError::from_status(500, message),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InjectedFailure {
    pub(crate) action: Action,
    pub(crate) resource: &'static str,
    pub(crate) key: String,
    pub(crate) failure: Failure,
}

impl InjectedFailure {
    pub(crate) fn matches(&self, call: &Call) -> bool {
        self.action == call.action && self.resource == call.resource && self.key == call.key
    }
}
