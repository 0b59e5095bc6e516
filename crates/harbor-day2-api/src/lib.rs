//! # harbor-day2-api
//!
//! The control API surface the day-2 operator reconciles against.
//!
//! - [`RegistryClient`]: the capability trait every reconciler and resolver
//!   is written against
//! - [`HarborClient`]: its implementation over the Harbor v2.0 HTTP API
//! - [`models`]: wire models with pass-through attribute maps
//! - [`ApiError`]: the error taxonomy (not found, conflict, bad request,
//!   unauthorized, ...)
//!
//! ## Example
//!
//! ```ignore
//! use harbor_day2_api::{ClientConfig, Credentials, HarborClient, RegistryClient};
//!
//! let client = HarborClient::new(ClientConfig::new(
//!     "https://harbor.example.com",
//!     Credentials::new("admin", "Harbor12345"),
//! ))?;
//! let projects = client.list_projects(Some("library")).await?;
//! ```

mod client;
mod error;
mod http;
pub mod models;

pub use client::RegistryClient;
pub use error::{ApiError, ApiResult};
pub use http::{ClientConfig, Credentials, HarborClient};
pub use models::{
    Document, Health, Project, ProjectMember, ProjectRef, ProjectRequest, ProjectRole, Registry,
    ReplicationPolicy, Repository, ResourceId, RetentionPolicy, RetentionScope, Robot,
    RobotCreated, RobotPermission, RobotScope, ScheduleKind, User, WebhookPolicy,
};
