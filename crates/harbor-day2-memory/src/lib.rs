//! # harbor-day2-memory
//!
//! In-memory implementation of [`RegistryClient`](harbor_day2_api::RegistryClient).
//!
//! [`MemoryRegistry`] keeps registries, projects, members, robots, webhook,
//! replication and retention policies and schedules in process, enforcing the
//! same uniqueness and existence rules the real service does (duplicate names
//! conflict, unknown users are not found, non-empty projects cannot be
//! deleted). Every call is recorded in a journal so tests can assert exactly
//! which mutations a reconciliation issued, and failures can be injected per
//! call.

mod journal;
mod registry;

pub use journal::{Action, Call, Failure};
pub use registry::{MemoryRegistry, document};
