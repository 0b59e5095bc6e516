//! # harbor-day2-operator
//!
//! Brings a Harbor instance in line with a folder of JSON documents.
//!
//! A run waits for the instance to report healthy, makes sure the admin
//! password is the configured one, and then synchronizes every resource kind
//! whose document exists, in dependency order. See [`orchestrator::Operator`].

pub mod cli;
pub mod config;
pub mod configurations;
pub mod credentials;
pub mod health;
pub mod observability;
pub mod orchestrator;

pub use config::AppConfig;
pub use orchestrator::{Operator, RunSummary};
