//! # pa-migrate
//!
//! Object and data migration between Planning Analytics (TM1) environments.
//!
//! This library moves dimensions, cubes and processes from a source to a
//! target server over the TM1 REST API, with support for:
//!
//! - **Dependent objects**: attributes, public subsets and public views
//! - **Cell data** at leaf and consolidated level, across alternate hierarchies
//! - **Skip rules** for server-internal control objects
//! - **Partial failure**: a batch reports every failed object and carries on
//!
//! ## Example
//!
//! ```rust,no_run
//! use pa_migrate::{Config, ObjectReference, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator
//!         .migrate(&[ObjectReference::cube("Sales")])
//!         .await;
//!     println!("{}", result.message());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod mdx;
pub mod orchestrator;
pub mod skip;
pub mod transfer;

// Re-exports for convenient access
pub use client::{MockServer, RestClient};
pub use config::{Config, Connection, EnvironmentConfig, MigrationConfig};
pub use core::{CellTuple, CellValue, Cellset, ObjectKind, ObjectReference, OlapClient};
pub use error::{MigrateError, Result};
pub use orchestrator::{HealthCheckResult, MigrationResult, ObjectFailure, Orchestrator};
pub use skip::SkipRules;
pub use transfer::{ElementFilter, TransferConfig, TransferEngine, TransferOptions, TransferStats};
