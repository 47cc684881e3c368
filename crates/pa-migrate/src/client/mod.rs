//! Clients for Planning Analytics environments.
//!
//! - [`rest`]: the TM1 REST API over HTTP
//! - [`mock`]: an in-memory server for tests

pub mod mock;
pub mod rest;

pub use mock::MockServer;
pub use rest::RestClient;

use std::sync::Arc;

use tracing::info;

use crate::config::EnvironmentConfig;
use crate::core::OlapClient;
use crate::error::{MigrateError, Result};

/// Open a session to an environment and verify it answers.
///
/// Any failure, including rejected credentials, is reported as
/// [`MigrateError::Connectivity`] for `label`.
pub async fn connect(label: &str, env: &EnvironmentConfig) -> Result<Arc<dyn OlapClient>> {
    let client = RestClient::new(label, env)
        .map_err(|e| MigrateError::connectivity(label, e.to_string()))?;
    let version = client.product_version().await.map_err(|e| match e {
        MigrateError::Connectivity { .. } => e,
        other => MigrateError::connectivity(label, other.to_string()),
    })?;
    info!(
        "Connected to {} at {} (version {})",
        label,
        env.service_root(),
        version
    );
    Ok(Arc::new(client))
}
