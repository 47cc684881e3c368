//! Migration orchestrator - main workflow coordinator.

use crate::client;
use crate::config::{Config, EnvironmentConfig};
use crate::core::{ObjectKind, ObjectReference, OlapClient};
use crate::error::{MigrateError, Result};
use crate::transfer::{TransferEngine, TransferOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn OlapClient>,
    target: Arc<dyn OlapClient>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: `completed` or `failed`.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Objects requested.
    pub items_total: usize,

    /// Objects that completed without error, skipped ones included.
    pub items_transferred: usize,

    /// Internal objects that were skipped.
    pub items_skipped: usize,

    /// Cells written across all objects.
    pub cells_written: usize,

    /// Failed objects in request order.
    pub failures: Vec<ObjectFailure>,
}

/// One object that could not be transferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectFailure {
    pub name: String,
    pub kind: ObjectKind,
    pub reason: String,
}

/// Reachability of one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentHealth {
    pub service_root: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a connection test against both environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source: EnvironmentHealth,
    pub target: EnvironmentHealth,
    pub healthy: bool,
}

impl Orchestrator {
    /// Create a new orchestrator, connecting to both environments.
    ///
    /// Fails with [`MigrateError::Connectivity`] before any object is
    /// touched when either environment is unreachable.
    pub async fn new(config: Config) -> Result<Self> {
        let source = client::connect("source", &config.source).await?;
        let target = client::connect("target", &config.target).await?;
        Ok(Self::with_clients(config, source, target))
    }

    /// Create an orchestrator over already connected clients.
    pub fn with_clients(
        config: Config,
        source: Arc<dyn OlapClient>,
        target: Arc<dyn OlapClient>,
    ) -> Self {
        Self {
            config,
            source,
            target,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transfer engine between the two environments.
    pub fn engine(&self) -> TransferEngine {
        TransferEngine::new(
            self.source.clone(),
            self.target.clone(),
            self.config.transfer_config(),
        )
    }

    /// Migrate the objects listed in the configuration with its options.
    pub async fn run(&self) -> Result<MigrationResult> {
        self.run_with(&self.config.transfer_options()).await
    }

    /// Migrate the objects listed in the configuration with explicit options.
    pub async fn run_with(&self, options: &TransferOptions) -> Result<MigrationResult> {
        if self.config.migration.objects.is_empty() {
            return Err(MigrateError::Config(
                "migration.objects is empty, nothing to migrate".into(),
            ));
        }
        Ok(self
            .migrate_with(&self.config.migration.objects, options)
            .await)
    }

    /// Migrate objects with subsets and views but without cube data.
    pub async fn migrate(&self, objects: &[ObjectReference]) -> MigrationResult {
        self.migrate_with(objects, &TransferOptions::batch()).await
    }

    /// Migrate objects in order. A failing object is recorded and the
    /// remaining objects are still attempted.
    pub async fn migrate_with(
        &self,
        objects: &[ObjectReference],
        options: &TransferOptions,
    ) -> MigrationResult {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Starting migration run {}: {} objects",
            run_id,
            objects.len()
        );

        let engine = self.engine();
        let mut items_transferred = 0;
        let mut items_skipped = 0;
        let mut cells_written = 0;
        let mut failures = Vec::new();

        for object in objects {
            match engine.transfer_object(object, options).await {
                Ok(stats) => {
                    items_transferred += 1;
                    if stats.skipped {
                        items_skipped += 1;
                    }
                    cells_written += stats.cells_written;
                    if stats.failed_queries > 0 {
                        info!(
                            "{}: {} of {} queries failed and were skipped",
                            object, stats.failed_queries, stats.queries
                        );
                    }
                }
                Err(e) => {
                    error!("{} not transferred: {}", object, e);
                    failures.push(ObjectFailure {
                        name: object.name.clone(),
                        kind: object.kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let status = if failures.is_empty() {
            "completed"
        } else {
            "failed"
        };

        let result = MigrationResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            items_total: objects.len(),
            items_transferred,
            items_skipped,
            cells_written,
            failures,
        };

        info!(
            "Migration {}: {}/{} objects, {} failed, {} cells in {:.1}s",
            result.status,
            result.items_transferred,
            result.items_total,
            result.failures.len(),
            result.cells_written,
            result.duration_seconds
        );

        result
    }

    /// All dimensions, cubes and processes on the source.
    pub async fn list_objects(&self) -> Result<Vec<ObjectReference>> {
        let mut objects = Vec::new();
        for kind in [ObjectKind::Dimension, ObjectKind::Cube, ObjectKind::Process] {
            let names = self.source.object_names(kind).await?;
            objects.extend(names.into_iter().map(|n| ObjectReference::new(kind, n)));
        }
        Ok(objects)
    }

    /// Test connectivity to both environments without failing.
    pub async fn health_check(config: &Config) -> HealthCheckResult {
        let source = check_environment("source", &config.source).await;
        let target = check_environment("target", &config.target).await;
        HealthCheckResult {
            healthy: source.connected && target.connected,
            source,
            target,
        }
    }
}

async fn check_environment(label: &str, env: &EnvironmentConfig) -> EnvironmentHealth {
    let probe = async {
        let client = client::connect(label, env).await?;
        client.object_names(ObjectKind::Dimension).await?;
        Ok::<_, MigrateError>(())
    };
    let error = probe.await.err().map(|e| {
        error!("{} connection test failed: {}", label, e);
        e.to_string()
    });
    EnvironmentHealth {
        service_root: env.service_root(),
        connected: error.is_none(),
        error,
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line summary, e.g. `Migrated 2 objects successfully, Error on Sales`.
    pub fn message(&self) -> String {
        let mut message = format!("Migrated {} objects successfully", self.items_transferred);
        if !self.failures.is_empty() {
            let names: Vec<&str> = self.failures.iter().map(|f| f.name.as_str()).collect();
            message.push_str(&format!(", Error on {}", names.join(", ")));
        }
        message
    }
}

impl HealthCheckResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
