//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ObjectReference;
use crate::skip::SkipRules;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment objects are read from.
    pub source: EnvironmentConfig,

    /// Environment objects are written to.
    pub target: EnvironmentConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// One Planning Analytics environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// How to reach the server; selected by the `type` key.
    #[serde(flatten)]
    pub connection: Connection,

    /// Verify the server's TLS certificate (default: true).
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Request timeout in seconds (default: 300). MDX queries on large
    /// cubes are slow.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cells per `tm1.Update` request (default: 1000).
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

/// Connection kinds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Connection {
    /// Planning Analytics as a Service (v12).
    Saas {
        /// Data center, e.g. `us-east-1`.
        data_center: String,
        tenant: String,
        database: String,
        api_key: String,
    },

    /// Planning Analytics on IBM Cloud, authenticated through CAM.
    Cloud {
        environment_name: String,
        server_name: String,
        user: String,
        password: String,
        #[serde(default = "default_cam_namespace")]
        cam_namespace: String,
    },

    /// Explicit REST base URL, e.g. an on-premise server.
    Url {
        base_url: String,
        #[serde(default)]
        user: String,
        #[serde(default)]
        password: String,
        /// CAM namespace; basic authentication when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Saas {
                data_center,
                tenant,
                database,
                ..
            } => f
                .debug_struct("Saas")
                .field("data_center", data_center)
                .field("tenant", tenant)
                .field("database", database)
                .field("api_key", &"[REDACTED]")
                .finish(),
            Connection::Cloud {
                environment_name,
                server_name,
                user,
                cam_namespace,
                ..
            } => f
                .debug_struct("Cloud")
                .field("environment_name", environment_name)
                .field("server_name", server_name)
                .field("user", user)
                .field("password", &"[REDACTED]")
                .field("cam_namespace", cam_namespace)
                .finish(),
            Connection::Url {
                base_url,
                user,
                namespace,
                ..
            } => f
                .debug_struct("Url")
                .field("base_url", base_url)
                .field("user", user)
                .field("password", &"[REDACTED]")
                .field("namespace", namespace)
                .finish(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Objects migrated by `run`, in order.
    #[serde(default)]
    pub objects: Vec<ObjectReference>,

    /// Copy public static subsets with dimensions (default: true).
    #[serde(default = "default_true")]
    pub include_subsets: bool,

    /// Copy public views with cubes (default: true).
    #[serde(default = "default_true")]
    pub include_views: bool,

    /// Copy cube cell data (default: false).
    #[serde(default)]
    pub include_data: bool,

    /// Time dimensions used to slice leaf data transfers, in priority order.
    #[serde(default)]
    pub time_dimensions: Vec<String>,

    /// Internal objects that are never transferred.
    #[serde(default)]
    pub skip_rules: SkipRules,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            include_subsets: true,
            include_views: true,
            include_data: false,
            time_dimensions: Vec::new(),
            skip_rules: SkipRules::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_write_batch_size() -> usize {
    1000
}

fn default_cam_namespace() -> String {
    "LDAP".to_string()
}
