//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use crate::transfer::{TransferConfig, TransferOptions};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Transfer engine settings derived from the migration section.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            skip_rules: self.migration.skip_rules.clone(),
            time_dimensions: self.migration.time_dimensions.clone(),
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            include_subsets: self.migration.include_subsets,
            include_views: self.migration.include_views,
            include_data: self.migration.include_data,
        }
    }
}

impl EnvironmentConfig {
    /// REST service root of the environment, without a trailing slash.
    pub fn service_root(&self) -> String {
        match &self.connection {
            Connection::Saas {
                data_center,
                tenant,
                database,
                ..
            } => format!(
                "https://{}.planninganalytics.saas.ibm.com/api/{}/v0/tm1/{}/api/v1",
                data_center, tenant, database
            ),
            Connection::Cloud {
                environment_name,
                server_name,
                ..
            } => format!(
                "https://{}.planning-analytics.ibmcloud.com/tm1/api/{}/api/v1",
                environment_name, server_name
            ),
            Connection::Url { base_url, .. } => {
                let base = base_url.trim_end_matches('/');
                if base.ends_with("/api/v1") {
                    base.to_string()
                } else {
                    format!("{}/api/v1", base)
                }
            }
        }
    }
}
