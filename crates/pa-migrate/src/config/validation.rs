//! Configuration validation.

use super::{Config, Connection, EnvironmentConfig};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_environment("source", &config.source)?;
    validate_environment("target", &config.target)?;

    // Cannot migrate onto the source itself
    if config.source.service_root() == config.target.service_root() {
        return Err(MigrateError::Config(
            "source and target cannot be the same environment".into(),
        ));
    }

    for (idx, object) in config.migration.objects.iter().enumerate() {
        if object.name.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "migration.objects[{}].name is required",
                idx
            )));
        }
    }
    if config.migration.time_dimensions.iter().any(|t| t.is_empty()) {
        return Err(MigrateError::Config(
            "migration.time_dimensions cannot contain empty names".into(),
        ));
    }

    Ok(())
}

fn validate_environment(label: &str, env: &EnvironmentConfig) -> Result<()> {
    let required = |field: &str, value: &str| -> Result<()> {
        if value.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "{}.{} is required",
                label, field
            )));
        }
        Ok(())
    };

    match &env.connection {
        Connection::Saas {
            data_center,
            tenant,
            database,
            api_key,
        } => {
            required("data_center", data_center)?;
            required("tenant", tenant)?;
            required("database", database)?;
            required("api_key", api_key)?;
        }
        Connection::Cloud {
            environment_name,
            server_name,
            user,
            password,
            ..
        } => {
            required("environment_name", environment_name)?;
            required("server_name", server_name)?;
            required("user", user)?;
            required("password", password)?;
        }
        Connection::Url { base_url, .. } => {
            required("base_url", base_url)?;
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(MigrateError::Config(format!(
                    "{}.base_url must start with http:// or https://, got '{}'",
                    label, base_url
                )));
            }
        }
    }

    if env.timeout_secs == 0 {
        return Err(MigrateError::Config(format!(
            "{}.timeout_secs must be at least 1",
            label
        )));
    }
    if env.write_batch_size == 0 {
        return Err(MigrateError::Config(format!(
            "{}.write_batch_size must be at least 1",
            label
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationConfig;
    use crate::core::ObjectReference;

    fn environment(connection: Connection) -> EnvironmentConfig {
        EnvironmentConfig {
            connection,
            verify_tls: true,
            timeout_secs: 300,
            write_batch_size: 1000,
        }
    }

    fn valid_config() -> Config {
        Config {
            source: environment(Connection::Saas {
                data_center: "us-east-1".to_string(),
                tenant: "T1".to_string(),
                database: "Planning".to_string(),
                api_key: "key".to_string(),
            }),
            target: environment(Connection::Cloud {
                environment_name: "acme".to_string(),
                server_name: "Planning".to_string(),
                user: "automation".to_string(),
                password: "password".to_string(),
                cam_namespace: "LDAP".to_string(),
            }),
            migration: MigrationConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = valid_config();
        if let Connection::Saas { api_key, .. } = &mut config.source.connection {
            api_key.clear();
        }
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.api_key is required"));
    }

    #[test]
    fn test_same_environment_rejected() {
        let mut config = valid_config();
        config.target = config.source.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_url_scheme_required() {
        let mut config = valid_config();
        config.target = environment(Connection::Url {
            base_url: "pa.example.com".to_string(),
            user: "admin".to_string(),
            password: "apple".to_string(),
            namespace: None,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid_config();
        config.target.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_object_name_rejected() {
        let mut config = valid_config();
        config.migration.objects = vec![ObjectReference::cube(" ")];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_saas_debug_redacts_api_key() {
        let mut config = valid_config();
        config.source.connection = Connection::Saas {
            data_center: "us-east-1".to_string(),
            tenant: "T1".to_string(),
            database: "Planning".to_string(),
            api_key: "super_secret_key_123".to_string(),
        };
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_key_123"),
            "Debug output should not contain actual API key"
        );
    }

    #[test]
    fn test_cloud_debug_redacts_password() {
        let mut config = valid_config();
        if let Connection::Cloud { password, .. } = &mut config.target.connection {
            *password = "super_secret_password_456".to_string();
        }
        let debug_output = format!("{:?}", config.target);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_456"));
    }
}
