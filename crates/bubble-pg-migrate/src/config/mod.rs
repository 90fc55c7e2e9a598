//! Configuration loading and validation.
//!
//! Configuration is resolved once at process start: YAML file first, then
//! environment overrides. The resulting [`Config`] is passed by reference
//! into the source client and migration driver so that nothing deeper in the
//! call graph reads the environment ad hoc.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;

/// Environment variables recognized as overrides.
const ENV_API_URL: &str = "BUBBLE_API_URL";
const ENV_API_TOKEN: &str = "BUBBLE_API_TOKEN";
const ENV_DB_HOST: &str = "MIGRATE_DB_HOST";
const ENV_DB_PORT: &str = "MIGRATE_DB_PORT";
const ENV_DB_NAME: &str = "MIGRATE_DB_NAME";
const ENV_DB_USER: &str = "MIGRATE_DB_USER";
const ENV_DB_PASSWORD: &str = "MIGRATE_DB_PASSWORD";
const ENV_BATCH_SIZE: &str = "MIGRATE_BATCH_SIZE";
const ENV_DRY_RUN: &str = "MIGRATE_DRY_RUN";
const ENV_STRICT: &str = "MIGRATE_STRICT";

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string (no environment overrides).
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Apply overrides from a variable lookup (the environment in
    /// production, an injected map in tests).
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var(ENV_API_URL) {
            self.source.base_url = url;
        }
        if let Some(token) = var(ENV_API_TOKEN) {
            self.source.token = token;
        }
        if let Some(host) = var(ENV_DB_HOST) {
            self.target.host = host;
        }
        if let Some(port) = var(ENV_DB_PORT) {
            self.target.port = port
                .parse()
                .map_err(|_| MigrateError::Config(format!("{} must be a port: {}", ENV_DB_PORT, port)))?;
        }
        if let Some(name) = var(ENV_DB_NAME) {
            self.target.database = name;
        }
        if let Some(user) = var(ENV_DB_USER) {
            self.target.user = user;
        }
        if let Some(password) = var(ENV_DB_PASSWORD) {
            self.target.password = password;
        }
        if let Some(batch) = var(ENV_BATCH_SIZE) {
            let parsed = batch.parse().map_err(|_| {
                MigrateError::Config(format!("{} must be an integer: {}", ENV_BATCH_SIZE, batch))
            })?;
            self.migration.batch_size = Some(parsed);
        }
        if let Some(flag) = var(ENV_DRY_RUN) {
            self.migration.dry_run = parse_bool(ENV_DRY_RUN, &flag)?;
        }
        if let Some(flag) = var(ENV_STRICT) {
            self.migration.strict = parse_bool(ENV_STRICT, &flag)?;
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(MigrateError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

impl TargetConfig {
    /// Build a tokio-postgres connection config.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host);
        pg.port(self.port);
        pg.dbname(&self.database);
        pg.user(&self.user);
        pg.password(&self.password);
        pg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn base_config() -> Config {
        Config::from_yaml(
            r#"
source:
  base_url: https://app.example.com/api/1.1
  token: secret
target:
  host: localhost
  database: compliance
  user: migrator
  password: pw
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = base_config();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BUBBLE_API_TOKEN", "env-token"),
            ("MIGRATE_BATCH_SIZE", "25"),
            ("MIGRATE_DRY_RUN", "true"),
        ]);
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.source.token, "env-token");
        assert_eq!(config.migration.get_batch_size(), 25);
        assert!(config.migration.dry_run);
    }

    #[test]
    fn test_bad_port_override_rejected() {
        let mut config = base_config();
        let result = config.apply_overrides(|name| {
            (name == "MIGRATE_DB_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_bool_override_rejected() {
        let mut config = base_config();
        let result =
            config.apply_overrides(|name| (name == "MIGRATE_STRICT").then(|| "maybe".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
source:
  base_url: https://app.example.com/api/1.1
  token: secret
target:
  host: db.internal
  database: compliance
  user: migrator
  password: pw
migration:
  batch_size: 50
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.host, "db.internal");
        assert_eq!(config.migration.get_batch_size(), 50);
    }
}
