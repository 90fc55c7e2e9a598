//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate a loaded configuration.
pub fn validate(config: &Config) -> Result<()> {
    let src = &config.source;

    if src.base_url.trim().is_empty() {
        return Err(MigrateError::Config("source.base_url is required".into()));
    }
    if !src.base_url.starts_with("http://") && !src.base_url.starts_with("https://") {
        return Err(MigrateError::Config(format!(
            "source.base_url must be an http(s) URL, got '{}'",
            src.base_url
        )));
    }
    if src.token.trim().is_empty() {
        return Err(MigrateError::Config("source.token is required".into()));
    }
    if src.page_max < 1 {
        return Err(MigrateError::Config(format!(
            "source.page_max must be at least 1, got {}",
            src.page_max
        )));
    }
    if let Some(constraints) = &src.constraints {
        if !constraints.is_array() {
            return Err(MigrateError::Config(
                "source.constraints must be a JSON array".into(),
            ));
        }
    }

    let tgt = &config.target;
    for (value, name) in [
        (&tgt.host, "target.host"),
        (&tgt.database, "target.database"),
        (&tgt.user, "target.user"),
    ] {
        if value.trim().is_empty() {
            return Err(MigrateError::Config(format!("{} is required", name)));
        }
    }
    if tgt.max_connections == 0 {
        return Err(MigrateError::Config(
            "target.max_connections must be at least 1".into(),
        ));
    }

    if let Some(batch) = config.migration.batch_size {
        if batch < 1 {
            return Err(MigrateError::Config(format!(
                "migration.batch_size must be at least 1, got {}",
                batch
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::Config;

    fn valid_yaml() -> String {
        r#"
source:
  base_url: https://app.example.com/api/1.1
  token: secret-token
target:
  host: localhost
  database: compliance
  user: migrator
  password: pw
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = Config::from_yaml(&valid_yaml()).unwrap();
        assert_eq!(config.source.page_max, 100);
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.migration.get_batch_size(), 100);
    }

    #[test]
    fn test_missing_token_rejected() {
        let yaml = valid_yaml().replace("token: secret-token", "token: \"\"");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let yaml = valid_yaml().replace(
            "https://app.example.com/api/1.1",
            "ftp://app.example.com/api/1.1",
        );
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut yaml = valid_yaml();
        yaml.push_str("migration:\n  batch_size: 0\n");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_constraints_must_be_array() {
        let mut yaml = valid_yaml();
        let insert = "  constraints: {\"key\": \"company\"}\n";
        yaml = yaml.replace("target:", &format!("{}target:", insert));
        assert!(Config::from_yaml(&yaml).is_err());
    }
}
