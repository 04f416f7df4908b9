use serde::{Deserialize, Serialize};

use authstore_postgres::PostgresConfig;

/// Which backend the commands operate on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local store. Nothing outlives the command, so every command
    /// that touches stored state refuses it.
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub postgres: PostgresConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.backend == BackendKind::Postgres {
            self.postgres.validate()?;
        }
        Ok(())
    }

    /// Copy safe to print: the database password is masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        cfg.postgres.url = authstore_postgres::pool::mask_password(&cfg.postgres.url);
        cfg
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "authstore.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., AUTHSTORE__POSTGRES__POOL_SIZE=20
        builder = builder.add_source(
            Environment::with_prefix("AUTHSTORE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_postgres_config_from_file() {
        let file = write_config(
            r#"
backend = "postgres"

[postgres]
url = "postgres://auth:secret@db:5432/auth"
pool_size = 4
run_migrations = false

[logging]
level = "debug"
"#,
        );
        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.backend, BackendKind::Postgres);
        assert_eq!(cfg.postgres.pool_size, 4);
        assert!(!cfg.postgres.run_migrations);
        // unset keys keep their defaults
        assert_eq!(cfg.postgres.connect_timeout_ms, 5000);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let file = write_config("[logging]\nlevel = \"loud\"\n");
        let err = loader::load_config(file.path().to_str()).unwrap_err();
        assert!(err.contains("logging.level"));
    }

    #[test]
    fn test_postgres_settings_checked_only_for_postgres_backend() {
        let mut cfg = AppConfig::default();
        cfg.postgres.pool_size = 0;
        assert!(cfg.validate().is_ok());
        cfg.backend = BackendKind::Postgres;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = loader::load_config(Some("/nonexistent/authstore.toml")).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_redacted_masks_password() {
        let mut cfg = AppConfig::default();
        cfg.postgres.url = "postgres://auth:secret@db/auth".into();
        assert_eq!(cfg.redacted().postgres.url, "postgres://auth:****@db/auth");
    }
}
