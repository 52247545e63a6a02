use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::database::core::SQLITE_MEMORY;

/// Environment variable holding the PostgreSQL data source
pub const DATASOURCE_ENV: &str = "TC_DSOURCE";

/// Backend engine of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    Sqlite,
}

impl Driver {
    /// Name used in bundle keys (`chado.<driver>`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which engine to talk to and how to reach it
///
/// Fixed once a manager has been constructed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasourceDescriptor {
    pub driver: Driver,
    pub connection_string: String,
}

impl DatasourceDescriptor {
    pub fn postgres(connection_string: impl Into<String>) -> Self {
        DatasourceDescriptor {
            driver: Driver::Postgres,
            connection_string: connection_string.into(),
        }
    }

    pub fn sqlite_memory() -> Self {
        DatasourceDescriptor {
            driver: Driver::Sqlite,
            connection_string: SQLITE_MEMORY.to_string(),
        }
    }
}

const EMPTY_CONFIG: &str = r#"### testchado configuration file

### PostgreSQL data source; leave unset to test against in-memory SQLite
# dsource = "dbname=chado user=chado password=chado host=localhost sslmode=disable"

### directory holding chado.<driver> DDL and fixture files
# bundle_dir = "/path/to/bundle"
"#;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    dsource: Option<String>,
    bundle_dir: Option<String>,
}

/// Backend selection and resource location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestChadoConfig {
    /// PostgreSQL connection string; `None` selects in-memory SQLite
    pub datasource: Option<String>,

    /// Directory replacing the embedded schema bundle
    pub bundle_dir: Option<String>,
}

impl TestChadoConfig {
    /// Build the configuration from the environment
    ///
    /// A `.env` file in the working directory is honoured. Variables use the
    /// `TC_` prefix, e.g. `TC_DSOURCE` and `TC_BUNDLE_DIR`.
    pub fn from_env() -> Result<TestChadoConfig> {
        Self::new(&None)
    }

    /// Build the configuration from an optional TOML file and the environment
    ///
    /// Environment variables take precedence over the file. A missing file is
    /// not an error.
    pub fn new(path: &Option<String>) -> Result<TestChadoConfig> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        if let Some(p) = path {
            if Path::new(p.as_str()).exists() {
                builder = builder.add_source(config::File::with_name(p.as_str()));
            }
        }

        // E.g., `TC_DSOURCE="dbname=chado host=localhost" cargo test`
        builder = builder.add_source(config::Environment::with_prefix("TC"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_raw(raw))
    }

    /// Any non-empty data source is kept verbatim
    fn from_raw(raw: RawConfig) -> TestChadoConfig {
        TestChadoConfig {
            datasource: raw.dsource.filter(|s| !s.is_empty()),
            bundle_dir: raw.bundle_dir.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Template written by [`TestChadoConfig::write_template`]
    pub fn template() -> &'static str {
        EMPTY_CONFIG
    }

    /// Write a commented template configuration file
    pub fn write_template(path: &str) -> Result<()> {
        std::fs::write(path, EMPTY_CONFIG)
            .map_err(|e| anyhow!("Unable to create config file {}: {}", path, e))
    }

    /// Postgres when a data source is configured, in-memory SQLite otherwise
    pub fn descriptor(&self) -> DatasourceDescriptor {
        match &self.datasource {
            Some(ds) => DatasourceDescriptor::postgres(ds.clone()),
            None => DatasourceDescriptor::sqlite_memory(),
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let descriptor = self.descriptor();
        let mut lines = vec![
            format!("Driver:             {}", descriptor.driver),
            format!("Data Source:        {}", descriptor.connection_string),
        ];
        if let Some(dir) = &self.bundle_dir {
            lines.push(format!("Bundle Directory:   {}", dir));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_is_sqlite() {
        let config = TestChadoConfig::default();
        let descriptor = config.descriptor();
        assert_eq!(descriptor.driver, Driver::Sqlite);
        assert_eq!(descriptor.connection_string, ":memory:");
    }

    #[test]
    fn test_datasource_selects_postgres() {
        let config = TestChadoConfig {
            datasource: Some("dbname=chado host=localhost".to_string()),
            bundle_dir: None,
        };
        let descriptor = config.descriptor();
        assert_eq!(descriptor.driver, Driver::Postgres);
        assert_eq!(descriptor.connection_string, "dbname=chado host=localhost");
        assert!(config.summary().contains("postgres"));
    }

    #[test]
    fn test_datasource_kept_verbatim() {
        let config = TestChadoConfig::from_raw(RawConfig {
            dsource: Some(" host=db ".to_string()),
            bundle_dir: None,
        });
        assert_eq!(config.datasource.as_deref(), Some(" host=db "));

        let config = TestChadoConfig::from_raw(RawConfig {
            dsource: Some(" ".to_string()),
            bundle_dir: Some("  ".to_string()),
        });
        assert_eq!(config.descriptor().driver, Driver::Postgres);
        assert!(config.bundle_dir.is_none());

        let config = TestChadoConfig::from_raw(RawConfig {
            dsource: Some(String::new()),
            bundle_dir: None,
        });
        assert_eq!(config.descriptor().driver, Driver::Sqlite);
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testchado.toml");
        std::fs::write(&path, "bundle_dir = \"/opt/chado\"\n").unwrap();

        let config = TestChadoConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.bundle_dir.as_deref(), Some("/opt/chado"));
    }

    #[test]
    fn test_write_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testchado.toml");
        let path = path.to_string_lossy().to_string();

        TestChadoConfig::write_template(&path).unwrap();
        let config = TestChadoConfig::new(&Some(path)).unwrap();
        assert!(config.bundle_dir.is_none() || std::env::var("TC_BUNDLE_DIR").is_ok());
    }

    #[test]
    fn test_driver_names() {
        assert_eq!(Driver::Postgres.to_string(), "postgres");
        assert_eq!(Driver::Sqlite.as_str(), "sqlite");
    }
}
