//! Backend managers
//!
//! A manager owns one live connection and the schema bundle, and implements the
//! chado lifecycle for its engine:
//!
//! ```text
//! deploy_schema ──► load_*_fixture ──► (assertions) ──► drop_schema / reset_schema
//! ```
//!
//! - **postgres**: every manager deploys into its own randomly named schema of a
//!   shared cluster; dropping removes that schema and picks a new name.
//! - **sqlite**: every manager owns a private in-memory database; dropping
//!   removes each table from it.
//!
//! Fixture loading is shared by both engines through the default methods of
//! [`BackendManager`].

mod namespace;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

pub use namespace::{SchemaNamespace, MAX_NAMESPACE_LEN, MIN_NAMESPACE_LEN};
#[cfg(feature = "postgres")]
pub use postgres::PostgresManager;
pub use sqlite::SqliteManager;

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{DatasourceDescriptor, Driver, TestChadoConfig};
use crate::database::core::{SchemaBundle, SqlHandle, SqlStatements, DEFAULT_FIXTURE};
use crate::error::{ChadoError, Result};

/// Lifecycle contract shared by every backend
pub trait BackendManager {
    /// Engine behind this manager
    fn driver(&self) -> Driver;

    /// Name of the database; neither backend has one
    fn database(&self) -> &str {
        ""
    }

    /// Connection string the manager was built with
    fn data_source(&self) -> &str;

    /// DDL and fixture source
    fn bundle(&self) -> &SchemaBundle;

    /// Whether a schema is currently deployed
    fn is_loaded(&self) -> bool;

    /// Statement execution against the live connection
    fn handle(&self) -> &dyn SqlHandle;

    /// Create every chado table. On failure nothing is left marked as loaded.
    fn deploy_schema(&mut self) -> Result<()>;

    /// Remove every chado table. Dropping an empty schema succeeds.
    fn drop_schema(&mut self) -> Result<()>;

    /// Application tables of the current isolation unit
    fn table_names(&self) -> Result<Vec<String>>;

    /// Drop followed by deploy
    ///
    /// Not atomic: when deploy fails after a successful drop the manager is
    /// left without a schema.
    fn reset_schema(&mut self) -> Result<()> {
        self.drop_schema()?;
        self.deploy_schema()
    }

    /// Chado DDL for this manager's driver
    fn schema_ddl(&self) -> Result<&str> {
        self.bundle().schema_ddl(self.driver())
    }

    /// Load the default fixture: organisms, sequence and relation ontologies
    fn load_default_fixture(&mut self) -> Result<()> {
        load_bundled_fixture(self, DEFAULT_FIXTURE)
    }

    /// Load one of the bundled presets, e.g. `cvprop` or `eco`
    ///
    /// `default` is reserved for [`load_default_fixture`](Self::load_default_fixture)
    /// and is reported as not found here.
    fn load_preset_fixture(&mut self, name: &str) -> Result<()> {
        if !self.is_loaded() {
            return Err(ChadoError::State);
        }
        if name == DEFAULT_FIXTURE {
            return Err(ChadoError::FixtureNotFound(name.to_string()));
        }
        load_bundled_fixture(self, name)
    }

    /// Execute a file of SQL statements, one statement at a time
    ///
    /// Unlike the bundled fixtures this does not require a deployed schema.
    fn load_custom_fixture(&mut self, path: &Path) -> Result<()> {
        if !self.is_loaded() {
            warn!(
                "Loading custom fixture {} before the schema is deployed",
                path.display()
            );
        }
        load_statement_file(self.handle(), path).map(|count| {
            info!(
                "Loaded custom fixture {} ({} statements)",
                path.display(),
                count
            );
        })
    }
}

fn load_bundled_fixture<M: BackendManager + ?Sized>(manager: &M, name: &str) -> Result<()> {
    if !manager.is_loaded() {
        return Err(ChadoError::State);
    }
    let sql = manager.bundle().fixture(manager.driver(), name)?;
    manager
        .handle()
        .execute_batch(sql)
        .map_err(|e| ChadoError::fixture(name, e))?;
    info!("Loaded {} fixture into {} backend", name, manager.driver());
    Ok(())
}

/// Execute every statement of the file at `path`, returning how many ran
pub fn load_statement_file(handle: &dyn SqlHandle, path: &Path) -> Result<usize> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ChadoError::FixtureNotFound(name.clone()),
        _ => ChadoError::Configuration(format!("unable to open {}: {}", name, e)),
    })?;

    let mut count = 0;
    for stmt in SqlStatements::new(BufReader::new(file)) {
        let stmt = stmt.map_err(|e| ChadoError::fixture(&name, e))?;
        count += 1;
        handle
            .execute_batch(&stmt)
            .map_err(|e| ChadoError::fixture(&name, format!("statement {}: {}", count, e)))?;
    }
    Ok(count)
}

/// Build a manager for `descriptor`
///
/// Failing to reach the backend is returned as a configuration error; test code
/// cannot proceed without one and should abort.
pub fn connect(
    descriptor: &DatasourceDescriptor,
    bundle: SchemaBundle,
) -> Result<Box<dyn BackendManager>> {
    match descriptor.driver {
        Driver::Sqlite => Ok(Box::new(SqliteManager::open(
            &descriptor.connection_string,
            bundle,
        )?)),
        #[cfg(feature = "postgres")]
        Driver::Postgres => Ok(Box::new(PostgresManager::with_bundle(
            &descriptor.connection_string,
            bundle,
        )?)),
        #[cfg(not(feature = "postgres"))]
        Driver::Postgres => Err(ChadoError::Unsupported(Driver::Postgres.to_string())),
    }
}

/// Build a manager from an explicit configuration
pub fn manager_from_config(config: &TestChadoConfig) -> Result<Box<dyn BackendManager>> {
    let bundle = match &config.bundle_dir {
        Some(dir) => SchemaBundle::from_dir(dir)?,
        None => SchemaBundle::embedded(),
    };
    connect(&config.descriptor(), bundle)
}

/// Build a manager from the environment
///
/// A non-empty `TC_DSOURCE` selects PostgreSQL with that connection string;
/// otherwise an in-memory SQLite manager is returned.
pub fn new_manager() -> Result<Box<dyn BackendManager>> {
    let config =
        TestChadoConfig::from_env().map_err(|e| ChadoError::Configuration(e.to_string()))?;
    manager_from_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_connect_sqlite() {
        let manager = connect(
            &DatasourceDescriptor::sqlite_memory(),
            SchemaBundle::embedded(),
        )
        .unwrap();
        assert_eq!(manager.driver(), Driver::Sqlite);
        assert_eq!(manager.data_source(), ":memory:");
        assert_eq!(manager.database(), "");
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_manager_from_config_default() {
        let manager = manager_from_config(&TestChadoConfig::default()).unwrap();
        assert_eq!(manager.driver(), Driver::Sqlite);
    }

    #[test]
    fn test_manager_from_missing_bundle_dir() {
        let config = TestChadoConfig {
            datasource: None,
            bundle_dir: Some("/nonexistent/testchado/bundle".to_string()),
        };
        assert!(matches!(
            manager_from_config(&config),
            Err(ChadoError::Configuration(_))
        ));
    }

    #[test]
    fn test_trait_object_lifecycle() {
        let mut manager = connect(
            &DatasourceDescriptor::sqlite_memory(),
            SchemaBundle::embedded(),
        )
        .unwrap();
        assert!(matches!(
            manager.load_default_fixture(),
            Err(ChadoError::State)
        ));
        manager.deploy_schema().unwrap();
        manager.load_default_fixture().unwrap();
        manager.reset_schema().unwrap();
        assert!(manager.is_loaded());
        assert_eq!(
            manager
                .handle()
                .query_scalar("SELECT count(*) FROM organism", &[])
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_load_statement_file() {
        let mut manager = SqliteManager::new().unwrap();
        manager.deploy_schema().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-- two organisms").unwrap();
        writeln!(
            file,
            "INSERT INTO organism (genus, species, common_name) VALUES ('Homo', 'sapiens', 'human');"
        )
        .unwrap();
        writeln!(
            file,
            "INSERT INTO organism (genus, species, common_name) VALUES ('Mus', 'musculus', 'mouse');"
        )
        .unwrap();
        file.flush().unwrap();

        let count = load_statement_file(manager.handle(), file.path()).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_load_statement_file_reports_statement() {
        let manager = SqliteManager::new().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CREATE TABLE t (id INTEGER);").unwrap();
        writeln!(file, "INSERT INTO missing VALUES (1);").unwrap();
        file.flush().unwrap();

        let err = load_statement_file(manager.handle(), file.path()).unwrap_err();
        assert!(matches!(err, ChadoError::Fixture { .. }));
        assert!(err.to_string().contains("statement 2"));
    }

    #[test]
    fn test_load_statement_file_missing() {
        let manager = SqliteManager::new().unwrap();
        let err = load_statement_file(manager.handle(), Path::new("/nonexistent/fixture.sql"))
            .unwrap_err();
        assert!(matches!(err, ChadoError::FixtureNotFound(_)));
    }
}
