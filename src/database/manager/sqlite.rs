//! SQLite backend
//!
//! Each manager owns a private in-memory database, so isolation comes for free.
//! SQLite has no cascading schema drop, so teardown removes every table from
//! the catalog one by one inside a single transaction. Deploy runs its DDL in
//! a transaction too, so a failed deploy leaves existing tables untouched.

use anyhow::anyhow;
use tracing::{debug, info, warn};

use super::BackendManager;
use crate::config::Driver;
use crate::database::core::{SchemaBundle, SqlHandle, SqliteConn, SQLITE_MEMORY};
use crate::error::{ChadoError, Result};

/// Chado lifecycle on an in-memory SQLite database
pub struct SqliteManager {
    db: SqliteConn,
    datasource: String,
    bundle: SchemaBundle,
    loaded: bool,
}

impl SqliteManager {
    /// In-memory manager using the embedded bundle
    pub fn new() -> Result<Self> {
        Self::with_bundle(SchemaBundle::embedded())
    }

    /// In-memory manager using `bundle`
    pub fn with_bundle(bundle: SchemaBundle) -> Result<Self> {
        Self::open(SQLITE_MEMORY, bundle)
    }

    /// Manager over the database at `datasource` (`:memory:` for a private one)
    pub fn open(datasource: &str, bundle: SchemaBundle) -> Result<Self> {
        let db = SqliteConn::open(Some(datasource))
            .map_err(|e| ChadoError::Configuration(e.to_string()))?;
        info!("Opened SQLite backend at {}", datasource);
        Ok(SqliteManager {
            db,
            datasource: datasource.to_string(),
            bundle,
            loaded: false,
        })
    }

    /// The underlying connection
    pub fn conn(&self) -> &SqliteConn {
        &self.db
    }

    /// Drop every view and table, returning how many tables went away
    ///
    /// Foreign keys are switched off for the duration so tables can go in
    /// catalog order.
    fn drop_all(&self) -> anyhow::Result<usize> {
        self.db.set_foreign_keys(false)?;
        let result = self.drop_all_in_transaction();
        let restored = self.db.set_foreign_keys(true);
        let dropped = result?;
        restored?;
        Ok(dropped)
    }

    /// Run the DDL batch in one transaction; a failure leaves the catalog as it was
    fn apply_ddl(&self, ddl: &str) -> anyhow::Result<()> {
        let tx = self.db.transaction()?;
        tx.execute_batch(ddl)
            .map_err(|e| anyhow!("Failed to execute schema DDL: {}", e))?;
        tx.commit()
            .map_err(|e| anyhow!("Failed to commit schema deploy: {}", e))
    }

    fn drop_all_in_transaction(&self) -> anyhow::Result<usize> {
        let views = self.db.object_names("view")?;
        let tables = self.db.table_names()?;

        let tx = self.db.transaction()?;
        for view in &views {
            tx.execute(&format!("DROP VIEW IF EXISTS \"{}\"", view), [])
                .map_err(|e| anyhow!("Failed to drop view {}: {}", view, e))?;
        }
        for table in &tables {
            tx.execute(&format!("DROP TABLE IF EXISTS \"{}\"", table), [])
                .map_err(|e| anyhow!("Failed to drop table {}: {}", table, e))?;
        }
        tx.commit()
            .map_err(|e| anyhow!("Failed to commit schema drop: {}", e))?;
        Ok(tables.len())
    }
}

impl BackendManager for SqliteManager {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn data_source(&self) -> &str {
        &self.datasource
    }

    fn bundle(&self) -> &SchemaBundle {
        &self.bundle
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn handle(&self) -> &dyn SqlHandle {
        &self.db
    }

    fn deploy_schema(&mut self) -> Result<()> {
        self.loaded = false;
        let ddl = self.bundle.schema_ddl(Driver::Sqlite)?;

        if let Err(e) = self.apply_ddl(ddl) {
            let err = ChadoError::schema("deploy", e);
            warn!("SQLite schema deploy rolled back: {}", err);
            return Err(err);
        }

        self.loaded = true;
        info!("Deployed chado schema into SQLite backend");
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        self.loaded = false;
        let dropped = self
            .drop_all()
            .map_err(|e| ChadoError::schema("drop", e))?;
        debug!("Dropped {} tables from SQLite backend", dropped);
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        self.db
            .table_names()
            .map_err(|e| ChadoError::Query(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::DEFAULT_FIXTURE;
    use std::io::Write;

    fn deployed() -> SqliteManager {
        let mut dbm = SqliteManager::new().unwrap();
        dbm.deploy_schema().unwrap();
        dbm
    }

    fn scalar(dbm: &SqliteManager, sql: &str) -> i64 {
        dbm.handle().query_scalar(sql, &[]).unwrap()
    }

    #[test]
    fn test_sqlite_manager() {
        let dbm = SqliteManager::new().unwrap();
        assert_eq!(dbm.data_source(), ":memory:");
        assert_eq!(dbm.driver(), Driver::Sqlite);
        assert_eq!(dbm.database(), "");
        assert!(!dbm.is_loaded());
        assert!(dbm.schema_ddl().unwrap().contains("feature"));
    }

    #[test]
    fn test_deploy_and_drop() {
        let mut dbm = deployed();
        assert!(dbm.is_loaded());
        assert!(dbm.conn().table_exists("feature").unwrap());
        assert!(!dbm.table_names().unwrap().is_empty());

        dbm.drop_schema().unwrap();
        assert!(!dbm.is_loaded());
        assert!(dbm.table_names().unwrap().is_empty());
        assert!(dbm.conn().object_names("view").unwrap().is_empty());
    }

    #[test]
    fn test_drop_is_idempotent() {
        let mut dbm = deployed();
        dbm.drop_schema().unwrap();
        dbm.drop_schema().unwrap();
        assert!(dbm.table_names().unwrap().is_empty());

        let mut fresh = SqliteManager::new().unwrap();
        fresh.drop_schema().unwrap();
    }

    #[test]
    fn test_drop_with_data_and_foreign_keys() {
        let mut dbm = deployed();
        dbm.load_default_fixture().unwrap();
        dbm.drop_schema().unwrap();
        assert!(dbm.table_names().unwrap().is_empty());
    }

    #[test]
    fn test_reset_schema() {
        let mut dbm = deployed();
        let tables = dbm.table_names().unwrap();
        dbm.load_default_fixture().unwrap();

        dbm.reset_schema().unwrap();
        assert!(dbm.is_loaded());
        assert_eq!(dbm.table_names().unwrap(), tables);
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM organism"), 0);
    }

    #[test]
    fn test_reset_from_empty() {
        let mut dbm = SqliteManager::new().unwrap();
        dbm.reset_schema().unwrap();
        assert!(dbm.is_loaded());
        assert!(dbm.conn().table_exists("cvterm").unwrap());
    }

    #[test]
    fn test_failed_deploy_leaves_nothing_loaded() {
        let bundle = SchemaBundle::from_entries([(
            "chado.sqlite",
            "CREATE TABLE db (db_id INTEGER PRIMARY KEY);\nCREATE TABLE broken (;",
        )]);
        let mut dbm = SqliteManager::with_bundle(bundle).unwrap();

        let err = dbm.deploy_schema().unwrap_err();
        assert!(matches!(err, ChadoError::Schema { operation: "deploy", .. }));
        assert!(!dbm.is_loaded());
        assert!(dbm.table_names().unwrap().is_empty());
    }

    #[test]
    fn test_missing_ddl() {
        let mut dbm = SqliteManager::with_bundle(SchemaBundle::from_entries([])).unwrap();
        assert!(matches!(
            dbm.deploy_schema(),
            Err(ChadoError::Schema { .. })
        ));
        assert!(!dbm.is_loaded());
    }

    #[test]
    fn test_failed_reset_ends_unloaded() {
        let bundle = SchemaBundle::from_entries([("chado.sqlite", "CREATE TABLE broken (;")]);
        let mut dbm = SqliteManager::with_bundle(bundle).unwrap();
        assert!(dbm.reset_schema().is_err());
        assert!(!dbm.is_loaded());
    }

    #[test]
    fn test_failed_redeploy_keeps_existing_schema() {
        let mut dbm = deployed();
        dbm.load_default_fixture().unwrap();
        let tables = dbm.table_names().unwrap();

        let err = dbm.deploy_schema().unwrap_err();
        assert!(matches!(err, ChadoError::Schema { operation: "deploy", .. }));
        assert!(!dbm.is_loaded());
        assert_eq!(dbm.table_names().unwrap(), tables);
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM organism"), 12);
    }

    #[test]
    fn test_failed_deploy_keeps_custom_tables() {
        let bundle = SchemaBundle::from_entries([(
            "chado.sqlite",
            "CREATE TABLE db (db_id INTEGER PRIMARY KEY);\nCREATE TABLE scratch (id INTEGER);",
        )]);
        let mut dbm = SqliteManager::with_bundle(bundle).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CREATE TABLE scratch (id INTEGER);").unwrap();
        writeln!(file, "INSERT INTO scratch VALUES (1);").unwrap();
        file.flush().unwrap();
        dbm.load_custom_fixture(file.path()).unwrap();

        assert!(dbm.deploy_schema().is_err());
        assert_eq!(dbm.table_names().unwrap(), vec!["scratch"]);
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM scratch"), 1);
    }

    #[test]
    fn test_deploy_error_is_brief() {
        let mut dbm = deployed();
        let err = dbm.deploy_schema().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already exists"), "{}", message);
        assert!(!message.contains('\n'));
        assert!(message.len() < 400, "{}", message);
    }

    #[test]
    fn test_load_default_fixture() {
        let mut dbm = SqliteManager::new().unwrap();
        assert!(matches!(
            dbm.load_default_fixture(),
            Err(ChadoError::State)
        ));

        dbm.deploy_schema().unwrap();
        dbm.load_default_fixture().unwrap();

        assert_eq!(scalar(&dbm, "SELECT count(*) FROM organism"), 12);
        let query = "
         SELECT count(cvterm.cvterm_id) counter from CVTERM join CV on CV.CV_ID=CVTERM.CV_ID
         WHERE CV.NAME = 'sequence'
        ";
        assert_eq!(scalar(&dbm, query), 286);
    }

    #[test]
    fn test_load_preset_fixture() {
        let mut dbm = SqliteManager::new().unwrap();
        assert!(matches!(
            dbm.load_preset_fixture("cvprop"),
            Err(ChadoError::State)
        ));

        dbm.deploy_schema().unwrap();
        dbm.load_preset_fixture("cvprop").unwrap();
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM cvterm"), 13);
    }

    #[test]
    fn test_load_eco_preset() {
        let mut dbm = deployed();
        dbm.load_preset_fixture("eco").unwrap();
        assert!(scalar(&dbm, "SELECT count(*) FROM cvterm") > 0);
    }

    #[test]
    fn test_unknown_preset() {
        let mut dbm = deployed();
        assert!(matches!(
            dbm.load_preset_fixture("gene_ontology"),
            Err(ChadoError::FixtureNotFound(_))
        ));
        assert!(dbm.bundle().fixture(Driver::Sqlite, DEFAULT_FIXTURE).is_ok());
    }

    #[test]
    fn test_default_is_not_a_preset() {
        let mut dbm = deployed();
        assert!(matches!(
            dbm.load_preset_fixture(DEFAULT_FIXTURE),
            Err(ChadoError::FixtureNotFound(name)) if name == DEFAULT_FIXTURE
        ));
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM organism"), 0);

        dbm.load_default_fixture().unwrap();
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM organism"), 12);
    }

    #[test]
    fn test_load_custom_fixture() {
        let mut dbm = deployed();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "INSERT INTO db (name) VALUES ('GO');").unwrap();
        writeln!(file, "INSERT INTO db (name) VALUES ('SO');").unwrap();
        file.flush().unwrap();

        dbm.load_custom_fixture(file.path()).unwrap();
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM db"), 2);
    }

    #[test]
    fn test_custom_fixture_without_schema() {
        let mut dbm = SqliteManager::new().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CREATE TABLE scratch (id INTEGER);").unwrap();
        writeln!(file, "INSERT INTO scratch VALUES (1);").unwrap();
        file.flush().unwrap();

        dbm.load_custom_fixture(file.path()).unwrap();
        assert_eq!(scalar(&dbm, "SELECT count(*) FROM scratch"), 1);
    }

    #[test]
    fn test_managers_are_isolated() {
        let mut a = deployed();
        let b = SqliteManager::new().unwrap();
        a.load_default_fixture().unwrap();
        assert!(b.table_names().unwrap().is_empty());
    }
}
