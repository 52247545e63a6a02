//! PostgreSQL backend
//!
//! Many managers can point at the same cluster: each one deploys chado into its
//! own randomly named schema and works through `search_path`. Dropping removes
//! that schema with `CASCADE` and picks a fresh name for the next deploy.
//! Schemas left behind by a crashed process are not cleaned up.

use tracing::{debug, info};

use super::namespace::SchemaNamespace;
use super::BackendManager;
use crate::config::Driver;
use crate::database::core::{PgConn, SchemaBundle, SqlHandle};
use crate::error::{ChadoError, Result};

/// Chado lifecycle on a schema of a shared PostgreSQL cluster
pub struct PostgresManager {
    conn: PgConn,
    datasource: String,
    bundle: SchemaBundle,
    namespace: SchemaNamespace,
    loaded: bool,
}

impl PostgresManager {
    /// Connect using the embedded bundle
    ///
    /// `datasource` is a libpq key/value string such as
    /// `dbname=chado user=chado host=localhost sslmode=disable`, or a URL.
    pub fn connect(datasource: &str) -> Result<Self> {
        Self::with_bundle(datasource, SchemaBundle::embedded())
    }

    /// Connect using `bundle`
    pub fn with_bundle(datasource: &str, bundle: SchemaBundle) -> Result<Self> {
        let conn =
            PgConn::connect(datasource).map_err(|e| ChadoError::Configuration(e.to_string()))?;
        let namespace = SchemaNamespace::generate();
        info!("Connected to postgres backend, schema namespace {}", namespace);
        Ok(PostgresManager {
            conn,
            datasource: datasource.to_string(),
            bundle,
            namespace,
            loaded: false,
        })
    }

    /// Schema the next deploy targets, or the one currently deployed
    pub fn namespace(&self) -> &SchemaNamespace {
        &self.namespace
    }

    /// Tables of an arbitrary schema of the cluster
    pub fn tables_in(&self, namespace: &str) -> Result<Vec<String>> {
        self.conn
            .table_names(namespace)
            .map_err(|e| ChadoError::Query(e.to_string()))
    }

    /// The underlying connection
    pub fn conn(&self) -> &PgConn {
        &self.conn
    }
}

impl BackendManager for PostgresManager {
    fn driver(&self) -> Driver {
        Driver::Postgres
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
        &self.conn
    }

    fn deploy_schema(&mut self) -> Result<()> {
        self.loaded = false;
        let ns = self.namespace.as_str();
        let ddl = self.bundle.schema_ddl(Driver::Postgres)?;
        let script = format!(
            "DROP SCHEMA IF EXISTS {ns} CASCADE;\nCREATE SCHEMA {ns};\nSET search_path TO {ns};\n{ddl}",
            ns = ns,
            ddl = ddl
        );

        self.conn
            .batch_in_transaction(&script)
            .map_err(|e| ChadoError::schema("deploy", e))?;

        self.loaded = true;
        info!("Deployed chado schema into postgres schema {}", self.namespace);
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        self.loaded = false;
        let sql = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.namespace);
        self.conn
            .batch_in_transaction(&sql)
            .map_err(|e| ChadoError::schema("drop", e))?;

        let dropped = std::mem::replace(&mut self.namespace, SchemaNamespace::generate());
        debug!(
            "Dropped postgres schema {}, next namespace {}",
            dropped, self.namespace
        );
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        self.tables_in(self.namespace.as_str())
    }
}
