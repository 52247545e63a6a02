#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! testchado - disposable chado databases for tests
//!
//! testchado provisions, deploys, resets and tears down an isolated instance of
//! the [chado](http://gmod.org/wiki/Chado) schema for each test, and provides
//! query assertions to verify the database afterwards.
//!
//! # Backends
//!
//! | Backend | Isolation unit | Selected when |
//! |---------|----------------|---------------|
//! | SQLite | private in-memory database per manager | `TC_DSOURCE` is unset or empty |
//! | PostgreSQL | randomly named schema per manager in a shared cluster | `TC_DSOURCE` holds a connection string |
//!
//! The PostgreSQL backend sits behind the default `postgres` feature:
//!
//! ```toml
//! # SQLite only
//! testchado = { version = "0.3", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: connections, the schema bundle and backend managers
//!   - `core`: connection wrappers, `SqlHandle`, `SchemaBundle`, `SqlStatements`
//!   - `manager`: `BackendManager` with `SqliteManager` and `PostgresManager`
//! - **[`assertions`]**: `QueryAssertion` row/scalar counts and chado
//!   existence checks
//! - **[`config`]**: backend selection from the environment
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use testchado::{new_manager, BackendManager, QueryAssertion};
//!
//! #[test]
//! fn quick_start() -> testchado::Result<()> {
//!     let mut chado = new_manager()?;
//!     chado.deploy_schema()?;
//!     chado.load_default_fixture()?;
//!
//!     let check = QueryAssertion::new(&*chado);
//!     assert!(check.has_cv("sequence")?.matched);
//!     for name in ["gene", "match_part", "has_agent"] {
//!         assert!(check.has_cvterm(name)?.matched);
//!     }
//!     assert!(check.has_dbxref("SO:0000704")?.matched);
//!     assert!(check.scalar_count("SELECT count(*) FROM organism", 12)?.matched);
//!
//!     chado.drop_schema()
//! }
//! ```
//!
//! To run against PostgreSQL:
//!
//! ```text
//! TC_DSOURCE="dbname=chado user=chado password=chado host=localhost sslmode=disable" cargo test
//! ```
//!
//! # Fixtures
//!
//! - `load_default_fixture()`: organisms plus the sequence and relation ontologies
//! - `load_preset_fixture("cvprop")` / `load_preset_fixture("eco")`
//! - `load_custom_fixture(path)`: any file of backend-compatible SQL statements

pub mod assertions;
pub mod config;
pub mod database;
pub mod error;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{DatasourceDescriptor, Driver, TestChadoConfig, DATASOURCE_ENV};

// =============================================================================
// Errors
// =============================================================================

pub use error::{ChadoError, Result};

// =============================================================================
// Database Module
// =============================================================================

pub use database::{
    connect, load_statement_file, manager_from_config, new_manager, BackendManager,
    SchemaBundle, SchemaNamespace, SqlHandle, SqlStatements, SqlValue, SqliteConn,
    SqliteManager, DEFAULT_FIXTURE,
};

#[cfg(feature = "postgres")]
pub use database::{PgConn, PostgresManager};

// =============================================================================
// Assertions
// =============================================================================

pub use assertions::{QueryAssertion, Verdict};
