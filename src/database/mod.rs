//! Database module
//!
//! This module provides the chado lifecycle for tests, organized into:
//!
//! - **core**: connection wrappers, the schema bundle and the statement reader
//! - **manager**: backend managers implementing deploy/drop/reset/fixture loading
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # SQLite connection wrapper
//! │   ├── pg_connection# PostgreSQL connection wrapper (feature = "postgres")
//! │   ├── handle       # SqlHandle trait and bind values
//! │   ├── bundle       # DDL / fixture resource bundle
//! │   └── statements   # streaming SQL statement reader
//! │
//! └── manager/         # Lifecycle
//!     ├── sqlite       # private in-memory instance per manager
//!     ├── postgres     # random schema per manager in a shared cluster
//!     └── namespace    # schema name generation
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use testchado::database::{new_manager, BackendManager};
//!
//! // SQLite unless TC_DSOURCE is set
//! let mut chado = new_manager()?;
//! chado.deploy_schema()?;
//! chado.load_default_fixture()?;
//!
//! // ... run the code under test ...
//!
//! chado.drop_schema()?;
//! ```

pub mod core;
pub mod manager;

pub use core::{
    SchemaBundle, SqlHandle, SqlStatements, SqlValue, SqliteConn, DEFAULT_FIXTURE, SQLITE_MEMORY,
};
#[cfg(feature = "postgres")]
pub use core::PgConn;

pub use manager::{
    connect, load_statement_file, manager_from_config, new_manager, BackendManager,
    SchemaNamespace, SqliteManager,
};
#[cfg(feature = "postgres")]
pub use manager::PostgresManager;
