//! Core database infrastructure
//!
//! This module provides the foundational components the backend managers are
//! built from:
//! - `SqliteConn` / `PgConn`: connection wrappers for each engine
//! - `SqlHandle`: engine-neutral statement execution and scalar queries
//! - `SchemaBundle`: name-keyed DDL and fixture text
//! - `SqlStatements`: streaming reader for files of SQL statements

mod bundle;
mod connection;
mod handle;
#[cfg(feature = "postgres")]
mod pg_connection;
mod statements;

pub use bundle::{SchemaBundle, DEFAULT_FIXTURE};
pub use connection::{SqliteConn, SQLITE_MEMORY};
pub use handle::{SqlHandle, SqlValue};
#[cfg(feature = "postgres")]
pub use pg_connection::PgConn;
pub use statements::SqlStatements;
