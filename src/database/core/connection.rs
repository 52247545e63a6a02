//! SQLite connection management
//!
//! This module provides the SQLite connection wrapper used by the SQLite backend.

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use super::handle::{SqlHandle, SqlValue};

/// Data source string of a private in-memory SQLite instance
pub const SQLITE_MEMORY: &str = ":memory:";

/// SQLite connection wrapper
///
/// `SqliteConn` provides a thin wrapper around a SQLite connection, handling
/// both file-based and in-memory databases with consistent configuration and
/// error handling.
pub struct SqliteConn {
    pub conn: Connection,
}

impl SqliteConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None` or `:memory:`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) if p != SQLITE_MEMORY => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            _ => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = SqliteConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn configure(&self) -> Result<()> {
        // Store temp tables in memory
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        self.set_foreign_keys(true)
    }

    /// Toggle foreign key enforcement
    ///
    /// SQLite ignores this pragma inside an open transaction.
    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "PRAGMA foreign_keys=ON"
        } else {
            "PRAGMA foreign_keys=OFF"
        };
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to toggle foreign keys: {}", e))?;
        Ok(())
    }

    /// Begin an unchecked transaction
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        self.conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// List catalog objects of one type, skipping SQLite's internal tables
    pub fn object_names(&self, object_type: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| anyhow!("Failed to prepare catalog query: {}", e))?;

        let names = stmt
            .query_map([object_type], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to read catalog: {}", e))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| anyhow!("Failed to read catalog row: {}", e))?;
        Ok(names)
    }

    /// List application tables
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.object_names("table")
    }
}

impl SqlHandle for SqliteConn {
    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| anyhow!("Failed to execute SQL batch: {}", e))
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        let changed = self
            .conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))?;
        Ok(changed as u64)
    }

    fn count_rows(&self, sql: &str) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;

        let mut count = 0;
        while rows
            .next()
            .map_err(|e| anyhow!("Failed to fetch row: {}", e))?
            .is_some()
        {
            count += 1;
        }
        Ok(count)
    }

    fn query_scalar(&self, sql: &str, params: &[SqlValue]) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;

        let value: i64 = match rows
            .next()
            .map_err(|e| anyhow!("Failed to fetch row: {}", e))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| anyhow!("Failed to decode scalar: {}", e))?,
            None => return Err(anyhow!("Query returned no rows")),
        };

        if rows
            .next()
            .map_err(|e| anyhow!("Failed to fetch row: {}", e))?
            .is_some()
        {
            return Err(anyhow!("Query returned more than one row"));
        }
        Ok(value)
    }
}
