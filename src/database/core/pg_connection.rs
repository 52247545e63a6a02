//! PostgreSQL connection management
//!
//! `PgConn` wraps a synchronous `postgres::Client`. Lifecycle operations borrow
//! the client mutably through [`PgConn::client_mut`]; query assertions go through
//! the [`SqlHandle`] impl, which borrows it for the duration of one call.

use anyhow::{anyhow, Result};
use bytes::BytesMut;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::{Client, NoTls, Row};
use std::cell::RefCell;

use super::handle::{SqlHandle, SqlValue};

/// PostgreSQL connection wrapper
pub struct PgConn {
    client: RefCell<Client>,
}

impl PgConn {
    /// Connect using a libpq-style key/value string or a `postgresql://` URL
    pub fn connect(datasource: &str) -> Result<Self> {
        let client = Client::connect(datasource, NoTls)
            .map_err(|e| anyhow!("Failed to connect to postgres: {}", e))?;
        Ok(PgConn {
            client: RefCell::new(client),
        })
    }

    /// Exclusive access to the client for transactional work
    pub fn client_mut(&mut self) -> &mut Client {
        self.client.get_mut()
    }

    /// Run `sql` as one transaction, rolled back on any failure
    pub fn batch_in_transaction(&mut self, sql: &str) -> Result<()> {
        let mut tx = self
            .client_mut()
            .transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;
        tx.batch_execute(sql)
            .map_err(|e| anyhow!("Failed to execute SQL batch: {}", e))?;
        tx.commit()
            .map_err(|e| anyhow!("Failed to commit transaction: {}", e))
    }

    /// List the tables of one schema
    pub fn table_names(&self, schema: &str) -> Result<Vec<String>> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT table_name::text FROM information_schema.tables WHERE table_schema = $1 ORDER BY table_name",
                &[&schema],
            )
            .map_err(|e| anyhow!("Failed to read catalog: {}", e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| anyhow!("Failed to read catalog row: {}", e))
            })
            .collect()
    }
}

fn decode_scalar(row: &Row) -> Result<i64> {
    if let Ok(v) = row.try_get::<_, i64>(0) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<_, i32>(0) {
        return Ok(v.into());
    }
    row.try_get::<_, i16>(0)
        .map(i64::from)
        .map_err(|e| anyhow!("Failed to decode scalar: {}", e))
}

impl SqlHandle for PgConn {
    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.client
            .borrow_mut()
            .batch_execute(sql)
            .map_err(|e| anyhow!("Failed to execute SQL batch: {}", e))
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        self.client
            .borrow_mut()
            .execute(sql, &[])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    fn count_rows(&self, sql: &str) -> Result<u64> {
        let rows = self
            .client
            .borrow_mut()
            .query(sql, &[])
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;
        Ok(rows.iter().count() as u64)
    }

    fn query_scalar(&self, sql: &str, params: &[SqlValue]) -> Result<i64> {
        let bound: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .borrow_mut()
            .query(sql, &bound)
            .map_err(|e| anyhow!("Failed to run query: {}", e))?;
        match rows.as_slice() {
            [row] => decode_scalar(row),
            [] => Err(anyhow!("Query returned no rows")),
            _ => Err(anyhow!("Query returned more than one row")),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => {
                if *ty == Type::BOOL {
                    b.to_sql(ty, out)
                } else {
                    SqlValue::Integer(i64::from(*b)).to_sql(ty, out)
                }
            }
            // integer parameters follow the width the server inferred
            SqlValue::Integer(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::BOOL {
                    (*i != 0).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql(ty, out)
                } else if *ty == Type::TEXT || *ty == Type::VARCHAR {
                    i.to_string().to_sql(ty, out)
                } else {
                    i.to_sql(ty, out)
                }
            }
            SqlValue::Real(r) => {
                if *ty == Type::FLOAT4 {
                    (*r as f32).to_sql(ty, out)
                } else {
                    r.to_sql(ty, out)
                }
            }
            SqlValue::Text(s) => s.as_str().to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
