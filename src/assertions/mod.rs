//! Query assertions against a deployed chado schema
//!
//! A [`QueryAssertion`] borrows the manager under test and evaluates ad hoc SQL
//! against its connection. Each check yields a [`Verdict`] carrying whether it
//! matched plus the positive and negated explanations, ready for whatever
//! assertion framework reports them.
//!
//! ```rust,ignore
//! use testchado::assertions::QueryAssertion;
//! use testchado::SqlValue;
//!
//! let check = QueryAssertion::new(&*chado);
//! assert!(check.row_count("SELECT * FROM organism", 12)?.matched);
//! assert!(check.scalar_count("SELECT count(*) FROM organism", 12)?.matched);
//!
//! let query = "SELECT count(*) FROM cvterm JOIN cv ON cv.cv_id = cvterm.cv_id
//!              WHERE cv.name = $1 AND cvterm.is_obsolete = $2";
//! let params = [SqlValue::from("sequence"), SqlValue::from(0)];
//! assert!(check.parameterized_scalar_count(query, &params, 286)?.matched);
//! ```

mod chado;

pub use chado::split_dbxref;

use std::fmt;

use crate::database::{BackendManager, SqlValue};
use crate::error::{ChadoError, Result};

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub matched: bool,
    /// Explanation when the check was expected to match and did not
    pub failure_message: String,
    /// Explanation when the check was expected not to match and did
    pub negated_failure_message: String,
}

impl Verdict {
    fn new(matched: bool, subject: &str, expectation: &str) -> Self {
        Verdict {
            matched,
            failure_message: format!("Expected\n\t{}\nto {}", subject, expectation),
            negated_failure_message: format!("Expected\n\t{}\nnot to {}", subject, expectation),
        }
    }

    /// The message relevant to `expected`, or `None` when the outcome agrees
    pub fn message_for(&self, expected: bool) -> Option<&str> {
        match (expected, self.matched) {
            (true, false) => Some(self.failure_message.as_str()),
            (false, true) => Some(self.negated_failure_message.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matched {
            write!(f, "matched")
        } else {
            write!(f, "{}", self.failure_message)
        }
    }
}

/// Evaluates queries against the connection of one manager
pub struct QueryAssertion<'a> {
    manager: &'a dyn BackendManager,
}

impl<'a> QueryAssertion<'a> {
    pub fn new(manager: &'a dyn BackendManager) -> Self {
        QueryAssertion { manager }
    }

    /// The manager being checked
    pub fn manager(&self) -> &'a dyn BackendManager {
        self.manager
    }

    /// Counts the rows `query` returns by iterating all of them
    pub fn row_count(&self, query: &str, expected: u64) -> Result<Verdict> {
        let actual = self
            .manager
            .handle()
            .count_rows(query)
            .map_err(|e| ChadoError::Query(e.to_string()))?;
        Ok(Verdict::new(
            actual == expected,
            query.trim(),
            &format!("return {} rows from database (got {})", expected, actual),
        ))
    }

    /// Compares the single integer `query` yields
    ///
    /// A result with no rows or with several rows is a query error.
    pub fn scalar_count(&self, query: &str, expected: i64) -> Result<Verdict> {
        self.parameterized_scalar_count(query, &[], expected)
    }

    /// Like [`scalar_count`](Self::scalar_count) with positional bind values
    pub fn parameterized_scalar_count(
        &self,
        query: &str,
        params: &[SqlValue],
        expected: i64,
    ) -> Result<Verdict> {
        let actual = self.scalar(query, params)?;
        let subject = if params.is_empty() {
            query.trim().to_string()
        } else {
            format!("{} with params {}", query.trim(), join_params(params))
        };
        Ok(Verdict::new(
            actual == expected,
            &subject,
            &format!("match count {} from database (got {})", expected, actual),
        ))
    }

    fn scalar(&self, query: &str, params: &[SqlValue]) -> Result<i64> {
        self.manager
            .handle()
            .query_scalar(query, params)
            .map_err(|e| ChadoError::Query(e.to_string()))
    }
}

fn join_params(params: &[SqlValue]) -> String {
    let parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
