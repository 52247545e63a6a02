//! Existence checks for common chado records

use super::{QueryAssertion, Verdict};
use crate::database::SqlValue;
use crate::error::Result;

const CV_QUERY: &str = "SELECT count(cv_id) FROM cv WHERE name = $1";
const CVTERM_QUERY: &str = "SELECT count(cvterm_id) FROM cvterm WHERE name = $1";
const DBXREF_QUERY: &str = "SELECT count(dbxref_id) FROM dbxref WHERE accession = $1";
const QUALIFIED_DBXREF_QUERY: &str = "
    SELECT count(dbxref.dbxref_id) FROM dbxref JOIN db ON dbxref.db_id = db.db_id
    WHERE dbxref.accession = $1 AND db.name = $2
";
const ORGANISM_QUERY: &str = "SELECT count(organism_id) FROM organism WHERE common_name = $1";
const FEATURE_QUERY: &str = "SELECT count(feature_id) FROM feature WHERE uniquename = $1";

/// Split `DB:accession` on the first colon
///
/// Returns `(Some(db), accession)` for a qualified reference and
/// `(None, input)` otherwise.
pub fn split_dbxref(dbxref: &str) -> (Option<&str>, &str) {
    match dbxref.split_once(':') {
        Some((db, accession)) => (Some(db), accession),
        None => (None, dbxref),
    }
}

impl QueryAssertion<'_> {
    fn exists(
        &self,
        kind: &str,
        value: &str,
        query: &str,
        params: &[SqlValue],
        accept: impl Fn(i64) -> bool,
    ) -> Result<Verdict> {
        let count = self.scalar(query, params)?;
        Ok(Verdict::new(
            accept(count),
            &format!("{} {:?}", kind, value),
            "exist in database",
        ))
    }

    /// A controlled vocabulary namespace named `name` exists exactly once
    pub fn has_cv(&self, name: &str) -> Result<Verdict> {
        self.exists("cv", name, CV_QUERY, &[name.into()], |n| n == 1)
    }

    /// At least one vocabulary term is named `name`
    pub fn has_cvterm(&self, name: &str) -> Result<Verdict> {
        self.exists("cvterm", name, CVTERM_QUERY, &[name.into()], |n| n > 0)
    }

    /// A cross reference exists
    ///
    /// `DB:accession` must match both the db name and the accession; a value
    /// without a colon matches the accession in any db.
    pub fn has_dbxref(&self, dbxref: &str) -> Result<Verdict> {
        match split_dbxref(dbxref) {
            (Some(db), accession) => self.exists(
                "dbxref",
                dbxref,
                QUALIFIED_DBXREF_QUERY,
                &[accession.into(), db.into()],
                |n| n > 0,
            ),
            (None, accession) => {
                self.exists("dbxref", dbxref, DBXREF_QUERY, &[accession.into()], |n| n > 0)
            }
        }
    }

    /// An organism with this common name exists
    pub fn has_organism(&self, common_name: &str) -> Result<Verdict> {
        self.exists(
            "organism",
            common_name,
            ORGANISM_QUERY,
            &[common_name.into()],
            |n| n > 0,
        )
    }

    /// A feature with this uniquename exists
    pub fn has_feature(&self, uniquename: &str) -> Result<Verdict> {
        self.exists(
            "feature",
            uniquename,
            FEATURE_QUERY,
            &[uniquename.into()],
            |n| n > 0,
        )
    }
}
