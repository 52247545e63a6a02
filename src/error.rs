//! Error types shared by the managers and the assertion layer

/// Errors returned by schema lifecycle, fixture loading and query assertions
#[derive(Debug, thiserror::Error)]
pub enum ChadoError {
    /// Unreadable bundle, bad connection string or unusable configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A fixture was requested before the schema was deployed
    #[error("chado schema is not loaded")]
    State,

    /// DDL could not be fetched or executed
    #[error("failed to {operation} chado schema: {reason}")]
    Schema {
        operation: &'static str,
        reason: String,
    },

    /// An assertion query failed to execute or decode
    #[error("could not execute query: {0}")]
    Query(String),

    /// No bundle entry matches the requested fixture
    #[error("fixture '{0}' not found")]
    FixtureNotFound(String),

    /// Fixture SQL failed to execute
    #[error("failed to load fixture '{name}': {reason}")]
    Fixture { name: String, reason: String },

    /// The requested driver is not compiled into this build
    #[error("driver '{0}' is not supported by this build")]
    Unsupported(String),
}

/// Longest reason kept from an engine error
const MAX_REASON_LEN: usize = 240;

/// First line of an engine error, capped at [`MAX_REASON_LEN`] characters
///
/// SQLite echoes the remaining SQL text in syntax errors, which for a DDL
/// batch runs to kilobytes.
fn brief(reason: impl ToString) -> String {
    let reason = reason.to_string();
    let line = reason.lines().next().unwrap_or("").trim_end();
    match line.char_indices().nth(MAX_REASON_LEN) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_string(),
    }
}

impl ChadoError {
    pub(crate) fn schema(operation: &'static str, reason: impl ToString) -> Self {
        ChadoError::Schema {
            operation,
            reason: brief(reason),
        }
    }

    pub(crate) fn fixture(name: &str, reason: impl ToString) -> Self {
        ChadoError::Fixture {
            name: name.to_string(),
            reason: brief(reason),
        }
    }

    /// Short stable identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ChadoError::Configuration(_) => "configuration",
            ChadoError::State => "state",
            ChadoError::Schema { .. } => "schema",
            ChadoError::Query(_) => "query",
            ChadoError::FixtureNotFound(_) => "fixture_not_found",
            ChadoError::Fixture { .. } => "fixture",
            ChadoError::Unsupported(_) => "unsupported",
        }
    }
}

/// Result alias used across the crate
pub type Result<T, E = ChadoError> = std::result::Result<T, E>;
