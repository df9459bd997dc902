//! Error types for mapping runs.

use crate::mapping::Mapping;
use crate::report::SearchReport;
use ctxmap_stats::{CountError, ScoreError, TableError};

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// Rejected before the search starts.
    #[error("invalid {field}: {message}")]
    InvalidParameter { field: &'static str, message: String },

    /// A count query failed; the run is aborted.
    #[error("count oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("malformed ontology `{ontology}`: {message}")]
    MalformedGraph { ontology: String, message: String },
}

impl MappingError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            message: message.into(),
        }
    }

    pub fn malformed(ontology: &str, message: impl Into<String>) -> Self {
        Self::MalformedGraph {
            ontology: ontology.to_string(),
            message: message.into(),
        }
    }
}

impl From<CountError> for MappingError {
    fn from(err: CountError) -> Self {
        Self::OracleUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<TableError> for MappingError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Count(inner) => inner.into(),
            TableError::InconsistentCounts { .. } | TableError::CountOverflow { .. } => {
                Self::OracleUnavailable {
                    message: err.to_string(),
                }
            }
            TableError::TooManyAncestors { .. } | TableError::InvalidShape { .. } => {
                Self::InvalidParameter {
                    field: "ancestors",
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<ScoreError> for MappingError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::InvalidParameter { field, message } => {
                Self::InvalidParameter { field, message }
            }
        }
    }
}

/// A run that stopped on an error. Mappings emitted before the failure are
/// kept in `partial`.
#[derive(Debug, thiserror::Error)]
#[error("mapping run failed after {} mappings: {error}", .partial.len())]
pub struct SearchFailure {
    #[source]
    pub error: MappingError,
    pub partial: Vec<Mapping>,
    pub report: SearchReport,
}
