//! Count-backend contract.
//!
//! A backend answers three kinds of queries over an annotation corpus where
//! every document carries a set of concept ids:
//!
//! - `count(c)`: documents annotated with `c`
//! - `count_in_range(start, length)`: documents annotated with any concept
//!   in `[start, start + length)`
//! - `count_matching(required, excluded)`: documents annotated with every
//!   required concept and none of the excluded ones
//!
//! Queries must be idempotent and free of visible side effects. Retry
//! policy for transient failures belongs to the backend adapter.

use ctxmap_graph::ConceptId;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("count backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CountError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        CountError::Unavailable {
            message: message.into(),
        }
    }
}

pub trait CountBackend: Send + Sync {
    fn count(&self, concept: ConceptId) -> Result<u64, CountError>;

    fn count_in_range(&self, start: ConceptId, length: u64) -> Result<u64, CountError>;

    fn count_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> Result<u64, CountError>;
}

impl<T: CountBackend + ?Sized> CountBackend for &T {
    fn count(&self, concept: ConceptId) -> Result<u64, CountError> {
        (**self).count(concept)
    }

    fn count_in_range(&self, start: ConceptId, length: u64) -> Result<u64, CountError> {
        (**self).count_in_range(start, length)
    }

    fn count_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> Result<u64, CountError> {
        (**self).count_matching(required, excluded)
    }
}

impl<T: CountBackend + ?Sized> CountBackend for Arc<T> {
    fn count(&self, concept: ConceptId) -> Result<u64, CountError> {
        (**self).count(concept)
    }

    fn count_in_range(&self, start: ConceptId, length: u64) -> Result<u64, CountError> {
        (**self).count_in_range(start, length)
    }

    fn count_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> Result<u64, CountError> {
        (**self).count_matching(required, excluded)
    }
}
