use thiserror::Error;

use crate::models::cosmology::{Cosmology, CosmologyError};

/// A failed power-spectrum query.
///
/// Wraps the engine error with the operation that raised it, its status code,
/// and a summary of the cosmology it was evaluated for.
#[derive(Debug, Error)]
#[error("{operation} failed (status {status}) for cosmology [{cosmology}]")]
pub struct QueryError {
    /// Name of the query operation.
    pub operation: &'static str,

    /// Engine status code; never zero.
    pub status: i32,

    /// One-line parameter summary of the cosmology.
    pub cosmology: String,

    #[source]
    pub source: CosmologyError,
}

impl QueryError {
    pub(super) fn new(operation: &'static str, cosmo: &Cosmology, source: CosmologyError) -> Self {
        Self {
            operation,
            status: source.status(),
            cosmology: cosmo.parameters().to_string(),
            source,
        }
    }
}

/// Converts an engine result into a query result.
pub(super) fn check<T>(
    result: Result<T, CosmologyError>,
    operation: &'static str,
    cosmo: &Cosmology,
) -> Result<T, QueryError> {
    result.map_err(|source| QueryError::new(operation, cosmo, source))
}
