//! Error types for variable selection.

use thiserror::Error;

/// Result type for variable selection operations.
pub type Result<T> = std::result::Result<T, VariablesError>;

/// Errors raised by the variable catalog and selector.
#[derive(Error, Debug)]
pub enum VariablesError {
    /// Filter criteria that cannot match anything meaningful.
    ///
    /// The message lists the valid choices available in the catalog.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// An operation needed the catalog before it was populated.
    #[error("The variable catalog for {0} has not been populated")]
    EmptyCatalog(String),

    /// The catalog is immutable once populated.
    #[error("The variable catalog for {0} is already populated")]
    CatalogAlreadyPopulated(String),

    /// The catalog source failed to produce a listing.
    #[error("Catalog source failed: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
