//! Error types and result types for document handle operations.
//!
//! Only [`ModelError::NotFound`] and [`ModelError::InvalidPagination`] are raised by this
//! layer itself. Every other variant is produced by a [`DocumentDatabase`](crate::backend::DocumentDatabase)
//! implementation and travels through handles and binders unchanged.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with document handles.
#[derive(Error, Debug)]
pub enum ModelError {
    /// No remote document exists at the requested location.
    #[error("Document {id} not found in collection {collection}")]
    NotFound {
        /// The id the caller asked for.
        id: String,
        /// The resolved collection path at the time of the request.
        collection: String,
    },
    /// Conversion between a field shape and its stored BSON form failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Pagination parameters that cannot describe a page.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
    /// A stored document has a structure the backend cannot interpret.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Error during backend construction or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error reported by the underlying database.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document handle operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Returns `true` if this error reports a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
