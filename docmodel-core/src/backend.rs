//! The document database collaborator.
//!
//! Handles and binders never talk to a storage engine directly. They go through
//! [`DocumentDatabase`], which captures exactly what a remote document store has to offer:
//!
//! - allocate a fresh id under a collection path
//! - fetch one document by location
//! - run a native [`Query`] against a collection
//! - list a whole collection through offset/limit windows in a stable order
//! - merge-write a [`FieldMap`] to a location (create or update, untouched fields kept)
//! - delete a location
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::DocumentDatabase;
//! use docmodel::location::Location;
//! use docmodel::value::{FieldMap, FieldWrite};
//! use bson::Bson;
//!
//! let database = InMemoryDatabase::new();
//! let location = Location::new("users", database.allocate_id("users"));
//!
//! let mut payload = FieldMap::new();
//! payload.insert("name".into(), FieldWrite::Set(Bson::String("Alice".into())));
//! database.set_merge(&location, payload).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::{error::ModelResult, location::Location, query::Query, value::FieldMap};

/// A document as returned by the database: its id and its stored fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

impl DocumentSnapshot {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self { id: id.into(), data }
    }
}

/// Abstract interface for the remote document database.
///
/// # Thread Safety
///
/// Implementations are shared between handles through `Arc` and must support concurrent calls
/// from multiple async tasks.
///
/// # Error Handling
///
/// Failures are reported per call. Handles and binders propagate them unchanged, so
/// implementations decide which [`ModelError`](crate::error::ModelError) variant describes
/// their failures (usually [`ModelError::Backend`](crate::error::ModelError::Backend)).
#[async_trait]
pub trait DocumentDatabase: Send + Sync + Debug {
    /// Allocates a fresh document id under `collection`.
    ///
    /// No document is created. The id only reserves a location that a later merge-write may
    /// populate.
    fn allocate_id(&self, collection: &str) -> String;

    /// Fetches the document at `location`, or `None` if it does not exist.
    async fn get_document(&self, location: &Location) -> ModelResult<Option<DocumentSnapshot>>;

    /// Runs a native query against `collection` and returns the matches in the database's
    /// result order.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> ModelResult<Vec<DocumentSnapshot>>;

    /// Lists one window of `collection`.
    ///
    /// Windows are taken from a stable ordering of the whole collection, so advancing `offset`
    /// by `limit` visits every document exactly once while the collection is unchanged.
    async fn list_documents(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> ModelResult<Vec<DocumentSnapshot>>;

    /// Merge-writes `payload` to `location`.
    ///
    /// Creates the document if it is missing. [`FieldWrite::Set`](crate::value::FieldWrite::Set)
    /// fields are written, [`FieldWrite::Delete`](crate::value::FieldWrite::Delete) fields are
    /// removed and every other stored field is left as it is.
    async fn set_merge(&self, location: &Location, payload: FieldMap) -> ModelResult<()>;

    /// Deletes the document at `location`. Deleting a missing document is not an error.
    async fn delete_document(&self, location: &Location) -> ModelResult<()>;

    /// Releases backend resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> ModelResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for creating database instances.
#[async_trait]
pub trait DatabaseBuilder {
    type Database: DocumentDatabase;

    async fn build(self) -> ModelResult<Self::Database>;
}
