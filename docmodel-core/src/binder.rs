//! Collection binders: factories producing [`DocumentHandle`]s for one collection.
//!
//! A binder is configured once per logical collection with a database and a
//! [`CollectionPath`], and is typed by the collection's field shape.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let users = CollectionBinder::<_, User>::new(database.clone(), "users");
//!
//! // New document, id allocated by the database
//! let mut user = users.create(None, None);
//! user.set(User::NAME, &"Alice".to_string())?;
//! user.save().await?;
//!
//! // Documents matching a native query, already populated
//! let admins = users.by_query(Query::builder().filter(Filter::eq("role", "admin")).build()).await?;
//!
//! // Client-side predicate with manual pagination
//! let page = users
//!     .search_with_client_filter(PaginationParams::new(1, 20), |data, _id| {
//!         data.get_str("name").is_ok_and(|name| name.contains("li"))
//!     })
//!     .await?;
//! ```

use bson::Document;
use futures::future::try_join_all;
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::{debug, instrument, trace};

use crate::{
    backend::DocumentDatabase,
    error::{ModelError, ModelResult},
    field::FieldShape,
    handle::DocumentHandle,
    location::{CollectionPath, DocumentReference},
    page::{PaginationParams, SearchPage},
    query::Query,
};

/// Window size used when scanning a collection for client-side filtering.
pub const SCAN_PAGE_SIZE: usize = 100;

/// A factory for handles of one collection.
pub struct CollectionBinder<B: DocumentDatabase, S: FieldShape> {
    database: Arc<B>,
    path: CollectionPath,
    _marker: PhantomData<fn() -> S>,
}

impl<B: DocumentDatabase, S: FieldShape> CollectionBinder<B, S> {
    pub fn new(database: Arc<B>, path: impl Into<CollectionPath>) -> Self {
        Self { database, path: path.into(), _marker: PhantomData }
    }

    pub fn database(&self) -> &Arc<B> {
        &self.database
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Binds the same database and path to a different field shape.
    pub fn with_shape<T: FieldShape>(&self) -> CollectionBinder<B, T> {
        CollectionBinder {
            database: Arc::clone(&self.database),
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }

    /// Constructs a handle without reading anything remotely.
    ///
    /// Without an `id`, the database allocates one (see [`DocumentHandle::new`]).
    pub fn create(&self, id: Option<&str>, fields: Option<Document>) -> DocumentHandle<B, S> {
        DocumentHandle::new(
            Arc::clone(&self.database),
            self.path.clone(),
            id.map(str::to_string),
            fields.unwrap_or_default(),
        )
    }

    /// A handle for an existing id. Call [`DocumentHandle::load`] to fetch its data.
    pub fn by_id(&self, id: impl Into<String>) -> DocumentHandle<B, S> {
        DocumentHandle::new(
            Arc::clone(&self.database),
            self.path.clone(),
            Some(id.into()),
            Document::new(),
        )
    }

    /// Runs a native query and returns one populated handle per result, in result order.
    #[instrument(skip_all)]
    pub async fn by_query(&self, query: Query) -> ModelResult<Vec<DocumentHandle<B, S>>> {
        let collection = self.path.resolve();
        let snapshots = self
            .database
            .query_documents(query, &collection)
            .await?;

        debug!(collection = %collection, results = snapshots.len(), "native query returned");

        Ok(snapshots
            .into_iter()
            .map(|snapshot| {
                DocumentHandle::from_snapshot(Arc::clone(&self.database), self.path.clone(), snapshot)
            })
            .collect())
    }

    /// Fetches a referenced document and returns a populated handle for it.
    ///
    /// The reference's own database and collection are used, not this binder's, so the handle
    /// stays bound to wherever the reference points.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if the referenced document does not exist.
    #[instrument(skip_all, fields(location = %reference.location()))]
    pub async fn by_reference(&self, reference: &DocumentReference<B>) -> ModelResult<DocumentHandle<B, S>> {
        let location = reference.location();
        let snapshot = reference
            .database()
            .get_document(location)
            .await?
            .ok_or_else(|| ModelError::NotFound {
                id: location.id.clone(),
                collection: location.collection.clone(),
            })?;

        Ok(DocumentHandle::from_snapshot(
            Arc::clone(reference.database()),
            CollectionPath::Literal(location.collection.clone()),
            snapshot,
        ))
    }

    /// Paginates over documents matching a predicate the database cannot evaluate.
    ///
    /// The collection is listed in windows of [`SCAN_PAGE_SIZE`] and `filter` is applied to
    /// each document's data and id. Scanning stops at the first window without a single match.
    /// This assumes matches are front-loaded in the collection's listing order: a window with
    /// no matches ends the scan even if later windows would have matched, and `all_pages` only
    /// counts what was scanned.
    ///
    /// The ids of the requested page are then loaded concurrently, one fetch per id.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPagination`] if `params.per_page` is zero. Loading a page
    /// fails with [`ModelError::NotFound`] if a matched document disappears before it is
    /// fetched.
    #[instrument(skip_all, fields(page = params.page, per_page = params.per_page))]
    pub async fn search_with_client_filter<F>(
        &self,
        params: PaginationParams,
        filter: F,
    ) -> ModelResult<SearchPage<DocumentHandle<B, S>>>
    where
        F: Fn(&Document, &str) -> bool + Send + Sync,
    {
        params.validate()?;

        let collection = self.path.resolve();
        let mut matched = Vec::new();
        let mut scan_page = 0;

        loop {
            let window = self
                .database
                .list_documents(&collection, scan_page * SCAN_PAGE_SIZE, SCAN_PAGE_SIZE)
                .await?;
            let scanned = window.len();
            let hits = window
                .into_iter()
                .filter(|snapshot| filter(&snapshot.data, &snapshot.id))
                .map(|snapshot| snapshot.id)
                .collect::<Vec<_>>();

            trace!(scan_page, scanned, hits = hits.len(), "scanned window");

            if hits.is_empty() {
                break;
            }

            matched.extend(hits);
            scan_page += 1;
        }

        let all_pages = params.page_count(matched.len());
        let selected = params.select(&matched);

        debug!(
            collection = %collection,
            windows = scan_page + 1,
            matched = matched.len(),
            selected = selected.len(),
            "client filter scan finished"
        );

        let docs = try_join_all(selected.iter().map(|id| async move {
            let mut handle = self.by_id(id.as_str());
            handle.load().await?;

            Ok::<_, ModelError>(handle)
        }))
        .await?;

        Ok(SearchPage { all_pages, docs })
    }
}

impl<B: DocumentDatabase, S: FieldShape> Clone for CollectionBinder<B, S> {
    fn clone(&self) -> Self {
        self.with_shape()
    }
}

impl<B: DocumentDatabase, S: FieldShape> fmt::Debug for CollectionBinder<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBinder")
            .field("database", &self.database)
            .field("path", &self.path)
            .finish()
    }
}
