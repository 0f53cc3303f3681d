//! In-memory implementation of the document database.
//!
//! Collections are ordered maps from document id to BSON document, guarded by an async-aware
//! read-write lock. Listing and unsorted queries follow id order.

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tracing::trace;
use uuid::Uuid;

use docmodel_core::{
    backend::{DatabaseBuilder, DocumentDatabase, DocumentSnapshot},
    error::ModelResult,
    location::Location,
    query::{Query, SortDirection},
    value::{FieldMap, FieldWrite},
};

use crate::evaluator::{DocumentEvaluator, compare_by_field};

type CollectionMap = BTreeMap<String, Document>;
type DatabaseMap = BTreeMap<String, CollectionMap>;

/// Thread-safe in-memory document database.
///
/// Cloning is cheap and every clone shares the same data.
///
/// # Example
///
/// ```ignore
/// use docmodel::memory::InMemoryDatabase;
/// use docmodel::prelude::*;
/// use std::sync::Arc;
///
/// let database = Arc::new(InMemoryDatabase::new());
/// let users = CollectionBinder::<_, User>::new(database, "users");
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryDatabase {
    /// collection path -> (document id -> document)
    collections: Arc<RwLock<DatabaseMap>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryDatabaseBuilder {
        InMemoryDatabaseBuilder
    }

    /// Number of documents stored under `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Lists the collection paths that currently hold documents.
    pub async fn collection_paths(&self) -> Vec<String> {
        self.collections
            .read()
            .await
            .iter()
            .filter(|(_, documents)| !documents.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

fn snapshot(id: &str, data: &Document) -> DocumentSnapshot {
    DocumentSnapshot::new(id, data.clone())
}

#[async_trait]
impl DocumentDatabase for InMemoryDatabase {
    fn allocate_id(&self, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn get_document(&self, location: &Location) -> ModelResult<Option<DocumentSnapshot>> {
        Ok(self
            .collections
            .read()
            .await
            .get(&location.collection)
            .and_then(|documents| documents.get(&location.id))
            .map(|data| snapshot(&location.id, data)))
    }

    async fn query_documents(&self, query: Query, collection: &str) -> ModelResult<Vec<DocumentSnapshot>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut matches = documents
            .iter()
            .filter(|(_, data)| {
                query
                    .filter
                    .as_ref()
                    .is_none_or(|expr| DocumentEvaluator::matches(data, expr))
            })
            .collect::<Vec<_>>();

        // Stable sort, so ties keep id order
        if let Some(sort) = &query.sort {
            matches.sort_by(|(_, left), (_, right)| match sort.direction {
                SortDirection::Asc => compare_by_field(left, right, &sort.field),
                SortDirection::Desc => compare_by_field(right, left, &sort.field),
            });
        }

        Ok(matches
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, data)| snapshot(id, data))
            .collect())
    }

    async fn list_documents(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> ModelResult<Vec<DocumentSnapshot>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .skip(offset)
                    .take(limit)
                    .map(|(id, data)| snapshot(id, data))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_merge(&self, location: &Location, payload: FieldMap) -> ModelResult<()> {
        let mut collections = self.collections.write().await;
        let document = collections
            .entry(location.collection.clone())
            .or_default()
            .entry(location.id.clone())
            .or_default();

        for (name, write) in payload {
            match write {
                FieldWrite::Set(value) => {
                    document.insert(name, value);
                }
                FieldWrite::Delete => {
                    document.remove(&name);
                }
            }
        }

        trace!(location = %location, fields = document.len(), "merged document");

        Ok(())
    }

    async fn delete_document(&self, location: &Location) -> ModelResult<()> {
        let mut collections = self.collections.write().await;

        if let Some(documents) = collections.get_mut(&location.collection) {
            documents.remove(&location.id);
        }

        Ok(())
    }
}

/// Builder for [`InMemoryDatabase`]. Building always succeeds.
#[derive(Debug, Default)]
pub struct InMemoryDatabaseBuilder;

#[async_trait]
impl DatabaseBuilder for InMemoryDatabaseBuilder {
    type Database = InMemoryDatabase;

    async fn build(self) -> ModelResult<Self::Database> {
        Ok(InMemoryDatabase::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};
    use docmodel_core::query::Filter;

    fn set(value: impl Into<Bson>) -> FieldWrite {
        FieldWrite::Set(value.into())
    }

    async fn seeded(ids: &[&str]) -> InMemoryDatabase {
        let database = InMemoryDatabase::new();

        for (index, id) in ids.iter().enumerate() {
            let payload = FieldMap::from([("rank".to_string(), set(index as i32))]);
            database
                .set_merge(&Location::new("items", *id), payload)
                .await
                .unwrap();
        }

        database
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields_and_applies_deletes() {
        let database = InMemoryDatabase::new();
        let location = Location::new("users", "alice");

        database
            .set_merge(
                &location,
                FieldMap::from([("name".to_string(), set("Alice")), ("age".to_string(), set(30))]),
            )
            .await
            .unwrap();
        database
            .set_merge(
                &location,
                FieldMap::from([("age".to_string(), FieldWrite::Delete), ("city".to_string(), set("Oslo"))]),
            )
            .await
            .unwrap();

        let stored = database.get_document(&location).await.unwrap().unwrap();
        assert_eq!(stored.data, doc! { "name": "Alice", "city": "Oslo" });
    }

    #[tokio::test]
    async fn listing_windows_follow_id_order() {
        let database = seeded(&["c", "a", "d", "b"]).await;

        let first = database.list_documents("items", 0, 3).await.unwrap();
        let second = database.list_documents("items", 3, 3).await.unwrap();

        let ids = |window: Vec<DocumentSnapshot>| window.into_iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(first), vec!["a", "b", "c"]);
        assert_eq!(ids(second), vec!["d"]);
        assert!(database.list_documents("missing", 0, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_filters_sorts_and_limits() {
        let database = seeded(&["a", "b", "c", "d"]).await;

        let query = Query::builder()
            .filter(Filter::gte("rank", 1))
            .sort("rank", SortDirection::Desc)
            .limit(2)
            .build();
        let results = database.query_documents(query, "items").await.unwrap();

        let ids = results.into_iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn deleting_missing_documents_is_a_no_op() {
        let database = seeded(&["a"]).await;

        database.delete_document(&Location::new("items", "zzz")).await.unwrap();
        database.delete_document(&Location::new("other", "a")).await.unwrap();
        database.delete_document(&Location::new("items", "a")).await.unwrap();

        assert_eq!(database.count("items").await, 0);
        assert!(database.collection_paths().await.is_empty());
    }

    #[test]
    fn allocated_ids_are_unique() {
        let database = InMemoryDatabase::new();

        assert_ne!(database.allocate_id("users"), database.allocate_id("users"));
    }
}
