use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, trace};

use docmodel_core::{
    backend::{DatabaseBuilder, DocumentDatabase, DocumentSnapshot},
    error::{ModelError, ModelResult},
    location::Location,
    query::{Query, QueryVisitor, SortDirection},
    value::{FieldMap, FieldWrite},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

fn backend_error(error: mongodb::error::Error) -> ModelError {
    ModelError::Backend(error.to_string())
}

/// MongoDB-backed document database.
///
/// Document ids are stored as string `_id` values. Collection paths map to collection names
/// with reserved characters escaped.
#[derive(Debug)]
pub struct MongoDatabase {
    client: Client,
    database: String,
}

impl MongoDatabase {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDatabaseBuilder {
        MongoDatabaseBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::escape(collection))
    }

    fn into_snapshot(mut document: Document) -> DocumentSnapshot {
        let id = match document.remove("_id") {
            Some(Bson::String(id)) => id,
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        DocumentSnapshot::new(id, KeySanitizer::restore_document(document))
    }

    fn update_document(payload: FieldMap) -> Document {
        let mut set = Document::new();
        let mut unset = Document::new();

        for (name, write) in payload {
            match write {
                FieldWrite::Set(value) => {
                    set.insert(KeySanitizer::escape(&name), KeySanitizer::escape_value(value));
                }
                FieldWrite::Delete => {
                    unset.insert(KeySanitizer::escape(&name), "");
                }
            }
        }

        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }

        update
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> ModelResult<Vec<DocumentSnapshot>> {
        Ok(self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(Self::into_snapshot)
            .collect())
    }
}

#[async_trait]
impl DocumentDatabase for MongoDatabase {
    fn allocate_id(&self, _collection: &str) -> String {
        ObjectId::new().to_hex()
    }

    async fn get_document(&self, location: &Location) -> ModelResult<Option<DocumentSnapshot>> {
        Ok(self
            .get_collection(&location.collection)
            .find_one(doc! { "_id": &location.id })
            .await
            .map_err(backend_error)?
            .map(Self::into_snapshot))
    }

    async fn query_documents(&self, query: Query, collection: &str) -> ModelResult<Vec<DocumentSnapshot>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                KeySanitizer::escape(&sort.field): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                },
                "_id": 1,
            });
        }

        let filter = match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        };

        trace!(collection, filter = %filter, "querying collection");

        self.find(collection, filter, options).await
    }

    async fn list_documents(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> ModelResult<Vec<DocumentSnapshot>> {
        let mut options = FindOptions::default();
        options.sort = Some(doc! { "_id": 1 });
        options.skip = Some(offset as u64);
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));

        self.find(collection, doc! {}, options).await
    }

    async fn set_merge(&self, location: &Location, payload: FieldMap) -> ModelResult<()> {
        let update = Self::update_document(payload);

        // An upsert with no operators would be rejected, but the document must still exist.
        let update = if update.is_empty() {
            doc! { "$setOnInsert": { "_id": &location.id } }
        } else {
            update
        };

        let result = self
            .get_collection(&location.collection)
            .update_one(doc! { "_id": &location.id }, update)
            .upsert(true)
            .await
            .map_err(backend_error)?;

        trace!(
            location = %location,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "merged document"
        );

        Ok(())
    }

    async fn delete_document(&self, location: &Location) -> ModelResult<()> {
        self.get_collection(&location.collection)
            .delete_one(doc! { "_id": &location.id })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> ModelResult<()> {
        debug!(database = %self.database, "shutting down MongoDB client");
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDatabaseBuilder {
    dsn: String,
    database: String,
}

impl MongoDatabaseBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl DatabaseBuilder for MongoDatabaseBuilder {
    type Database = MongoDatabase;

    async fn build(self) -> ModelResult<Self::Database> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| ModelError::Initialization(e.to_string()))?;
        let client = Client::with_options(options).map_err(|e| ModelError::Initialization(e.to_string()))?;

        debug!(database = %self.database, "connected MongoDB client");

        Ok(MongoDatabase::new(client, self.database))
    }
}
