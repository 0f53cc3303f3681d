#![allow(dead_code)]

use async_trait::async_trait;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use docmodel::{
    memory::InMemoryDatabase,
    prelude::*,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FieldShape)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(rename = "lastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// In-memory database that records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingDatabase {
    inner: InMemoryDatabase,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &InMemoryDatabase {
        &self.inner
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Writes `data` straight to the store without recording a call.
    pub async fn seed(&self, collection: &str, id: &str, data: Document) {
        let payload = data
            .into_iter()
            .map(|(name, value)| (name, FieldWrite::Set(value)))
            .collect::<FieldMap>();

        self.inner
            .set_merge(&Location::new(collection, id), payload)
            .await
            .unwrap();
    }

    /// Reads a stored document without recording a call.
    pub async fn stored(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner
            .get_document(&Location::new(collection, id))
            .await
            .unwrap()
            .map(|snapshot| snapshot.data)
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

#[async_trait]
impl DocumentDatabase for RecordingDatabase {
    fn allocate_id(&self, collection: &str) -> String {
        self.record("allocate_id");
        self.inner.allocate_id(collection)
    }

    async fn get_document(&self, location: &Location) -> ModelResult<Option<DocumentSnapshot>> {
        self.record("get_document");
        self.inner.get_document(location).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> ModelResult<Vec<DocumentSnapshot>> {
        self.record("query_documents");
        self.inner.query_documents(query, collection).await
    }

    async fn list_documents(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> ModelResult<Vec<DocumentSnapshot>> {
        self.record("list_documents");
        self.inner.list_documents(collection, offset, limit).await
    }

    async fn set_merge(&self, location: &Location, payload: FieldMap) -> ModelResult<()> {
        self.record("set_merge");
        self.inner.set_merge(location, payload).await
    }

    async fn delete_document(&self, location: &Location) -> ModelResult<()> {
        self.record("delete_document");
        self.inner.delete_document(location).await
    }
}

pub fn users(database: &Arc<RecordingDatabase>) -> CollectionBinder<RecordingDatabase, User> {
    CollectionBinder::new(Arc::clone(database), "users")
}
