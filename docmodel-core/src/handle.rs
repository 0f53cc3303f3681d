//! Document handles: one document's cached fields plus its dirty-field tracking.
//!
//! A handle owns one location (collection path plus id) and mediates every read and write to
//! it. Local mutations go through [`DocumentHandle::set_field`] and friends, which record the
//! field name in [`DocumentHandle::changed_keys`]. Saving sends either only those fields or the
//! whole cache as a merge-write.
//!
//! # Example
//!
//! ```ignore
//! let users = CollectionBinder::<_, User>::new(database, "users");
//!
//! let mut user = users.by_id("alice");
//! user.load().await?;
//! user.set(User::NAME, &"Alice Liddell".to_string())?;
//! user.save().await?; // writes only `name`
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, marker::PhantomData, sync::Arc};
use tracing::{debug, instrument};

use crate::{
    backend::{DocumentDatabase, DocumentSnapshot},
    error::{ModelError, ModelResult},
    field::{Field, FieldShape},
    location::{CollectionPath, DocumentReference, Location},
    value::{FieldMap, FieldValue, FieldWrite, fields_from_document, native_dates, readable},
};

/// Which fields a save sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Only fields changed since the last load, save or reset.
    #[default]
    Changed,
    /// Every cached field.
    All,
}

impl SaveMode {
    fn only_changed(self) -> bool {
        matches!(self, SaveMode::Changed)
    }
}

/// A handle bound to one document location.
///
/// # Type Parameters
///
/// * `B` - The database the document lives in
/// * `S` - The field shape of the document
pub struct DocumentHandle<B: DocumentDatabase, S: FieldShape> {
    database: Arc<B>,
    path: CollectionPath,
    id: String,
    fields: FieldMap,
    changed_keys: Vec<String>,
    is_new: bool,
    _marker: PhantomData<fn() -> S>,
}

impl<B: DocumentDatabase, S: FieldShape> DocumentHandle<B, S> {
    /// Creates a handle.
    ///
    /// With an `id`, no database call is made. Without one, the database is asked once for a
    /// fresh id under the current collection path and the handle is marked new. That call is
    /// the only side effect of construction; nothing is fetched or written.
    ///
    /// `fields` seed the cache but are not considered changed.
    pub fn new(database: Arc<B>, path: CollectionPath, id: Option<String>, fields: Document) -> Self {
        let (id, is_new) = match id {
            Some(id) => (id, false),
            None => {
                let collection = path.resolve();
                let id = database.allocate_id(&collection);
                debug!(collection = %collection, id = %id, "allocated document id");
                (id, true)
            }
        };

        Self {
            database,
            path,
            id,
            fields: fields_from_document(fields),
            changed_keys: Vec::new(),
            is_new,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_snapshot(database: Arc<B>, path: CollectionPath, snapshot: DocumentSnapshot) -> Self {
        Self::new(database, path, Some(snapshot.id), snapshot.data)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `true` if this handle allocated its own id at construction.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The current location, recomputed from the collection path on every call.
    pub fn location(&self) -> Location {
        Location::new(self.path.resolve(), self.id.clone())
    }

    pub fn reference(&self) -> DocumentReference<B> {
        DocumentReference::new(Arc::clone(&self.database), self.location())
    }

    pub fn database(&self) -> &Arc<B> {
        &self.database
    }

    /// Returns the cached value of a field with native timestamps normalized.
    pub fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).map(FieldValue::from_write)
    }

    /// Returns a typed field value.
    ///
    /// Native timestamps are presented as RFC 3339 strings, so date fields of the shape should
    /// be declared as `chrono::DateTime<Utc>`. A field pending deletion reads as `None`.
    pub fn get<T: DeserializeOwned>(&self, field: Field<S, T>) -> ModelResult<Option<T>> {
        match self.fields.get(field.name()) {
            Some(FieldWrite::Set(value)) => Ok(Some(deserialize_from_bson(readable(value))?)),
            Some(FieldWrite::Delete) | None => Ok(None),
        }
    }

    /// Sets a field and records it as changed.
    ///
    /// [`FieldValue::Absent`] stores the field-deletion marker, so the next save removes the
    /// field remotely instead of leaving it out. The name is recorded even if the value did
    /// not change.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let name = name.into();

        self.fields.insert(name.clone(), value.into().into_write());
        self.changed_keys.push(name);
        self
    }

    /// Sets a typed field through its serde representation.
    ///
    /// Serialized `chrono::DateTime<Utc>` values, including nested ones, are stored as native
    /// timestamps.
    pub fn set<T: Serialize>(&mut self, field: Field<S, T>, value: &T) -> ModelResult<&mut Self> {
        let value = native_dates(serialize_to_bson(value)?);

        Ok(self.set_field(field.name(), value))
    }

    /// Applies [`set_field`](Self::set_field) to every entry, in iteration order.
    pub fn set_fields<I, K, V>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        for (name, value) in fields {
            self.set_field(name, value);
        }

        self
    }

    /// Sets every field of `shape`, in declaration order.
    pub fn set_shape(&mut self, shape: &S) -> ModelResult<&mut Self> {
        match native_dates(serialize_to_bson(shape)?) {
            Bson::Document(document) => Ok(self.set_fields(document)),
            other => Err(ModelError::Serialization(format!(
                "field shape serialized to {:?}, expected a document",
                other.element_type()
            ))),
        }
    }

    /// Deserializes the cached fields into the field shape.
    pub fn to_shape(&self) -> ModelResult<S> {
        let document = self
            .fields
            .iter()
            .filter_map(|(name, write)| match write {
                FieldWrite::Set(value) => Some((name.clone(), readable(value))),
                FieldWrite::Delete => None,
            })
            .collect::<Document>();

        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    pub fn get_all_fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Field names changed since the last load, save or reset, in order, duplicates kept.
    pub fn changed_keys(&self) -> &[String] {
        &self.changed_keys
    }

    pub fn reset_changed_keys(&mut self) {
        self.changed_keys.clear();
    }

    /// Computes a save payload.
    ///
    /// With `only_changed`, the payload holds each changed key that is also cached, once.
    /// Otherwise it is a copy of the whole cache.
    pub fn get_data_for_save(&self, only_changed: bool) -> FieldMap {
        if !only_changed {
            return self.fields.clone();
        }

        self.changed_keys
            .iter()
            .filter_map(|name| {
                self.fields
                    .get(name)
                    .map(|write| (name.clone(), write.clone()))
            })
            .collect()
    }

    /// Replaces the cache with the remote document and clears the changed keys.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if no document exists at the handle's location.
    #[instrument(skip_all, fields(id = %self.id))]
    pub async fn load(&mut self) -> ModelResult<&mut Self> {
        let location = self.location();
        let snapshot = self
            .database
            .get_document(&location)
            .await?
            .ok_or_else(|| ModelError::NotFound {
                id: self.id.clone(),
                collection: location.collection.clone(),
            })?;

        self.fields = fields_from_document(snapshot.data);
        self.changed_keys.clear();

        Ok(self)
    }

    /// Saves the changed fields. See [`save_with`](Self::save_with).
    pub async fn save(&mut self) -> ModelResult<&mut Self> {
        self.save_with(SaveMode::default()).await
    }

    /// Saves according to `mode`.
    ///
    /// The changed keys are cleared whether or not anything is written. An empty payload
    /// makes no database call at all.
    #[instrument(skip_all, fields(id = %self.id, mode = ?mode))]
    pub async fn save_with(&mut self, mode: SaveMode) -> ModelResult<&mut Self> {
        self.prepare_save(mode).commit().await?;

        Ok(self)
    }

    /// Computes the payload for `mode` and clears the changed keys, without writing.
    ///
    /// The returned [`PendingSave`] does not borrow the handle, so the handle can keep being
    /// edited and saved while an earlier save is still in flight.
    pub fn prepare_save(&mut self, mode: SaveMode) -> PendingSave<B> {
        let payload = self.get_data_for_save(mode.only_changed());
        self.changed_keys.clear();

        PendingSave {
            database: Arc::clone(&self.database),
            location: self.location(),
            payload,
        }
    }

    /// Deletes the remote document. The local cache and changed keys are left as they are.
    #[instrument(skip_all, fields(id = %self.id))]
    pub async fn delete(&self) -> ModelResult<&Self> {
        let location = self.location();

        self.database.delete_document(&location).await?;
        debug!(location = %location, "deleted document");

        Ok(self)
    }
}

impl<B: DocumentDatabase, S: FieldShape> fmt::Debug for DocumentHandle<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("path", &self.path)
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("changed_keys", &self.changed_keys)
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// A computed save payload waiting to be written.
#[derive(Debug)]
#[must_use = "a pending save does nothing until committed"]
pub struct PendingSave<B: DocumentDatabase> {
    database: Arc<B>,
    location: Location,
    payload: FieldMap,
}

impl<B: DocumentDatabase> PendingSave<B> {
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn payload(&self) -> &FieldMap {
        &self.payload
    }

    /// Merge-writes the payload, or does nothing if it is empty.
    pub async fn commit(self) -> ModelResult<()> {
        if self.payload.is_empty() {
            debug!(location = %self.location, "nothing to save");
            return Ok(());
        }

        debug!(location = %self.location, fields = self.payload.len(), "merge-writing document");

        self.database
            .set_merge(&self.location, self.payload)
            .await
    }
}
