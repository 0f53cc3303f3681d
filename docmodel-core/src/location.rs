//! Collection paths, document locations and document references.
//!
//! A [`CollectionPath`] is either a fixed string or a resolver evaluated on every use, which
//! lets one binder follow changing external context such as a tenant prefix:
//!
//! ```ignore
//! use docmodel::location::CollectionPath;
//! use std::sync::{Arc, RwLock};
//!
//! let tenant = Arc::new(RwLock::new("acme".to_string()));
//! let path = CollectionPath::resolver({
//!     let tenant = tenant.clone();
//!     move || format!("tenants/{}/users", tenant.read().unwrap())
//! });
//!
//! assert_eq!(path.resolve(), "tenants/acme/users");
//! ```

use std::{fmt, sync::Arc};

use crate::backend::DocumentDatabase;

/// Either a literal collection path or a resolver producing one.
#[derive(Clone)]
pub enum CollectionPath {
    /// A fixed path.
    Literal(String),
    /// Evaluated afresh on every [`resolve`](CollectionPath::resolve).
    Resolver(Arc<dyn Fn() -> String + Send + Sync>),
}

impl CollectionPath {
    pub fn literal(path: impl Into<String>) -> Self {
        CollectionPath::Literal(path.into())
    }

    pub fn resolver<F>(resolver: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        CollectionPath::Resolver(Arc::new(resolver))
    }

    /// Returns the current path, invoking the resolver if there is one.
    pub fn resolve(&self) -> String {
        match self {
            CollectionPath::Literal(path) => path.clone(),
            CollectionPath::Resolver(resolver) => resolver(),
        }
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionPath::Literal(path) => f.debug_tuple("Literal").field(path).finish(),
            CollectionPath::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for CollectionPath {
    fn from(path: &str) -> Self {
        CollectionPath::Literal(path.to_string())
    }
}

impl From<String> for CollectionPath {
    fn from(path: String) -> Self {
        CollectionPath::Literal(path)
    }
}

/// One identified document: a collection path plus an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub collection: String,
    pub id: String,
}

impl Location {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self { collection: collection.into(), id: id.into() }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A direct reference to a document, carrying the database it belongs to.
///
/// Binders resolve references through the reference's own database and collection rather than
/// their configured ones.
#[derive(Debug)]
pub struct DocumentReference<B: DocumentDatabase> {
    database: Arc<B>,
    location: Location,
}

impl<B: DocumentDatabase> DocumentReference<B> {
    pub fn new(database: Arc<B>, location: Location) -> Self {
        Self { database, location }
    }

    pub fn database(&self) -> &Arc<B> {
        &self.database
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn id(&self) -> &str {
        &self.location.id
    }
}

impl<B: DocumentDatabase> Clone for DocumentReference<B> {
    fn clone(&self) -> Self {
        Self { database: Arc::clone(&self.database), location: self.location.clone() }
    }
}
