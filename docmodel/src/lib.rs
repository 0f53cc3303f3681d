//! Typed document handles with dirty-field tracking over a remote document database.
//!
//! This crate is the primary entry point for users of docmodel. It re-exports the core types
//! from the sub-crates and gives access to the available database backends.
//!
//! # Features
//!
//! - **Typed field shapes** - Describe a collection with a serde struct and `#[derive(FieldShape)]`
//! - **Change tracking** - Handles remember which fields were set and save only those by default
//! - **Merge-writes** - Saves never clobber fields the handle did not touch
//! - **Dynamic collection paths** - Paths can be computed on every access, for multi-tenant layouts
//! - **Client-side search** - Paginate over documents matching a predicate the database cannot run
//! - **Multiple backends** - In-memory and MongoDB implementations of one database trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryDatabase};
//! use serde::{Serialize, Deserialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, FieldShape)]
//! pub struct User {
//!     pub name: String,
//!     pub age: Option<i32>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> ModelResult<()> {
//!     let database = Arc::new(InMemoryDatabase::builder().build().await?);
//!     let users = CollectionBinder::<_, User>::new(database, "users");
//!
//!     // The database allocates an id, nothing is written yet
//!     let mut alice = users.create(None, None);
//!     alice.set(User::NAME, &"Alice".to_string())?;
//!     alice.set(User::AGE, &Some(30))?;
//!     alice.save().await?;
//!
//!     // Later, from anywhere that knows the id
//!     let mut again = users.by_id(alice.id());
//!     again.load().await?;
//!     again.set_field("age", FieldValue::Absent);
//!     again.save().await?; // removes `age`, leaves `name` alone
//!
//!     Ok(())
//! }
//! ```
//!
//! # Collection paths
//!
//! A binder's path is either a literal or a resolver that is called each time a location is
//! needed:
//!
//! ```ignore
//! let tenant = current_tenant.clone();
//! let orders = CollectionBinder::<_, Order>::new(
//!     database,
//!     CollectionPath::resolver(move || format!("tenants/{}/orders", tenant.get())),
//! );
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{backend, binder, error, field, handle, location, page, query, value};
pub use docmodel_macros::FieldShape;

// Re-exported so derived code and callers agree on versions
pub use bson;
pub use chrono;

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

/// In-memory database implementation.
pub mod memory {
    pub use docmodel_memory::{InMemoryDatabase, InMemoryDatabaseBuilder};
}

/// MongoDB database implementation.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDatabase, MongoDatabaseBuilder};
}
