//! Typed document handles with change tracking over a remote document database.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Database abstraction** ([`backend`]) - The collaborator trait every document database implements
//! - **Document handles** ([`handle`]) - One document's cached fields, dirty tracking and persistence
//! - **Collection binders** ([`binder`]) - Factories producing handles by id, query, reference or client-side search
//! - **Field shapes** ([`field`]) - The typed struct a collection follows and its typed field keys
//! - **Field values** ([`value`]) - Deletion markers and timestamp normalization
//! - **Locations** ([`location`]) - Literal or resolved collection paths and document references
//! - **Native queries** ([`query`]) - Filter expressions evaluated by the database
//! - **Pagination** ([`page`]) - Page parameters and search result pages
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, FieldShape)]
//! pub struct User {
//!     pub name: String,
//!     pub age: i32,
//! }
//!
//! let users = CollectionBinder::<_, User>::new(database, "users");
//!
//! let mut alice = users.by_id("alice");
//! alice.load().await?;
//! alice.set(User::AGE, &31)?;
//! alice.save().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod binder;
pub mod error;
pub mod field;
pub mod handle;
pub mod location;
pub mod page;
pub mod query;
pub mod value;
