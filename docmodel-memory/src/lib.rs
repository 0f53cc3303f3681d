//! In-memory document database for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `DocumentDatabase` trait.
//! It is meant for development and tests, and for small deployments that do not need
//! persistence.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes behind an async-aware RwLock
//! - **Merge-writes** - Field-level set and delete, creating documents on first write
//! - **Native queries** - Filtering, sorting and offset/limit over stored documents
//! - **Stable listing** - Collections list in id order, so offset windows cover everything
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
//! }
//!
//! #[tokio::main]
//! async fn main() -> ModelResult<()> {
//!     let database = Arc::new(InMemoryDatabase::builder().build().await?);
//!     let users = CollectionBinder::<_, User>::new(database, "users");
//!
//!     let mut user = users.create(None, None);
//!     user.set(User::NAME, &"Alice".to_string())?;
//!     user.save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod database;
pub mod evaluator;

pub use database::{InMemoryDatabase, InMemoryDatabaseBuilder};
