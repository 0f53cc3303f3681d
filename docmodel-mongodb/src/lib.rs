//! MongoDB backend for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `DocumentDatabase` trait, with
//! native queries translated into MongoDB filter documents.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Merge-writes** - Saves become `$set`/`$unset` upserts, so untouched fields survive
//! - **Native queries** - Filters, sorting and offset/limit run in MongoDB's query engine
//! - **Stable listing** - Collection windows are ordered by `_id`
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{backend::DatabaseBuilder, mongodb::MongoDatabase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = MongoDatabase::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod database;
pub mod query;
pub mod sanitizer;

pub use database::{MongoDatabase, MongoDatabaseBuilder};
