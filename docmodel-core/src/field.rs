//! Field shapes and typed field keys.
//!
//! A field shape is the plain serde struct a collection's documents follow. Handles are generic
//! over it, so the shape is a compile-time parameter rather than a runtime schema.
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
//!     #[serde(rename = "emailAddress")]
//!     pub email: String,
//! }
//!
//! assert_eq!(User::field_names(), &["name", "emailAddress"]);
//! assert_eq!(User::EMAIL.name(), "emailAddress");
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, marker::PhantomData};

/// The declared shape of the documents in one collection.
///
/// Usually derived with `#[derive(FieldShape)]`, which also generates one [`Field`] constant
/// per struct field.
pub trait FieldShape: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stored names of every field, in declaration order.
    fn field_names() -> &'static [&'static str];
}

/// A typed key naming one field of shape `S` whose values are of type `T`.
pub struct Field<S, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (S, T)>,
}

impl<S, T> Field<S, T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    /// Returns the stored name of this field.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<S, T> Clone for Field<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for Field<S, T> {}

impl<S, T> fmt::Debug for Field<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl<S, T> PartialEq for Field<S, T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<S, T> Eq for Field<S, T> {}
