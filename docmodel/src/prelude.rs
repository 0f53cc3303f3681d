//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    backend::{DatabaseBuilder, DocumentDatabase, DocumentSnapshot},
    binder::CollectionBinder,
    error::{ModelError, ModelResult},
    field::{Field, FieldShape},
    handle::{DocumentHandle, PendingSave, SaveMode},
    location::{CollectionPath, DocumentReference, Location},
    page::{PaginationParams, SearchPage},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    value::{FieldMap, FieldValue, FieldWrite},
};
pub use docmodel_macros::FieldShape;
