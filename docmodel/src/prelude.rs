//! Convenient re-exports of commonly used types from docmodel.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `#[model]` macro and the attribute marker types it uses
//! - Model traits and schemas
//! - Stores, collections and batch writers
//! - Query options and error types

pub use bson::{Bson, Document, doc};

pub use docmodel_core::{
    attribute::{
        Attribute, AttributeKind, AttributeType, Boolean, Json, List, Number, NumberValue,
        ObjectIdRef, Text, UtcDateTime,
    },
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    batch::{BatchState, BatchWriter},
    blocking::{BlockingBatchWriter, BlockingModelCollection},
    collection::ModelCollection,
    container::AttributeContainer,
    error::{DocumentStoreError, DocumentStoreResult},
    model::{HasAttributes, Model, ModelExt, ModelKind},
    query::{FindOptions, IndexSpec, SortDirection, UpdateOptions},
    schema::Schema,
    store::DocumentStore,
};
pub use docmodel_macros::model;
