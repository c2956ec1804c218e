//! Error types and result types for model and store operations.
//!
//! This module provides comprehensive error handling for all document store operations.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

use crate::model::{Model, ModelKind};

/// Represents all possible errors that can occur when working with models and stores.
///
/// This enum covers serialization errors, attribute validation, identity resolution,
/// bulk write failures and backend-specific errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization, connection setup or runtime creation.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A single-document fetch matched nothing.
    ///
    /// The carried [`ModelKind`] identifies the model type the fetch was issued for,
    /// so a handler can be scoped to one model type with
    /// [`DocumentStoreError::is_not_found_for`].
    #[error("{0} does not exist")]
    DoesNotExist(ModelKind),
    /// A field name that is not registered on the model was used at construction or assignment.
    #[error("Attribute {attribute} specified does not exist on {model}")]
    UnknownAttribute {
        /// The model type name.
        model: &'static str,
        /// The offending field name.
        attribute: String,
    },
    /// The instance has neither an object id nor raw constructor attributes to target.
    #[error("{operation} error on {model}: get the model from the store or set its attributes first")]
    AttributesEmpty {
        /// The model type name.
        model: &'static str,
        /// The operation that needed an identity (`delete`, `update`, ...).
        operation: &'static str,
    },
    /// A value could not be serialized by the attribute it was assigned to.
    #[error("Invalid value for attribute {attribute}: {reason}")]
    InvalidAttributeValue {
        /// The attribute name.
        attribute: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The model definition is inconsistent (for example, two hash keys).
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// The store rejected a write because of a unique index violation.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// A bulk write partially or fully failed.
    #[error("Bulk write failed: {0}")]
    BulkWrite(BulkWriteFailure),
    /// The store could not be reached within the configured selection budget.
    #[error("Store unreachable: {0}")]
    ConnectivityTimeout(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` for any not-found error, whatever model type raised it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DoesNotExist(_))
    }

    /// Returns `true` only for a not-found error raised on behalf of model `M`.
    pub fn is_not_found_for<M: Model>(&self) -> bool {
        match self {
            DocumentStoreError::DoesNotExist(kind) => *kind == ModelKind::of::<M>(),
            _ => false,
        }
    }

    /// Returns the bulk write details if this is a [`DocumentStoreError::BulkWrite`].
    pub fn as_bulk_write(&self) -> Option<&BulkWriteFailure> {
        match self {
            DocumentStoreError::BulkWrite(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

/// One failed operation inside a bulk write request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteItemError {
    /// Position of the failed operation in the submitted request.
    pub index: usize,
    /// Store error code.
    pub code: i32,
    /// Store error message.
    pub message: String,
}

/// Structured details of a failed bulk write, as reported by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteFailure {
    /// Per-operation failures, in request order.
    pub write_errors: Vec<BulkWriteItemError>,
    /// Write concern failures that are not tied to one operation.
    pub write_concern_errors: Vec<String>,
    /// Number of operations the store applied before or despite the failures.
    pub applied: u64,
}

impl fmt::Display for BulkWriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} write error(s), {} write concern error(s), {} applied",
            self.write_errors.len(),
            self.write_concern_errors.len(),
            self.applied,
        )?;

        if let Some(first) = self.write_errors.first() {
            write!(f, "; first at #{} (code {}): {}", first.index, first.code, first.message)?;
        }

        Ok(())
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
