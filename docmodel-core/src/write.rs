//! Write requests and store acknowledgements.

use bson::{Bson, Document};

/// One operation of a bulk write request.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    /// Insert a new document.
    InsertOne {
        document: Document,
    },
    /// Delete the first document matching `filter`.
    DeleteOne {
        filter: Document,
    },
    /// Apply `update` (an operator document such as `{$set: ...}`) to the first match.
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
}

impl WriteRequest {
    /// Returns the operation name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            WriteRequest::InsertOne { .. } => "insert",
            WriteRequest::DeleteOne { .. } => "delete",
            WriteRequest::UpdateOne { .. } => "update",
        }
    }
}

/// Acknowledgement of a single insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document.
    pub inserted_id: Bson,
}

/// Acknowledgement of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// The `_id` of the document inserted by an upsert, if any.
    pub upserted_id: Option<Bson>,
}

/// Acknowledgement of a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Summary of a successful bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,
}

impl BulkWriteResult {
    /// Total number of operations the store applied.
    pub fn applied(&self) -> u64 {
        self.inserted_count + self.matched_count + self.deleted_count + self.upserted_count
    }
}
