//! Buffered bulk writes.
//!
//! A [`BatchWriter`] queues instance-level writes of one model type and sends them to
//! the store as a single bulk write. The queue is bounded: staging an operation while
//! `page_limit` operations are already queued flushes the queue first.
//!
//! # Example
//!
//! ```ignore
//! let movies = store.models::<Movie>();
//!
//! movies
//!     .batch_write()
//!     .scope(move |batch| {
//!         Box::pin(async move {
//!             for movie in &new_movies {
//!                 batch.save(movie).await?;
//!             }
//!             batch.delete(&retired).await
//!         })
//!     })
//!     .await?;
//! ```

use bson::{Document, doc};
use futures::future::BoxFuture;

use crate::{
    backend::StoreBackend,
    collection::ModelCollection,
    error::DocumentStoreResult,
    model::{Model, ModelExt},
    write::{BulkWriteResult, WriteRequest},
};

/// Default number of queued operations that triggers an automatic flush.
pub const BATCH_WRITE_PAGE_LIMIT: usize = 1000;

/// A queued write.
#[derive(Debug, Clone)]
pub enum PendingOperation<M: Model> {
    /// Insert the instance's values.
    Insert(M),
    /// Delete the document the instance targets.
    Delete(M),
    /// Apply `{$set: update}` to the document the instance targets.
    Update { item: M, update: Document, upsert: bool },
    /// Apply `{$inc: update}` to the document the instance targets.
    Increment { item: M, update: Document, upsert: bool },
}

impl<M: Model> PendingOperation<M> {
    fn operation(&self) -> &'static str {
        match self {
            PendingOperation::Insert(_) => "insert",
            PendingOperation::Delete(_) => "delete",
            PendingOperation::Update { .. } => "update",
            PendingOperation::Increment { .. } => "increment",
        }
    }

    fn check_identity(&self) -> DocumentStoreResult<()> {
        match self {
            PendingOperation::Insert(_) => Ok(()),
            PendingOperation::Delete(item)
            | PendingOperation::Update { item, .. }
            | PendingOperation::Increment { item, .. } => item
                .identity_filter(self.operation())
                .map(|_| ()),
        }
    }

    /// Translates the operation into a store write request.
    pub fn to_request(&self) -> DocumentStoreResult<WriteRequest> {
        let request = match self {
            PendingOperation::Insert(item) => WriteRequest::InsertOne {
                document: item.attributes().values().clone(),
            },
            PendingOperation::Delete(item) => WriteRequest::DeleteOne {
                filter: item.identity_filter("delete")?,
            },
            PendingOperation::Update { item, update, upsert } => WriteRequest::UpdateOne {
                filter: item.identity_filter("update")?,
                update: doc! { "$set": update.clone() },
                upsert: *upsert,
            },
            PendingOperation::Increment { item, update, upsert } => WriteRequest::UpdateOne {
                filter: item.identity_filter("increment")?,
                update: doc! { "$inc": update.clone() },
                upsert: *upsert,
            },
        };

        Ok(request)
    }
}

/// Lifecycle of a [`BatchWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Accepting operations.
    Open,
    /// A bulk write is in flight.
    Flushing,
    /// The last bulk write failed. Staging another operation re-opens the writer.
    Failed,
}

/// Queues writes of model type `M` and sends them as bulk writes.
///
/// Operations are sent in staging order. A writer dropped with queued operations
/// discards them and logs a warning; call [`BatchWriter::commit`] or use
/// [`BatchWriter::scope`] to make sure everything is sent.
pub struct BatchWriter<'a, B: StoreBackend, M: Model> {
    collection: ModelCollection<'a, B, M>,
    pending: Vec<PendingOperation<M>>,
    page_limit: usize,
    ordered: bool,
    state: BatchState,
}

impl<'a, B: StoreBackend, M: Model> BatchWriter<'a, B, M> {
    pub(crate) fn new(collection: ModelCollection<'a, B, M>) -> Self {
        Self {
            collection,
            pending: Vec::new(),
            page_limit: BATCH_WRITE_PAGE_LIMIT,
            ordered: false,
            state: BatchState::Open,
        }
    }

    /// Sets the queue size that triggers an automatic flush. Values below one are
    /// treated as one.
    pub fn page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Sets whether the store must apply requests serially and stop at the first
    /// failure. Writers are unordered by default.
    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the queued operations in staging order.
    pub fn pending(&self) -> &[PendingOperation<M>] {
        &self.pending
    }

    /// Queues an insert of `item`.
    pub async fn save(&mut self, item: &M) -> DocumentStoreResult<()> {
        self.stage(PendingOperation::Insert(item.clone()))
            .await
    }

    /// Queues a delete of the document `item` targets.
    pub async fn delete(&mut self, item: &M) -> DocumentStoreResult<()> {
        self.stage(PendingOperation::Delete(item.clone()))
            .await
    }

    /// Queues `{$set: update}` on the document `item` targets.
    pub async fn update(&mut self, item: &M, update: Document, upsert: bool) -> DocumentStoreResult<()> {
        self.stage(PendingOperation::Update {
            item: item.clone(),
            update,
            upsert,
        })
        .await
    }

    /// Queues `{$inc: update}` on the document `item` targets.
    pub async fn increment(&mut self, item: &M, update: Document, upsert: bool) -> DocumentStoreResult<()> {
        self.stage(PendingOperation::Increment {
            item: item.clone(),
            update,
            upsert,
        })
        .await
    }

    /// Queues an operation, flushing first when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AttributesEmpty`](crate::error::DocumentStoreError::AttributesEmpty)
    /// if the operation needs an identity the item does not have, or the error of the
    /// automatic flush. In both cases the operation is not queued.
    pub async fn stage(&mut self, operation: PendingOperation<M>) -> DocumentStoreResult<()> {
        operation.check_identity()?;

        if self.pending.len() >= self.page_limit {
            self.commit().await?;
        }

        self.pending.push(operation);
        self.state = BatchState::Open;

        Ok(())
    }

    /// Sends every queued operation as one bulk write.
    ///
    /// The queue is cleared before the request is sent, so a failed commit does not
    /// resend its operations on the next one. An empty queue is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::BulkWrite`](crate::error::DocumentStoreError::BulkWrite)
    /// with per-operation details when the store rejects some of the requests. The
    /// writer is then [`BatchState::Failed`].
    pub async fn commit(&mut self) -> DocumentStoreResult<BulkWriteResult> {
        if self.pending.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let requests = self
            .pending
            .iter()
            .map(PendingOperation::to_request)
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        self.pending.clear();

        log::debug!(
            "bulk_write on {}: {} request(s), ordered={}",
            self.collection.namespace(),
            requests.len(),
            self.ordered
        );

        self.state = BatchState::Flushing;
        match self
            .collection
            .backend()
            .bulk_write(self.collection.namespace(), requests, self.ordered)
            .await
        {
            Ok(result) => {
                self.state = BatchState::Open;
                Ok(result)
            }
            Err(err) => {
                self.state = BatchState::Failed;
                Err(err)
            }
        }
    }

    /// Runs `body` with this writer, then commits whatever is still queued.
    ///
    /// The commit happens even when `body` fails. If both fail, the body's error is
    /// returned and the commit error is logged.
    pub async fn scope<T, F>(mut self, body: F) -> DocumentStoreResult<T>
    where
        F: for<'w> FnOnce(&'w mut BatchWriter<'a, B, M>) -> BoxFuture<'w, DocumentStoreResult<T>>,
    {
        let outcome = body(&mut self).await;
        let committed = self.commit().await;

        self.settle(outcome, committed)
    }

    /// Picks the result of a scope from its body outcome and its final commit.
    pub(crate) fn settle<T>(
        &self,
        outcome: DocumentStoreResult<T>,
        committed: DocumentStoreResult<BulkWriteResult>,
    ) -> DocumentStoreResult<T> {
        match (outcome, committed) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(commit_err)) => {
                log::error!(
                    "batch commit on {} failed after an earlier error: {}",
                    self.collection.namespace(),
                    commit_err
                );
                Err(err)
            }
        }
    }
}

impl<'a, B: StoreBackend, M: Model> Drop for BatchWriter<'a, B, M> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            log::warn!(
                "batch writer on {} dropped with {} uncommitted operation(s)",
                self.collection.namespace(),
                self.pending.len()
            );
        }
    }
}

impl<'a, B: StoreBackend, M: Model> std::fmt::Debug for BatchWriter<'a, B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("namespace", self.collection.namespace())
            .field("pending", &self.pending.len())
            .field("page_limit", &self.page_limit)
            .field("ordered", &self.ordered)
            .field("state", &self.state)
            .finish()
    }
}
