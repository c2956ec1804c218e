//! Blocking variants of the model operations.
//!
//! Every method drives the matching async operation of [`ModelCollection`] to
//! completion on a process-wide multi-threaded Tokio runtime, created on first use.
//!
//! Blocking calls must not be made from inside an async context: Tokio panics when a
//! runtime is blocked on from one of its own worker threads.
//!
//! # Example
//!
//! ```ignore
//! let movies = store.models::<Movie>().blocking();
//!
//! let movie = movies.get(doc! { "movie_id": "m1" }, None)?;
//! let count = movies.count(doc! {})?;
//! ```

use bson::{Bson, Document};
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Runtime};

use crate::{
    backend::StoreBackend,
    batch::{BatchState, BatchWriter},
    collection::ModelCollection,
    error::{DocumentStoreError, DocumentStoreResult},
    model::Model,
    query::{FindOptions, IndexSpec, UpdateOptions},
    write::{BulkWriteResult, DeleteResult, InsertOneResult, UpdateResult},
};

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Returns the shared runtime of the blocking surface, creating it on first use.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Initialization`] if the runtime cannot be created.
pub fn runtime() -> DocumentStoreResult<&'static Runtime> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("docmodel-blocking")
            .build()
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))
    })
}

/// Blocking operations of model type `M`. See [`ModelCollection`] for semantics.
#[derive(Debug)]
pub struct BlockingModelCollection<'a, B: StoreBackend, M: Model> {
    inner: ModelCollection<'a, B, M>,
}

impl<'a, B: StoreBackend, M: Model> BlockingModelCollection<'a, B, M> {
    pub(crate) fn new(inner: ModelCollection<'a, B, M>) -> Self {
        Self { inner }
    }

    /// Returns the async collection this wraps.
    pub fn as_async(&self) -> &ModelCollection<'a, B, M> {
        &self.inner
    }

    pub fn get(&self, filter: Document, projection: Option<Document>) -> DocumentStoreResult<M> {
        runtime()?.block_on(self.inner.get(filter, projection))
    }

    pub fn find(&self, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<M>> {
        runtime()?.block_on(self.inner.find(filter, options))
    }

    pub fn query(&self, fields: Document, options: FindOptions) -> DocumentStoreResult<Vec<M>> {
        runtime()?.block_on(self.inner.query(fields, options))
    }

    pub fn batch_get(&self, ids: Vec<Bson>, projection: Option<Document>) -> DocumentStoreResult<Vec<M>> {
        runtime()?.block_on(self.inner.batch_get(ids, projection))
    }

    pub fn save(&self, item: &mut M) -> DocumentStoreResult<InsertOneResult> {
        runtime()?.block_on(self.inner.save(item))
    }

    pub fn delete(&self, item: &M) -> DocumentStoreResult<DeleteResult> {
        runtime()?.block_on(self.inner.delete(item))
    }

    pub fn update(&self, item: &mut M, delta: Document, options: UpdateOptions) -> DocumentStoreResult<UpdateResult> {
        runtime()?.block_on(self.inner.update(item, delta, options))
    }

    pub fn increment(&self, item: &M, delta: Document, upsert: bool) -> DocumentStoreResult<UpdateResult> {
        runtime()?.block_on(self.inner.increment(item, delta, upsert))
    }

    pub fn count(&self, filter: Document) -> DocumentStoreResult<u64> {
        runtime()?.block_on(self.inner.count(filter))
    }

    pub fn create_index(&self, index: IndexSpec) -> DocumentStoreResult<String> {
        runtime()?.block_on(self.inner.create_index(index))
    }

    pub fn aggregate(&self, pipeline: Vec<Document>) -> DocumentStoreResult<Vec<Document>> {
        runtime()?.block_on(self.inner.aggregate(pipeline))
    }

    pub fn delete_many(&self, filter: Document) -> DocumentStoreResult<DeleteResult> {
        runtime()?.block_on(self.inner.delete_many(filter))
    }

    pub fn update_many(&self, filter: Document, update: Document, upsert: bool) -> DocumentStoreResult<UpdateResult> {
        runtime()?.block_on(self.inner.update_many(filter, update, upsert))
    }

    /// Starts a blocking batch of writes.
    pub fn batch_write(&self) -> BlockingBatchWriter<'a, B, M> {
        BlockingBatchWriter {
            inner: self.inner.batch_write(),
        }
    }
}

impl<'a, B: StoreBackend, M: Model> Clone for BlockingModelCollection<'a, B, M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Blocking variant of [`BatchWriter`].
#[derive(Debug)]
pub struct BlockingBatchWriter<'a, B: StoreBackend, M: Model> {
    inner: BatchWriter<'a, B, M>,
}

impl<'a, B: StoreBackend, M: Model> BlockingBatchWriter<'a, B, M> {
    pub fn page_limit(mut self, page_limit: usize) -> Self {
        self.inner = self.inner.page_limit(page_limit);
        self
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.inner = self.inner.ordered(ordered);
        self
    }

    pub fn state(&self) -> BatchState {
        self.inner.state()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn save(&mut self, item: &M) -> DocumentStoreResult<()> {
        runtime()?.block_on(self.inner.save(item))
    }

    pub fn delete(&mut self, item: &M) -> DocumentStoreResult<()> {
        runtime()?.block_on(self.inner.delete(item))
    }

    pub fn update(&mut self, item: &M, update: Document, upsert: bool) -> DocumentStoreResult<()> {
        runtime()?.block_on(self.inner.update(item, update, upsert))
    }

    pub fn increment(&mut self, item: &M, update: Document, upsert: bool) -> DocumentStoreResult<()> {
        runtime()?.block_on(self.inner.increment(item, update, upsert))
    }

    pub fn commit(&mut self) -> DocumentStoreResult<BulkWriteResult> {
        runtime()?.block_on(self.inner.commit())
    }

    /// Runs `body` with this writer, then commits whatever is still queued.
    ///
    /// Error precedence matches [`BatchWriter::scope`].
    pub fn scope<T, F>(mut self, body: F) -> DocumentStoreResult<T>
    where
        F: FnOnce(&mut Self) -> DocumentStoreResult<T>,
    {
        let outcome = body(&mut self);
        let committed = self.commit();

        self.inner.settle(outcome, committed)
    }
}
