//! Store session abstraction.
//!
//! This module defines the operation set the model layer needs from a document store.
//! Connection bootstrap, pooling and the wire protocol stay behind the
//! [`StoreBackend`] implementation (see the `docmodel-memory` and `docmodel-mongodb`
//! crates); models only ever call the methods below.
//!
//! # Overview
//!
//! Every method receives the [`Namespace`] of the collection it operates on. Filters,
//! update documents and aggregation pipelines are passed through verbatim.
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::{Namespace, StoreBackend};
//! use bson::doc;
//!
//! let movies = Namespace::new(None, "movies");
//! backend.insert_one(&movies, doc! { "title": "Casablanca" }).await?;
//! let found = backend.find_one(&movies, doc! { "title": "Casablanca" }, None).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{fmt, fmt::Debug, sync::Arc};

use crate::{
    error::DocumentStoreResult,
    query::{FindOptions, IndexSpec},
    write::{BulkWriteResult, DeleteResult, InsertOneResult, UpdateResult, WriteRequest},
};

/// A database and collection pair.
///
/// A `None` database means the backend's default database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: Option<String>,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: Option<&str>, collection: &str) -> Self {
        Self {
            database: database.map(str::to_string),
            collection: collection.to_string(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(database) => write!(f, "{}.{}", database, self.collection),
            None => write!(f, "<default>.{}", self.collection),
        }
    }
}

/// Abstract interface for document store sessions.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. The model layer shares one backend across all
/// model types and never mutates its configuration after construction.
///
/// # Timeouts
///
/// Implementations talking to a remote store must bound server selection and fail with
/// [`DocumentStoreError::ConnectivityTimeout`](crate::error::DocumentStoreError::ConnectivityTimeout)
/// instead of hanging.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Unique index violations should be reported as
/// [`DocumentStoreError::DuplicateKey`](crate::error::DocumentStoreError::DuplicateKey),
/// partial bulk failures as
/// [`DocumentStoreError::BulkWrite`](crate::error::DocumentStoreError::BulkWrite).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the first document matching `filter`, restricted to `projection`.
    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Returns all documents matching `filter`.
    ///
    /// Cursor modifiers are applied in the order sort, skip, limit, hint. The
    /// `explain` flag of `options` is ignored here; see [`StoreBackend::explain`].
    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the store's query plan for a `find` with the same arguments.
    async fn explain(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Document>;

    /// Inserts one document. The store assigns `_id` when the document has none.
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
    ) -> DocumentStoreResult<InsertOneResult>;

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult>;

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Applies an update operator document to the first document matching `filter`.
    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Applies an update operator document to every document matching `filter`.
    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult>;

    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<u64>;

    /// Creates an index and returns its name.
    async fn create_index(
        &self,
        namespace: &Namespace,
        index: IndexSpec,
    ) -> DocumentStoreResult<String>;

    /// Runs an aggregation pipeline and returns the raw result documents.
    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Executes `requests` as one bulk write.
    ///
    /// With `ordered` the store applies the requests serially and stops at the first
    /// failure; otherwise it attempts every request. Per-request failures are reported
    /// as [`DocumentStoreError::BulkWrite`](crate::error::DocumentStoreError::BulkWrite).
    async fn bulk_write(
        &self,
        namespace: &Namespace,
        requests: Vec<WriteRequest>,
        ordered: bool,
    ) -> DocumentStoreResult<BulkWriteResult>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with persistent storage or
    /// external connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

macro_rules! forward_store_backend {
    ($ty:ty) => {
        #[async_trait]
        impl<B> StoreBackend for $ty
        where
            B: StoreBackend + ?Sized,
        {
            async fn find_one(
                &self,
                namespace: &Namespace,
                filter: Document,
                projection: Option<Document>,
            ) -> DocumentStoreResult<Option<Document>> {
                (**self).find_one(namespace, filter, projection).await
            }

            async fn find(
                &self,
                namespace: &Namespace,
                filter: Document,
                options: FindOptions,
            ) -> DocumentStoreResult<Vec<Document>> {
                (**self).find(namespace, filter, options).await
            }

            async fn explain(
                &self,
                namespace: &Namespace,
                filter: Document,
                options: FindOptions,
            ) -> DocumentStoreResult<Document> {
                (**self).explain(namespace, filter, options).await
            }

            async fn insert_one(
                &self,
                namespace: &Namespace,
                document: Document,
            ) -> DocumentStoreResult<InsertOneResult> {
                (**self).insert_one(namespace, document).await
            }

            async fn delete_one(
                &self,
                namespace: &Namespace,
                filter: Document,
            ) -> DocumentStoreResult<DeleteResult> {
                (**self).delete_one(namespace, filter).await
            }

            async fn delete_many(
                &self,
                namespace: &Namespace,
                filter: Document,
            ) -> DocumentStoreResult<DeleteResult> {
                (**self).delete_many(namespace, filter).await
            }

            async fn update_one(
                &self,
                namespace: &Namespace,
                filter: Document,
                update: Document,
                upsert: bool,
            ) -> DocumentStoreResult<UpdateResult> {
                (**self).update_one(namespace, filter, update, upsert).await
            }

            async fn update_many(
                &self,
                namespace: &Namespace,
                filter: Document,
                update: Document,
                upsert: bool,
            ) -> DocumentStoreResult<UpdateResult> {
                (**self).update_many(namespace, filter, update, upsert).await
            }

            async fn count_documents(
                &self,
                namespace: &Namespace,
                filter: Document,
            ) -> DocumentStoreResult<u64> {
                (**self).count_documents(namespace, filter).await
            }

            async fn create_index(
                &self,
                namespace: &Namespace,
                index: IndexSpec,
            ) -> DocumentStoreResult<String> {
                (**self).create_index(namespace, index).await
            }

            async fn aggregate(
                &self,
                namespace: &Namespace,
                pipeline: Vec<Document>,
            ) -> DocumentStoreResult<Vec<Document>> {
                (**self).aggregate(namespace, pipeline).await
            }

            async fn bulk_write(
                &self,
                namespace: &Namespace,
                requests: Vec<WriteRequest>,
                ordered: bool,
            ) -> DocumentStoreResult<BulkWriteResult> {
                (**self).bulk_write(namespace, requests, ordered).await
            }
        }
    };
}

forward_store_backend!(&B);
forward_store_backend!(Arc<B>);

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
