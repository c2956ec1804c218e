//! Query and mutation surface of a model type.
//!
//! A [`ModelCollection`] binds a model type to its namespace on a backend. Class-level
//! operations (`get`, `find`, `query`, `count`, ...) take filters; instance-level
//! operations (`save`, `delete`, `update`, `increment`) resolve the instance's identity
//! first: `{_id: object_id}` when the instance has been saved or fetched, otherwise the
//! raw fields it was constructed from.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let movies = store.models::<Movie>();
//!
//! let mut movie = Movie::with_hash_key("m1", doc! { "title": "Casablanca" })?;
//! movies.save(&mut movie).await?;
//!
//! movies.update(&mut movie, doc! { "year": 1942 }, UpdateOptions::default()).await?;
//! let recent = movies
//!     .find(doc! { "year": { "$gte": 1940 } }, FindOptions::builder().limit(10).build())
//!     .await?;
//! ```

use bson::{Bson, Document, doc};
use std::{fmt, marker::PhantomData};

use crate::{
    backend::{Namespace, StoreBackend},
    batch::BatchWriter,
    blocking::BlockingModelCollection,
    error::{DocumentStoreError, DocumentStoreResult},
    model::{Model, ModelExt, ModelKind},
    query::{FindOptions, IndexSpec, UpdateOptions, count_value},
    write::{DeleteResult, InsertOneResult, UpdateResult},
};

/// Operations of model type `M` against one backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
/// * `M` - The model type
pub struct ModelCollection<'a, B: StoreBackend, M: Model> {
    namespace: Namespace,
    backend: &'a B,
    _marker: PhantomData<M>,
}

impl<'a, B: StoreBackend, M: Model> ModelCollection<'a, B, M> {
    pub(crate) fn new(namespace: Namespace, backend: &'a B) -> Self {
        Self {
            namespace,
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the namespace this collection reads and writes.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub(crate) fn backend(&self) -> &'a B {
        self.backend
    }

    /// Returns the blocking variant of this collection.
    pub fn blocking(&self) -> BlockingModelCollection<'a, B, M> {
        BlockingModelCollection::new(self.clone())
    }

    /// Starts a batch of writes against this collection.
    pub fn batch_write(&self) -> BatchWriter<'a, B, M> {
        BatchWriter::new(self.clone())
    }

    /// Fetches exactly one instance.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DoesNotExist`] carrying `M`'s [`ModelKind`] when
    /// nothing matches `filter`.
    pub async fn get(&self, filter: Document, projection: Option<Document>) -> DocumentStoreResult<M> {
        log::debug!("find_one on {}: {}", self.namespace, filter);

        match self
            .backend
            .find_one(&self.namespace, filter, projection)
            .await?
        {
            Some(document) => M::from_raw(document),
            None => Err(DocumentStoreError::DoesNotExist(ModelKind::of::<M>())),
        }
    }

    /// Fetches every instance matching `filter`.
    ///
    /// When `options.explain` is set the query plan is fetched and logged at info
    /// level; the returned list is unaffected.
    pub async fn find(&self, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<M>> {
        log::debug!("find on {}: {} {:?}", self.namespace, filter, options);

        let documents = self
            .backend
            .find(&self.namespace, filter.clone(), options.clone())
            .await?;

        if options.explain {
            let plan = self
                .backend
                .explain(&self.namespace, filter, options)
                .await?;
            log::info!("query plan on {}: {}", self.namespace, plan);
        }

        documents
            .into_iter()
            .map(M::from_raw)
            .collect()
    }

    /// Keyword-style find: every key of `fields` is an equality condition, except
    /// `offset` and `limit`, which are removed and applied as skip and limit.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidAttributeValue`] if `offset` or `limit` is
    /// not a non-negative integer.
    pub async fn query(&self, mut fields: Document, mut options: FindOptions) -> DocumentStoreResult<Vec<M>> {
        if let Some(offset) = fields.remove("offset") {
            options.skip = Some(count_value("offset", &offset)? as u64);
        }
        if let Some(limit) = fields.remove("limit") {
            options.limit = Some(count_value("limit", &limit)?);
        }

        self.find(fields, options).await
    }

    /// Fetches every instance whose hash key is one of `ids`.
    ///
    /// An empty `ids` returns an empty list without contacting the store.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidSchema`] if `M` declares no hash key.
    pub async fn batch_get(&self, ids: Vec<Bson>, projection: Option<Document>) -> DocumentStoreResult<Vec<M>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let hash_key = M::schema().hash_key().ok_or_else(|| {
            DocumentStoreError::InvalidSchema(format!("{} has no hash key", M::schema().model()))
        })?;

        let options = FindOptions {
            projection,
            ..FindOptions::default()
        };

        self.find(doc! { hash_key: { "$in": ids } }, options)
            .await
    }

    /// Inserts the instance and records the store-assigned object id on it.
    pub async fn save(&self, item: &mut M) -> DocumentStoreResult<InsertOneResult> {
        let document = item.attributes().values().clone();
        log::debug!("insert_one on {}: {}", self.namespace, document);

        let result = self
            .backend
            .insert_one(&self.namespace, document)
            .await?;
        item.attributes_mut()
            .set_object_id(result.inserted_id.clone());

        Ok(result)
    }

    /// Deletes the document the instance targets.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AttributesEmpty`] without contacting the store if
    /// the instance has no identity.
    pub async fn delete(&self, item: &M) -> DocumentStoreResult<DeleteResult> {
        let filter = item.identity_filter("delete")?;
        log::debug!("delete_one on {}: {}", self.namespace, filter);

        self.backend
            .delete_one(&self.namespace, filter)
            .await
    }

    /// Applies `{$set: delta}` to the document the instance targets.
    ///
    /// With `options.reload` and a non-zero modified count the instance is re-fetched
    /// with the same identity filter and every field is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AttributesEmpty`] if the instance has no identity,
    /// or [`DocumentStoreError::DoesNotExist`] if the reload finds nothing.
    pub async fn update(
        &self,
        item: &mut M,
        delta: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        let filter = item.identity_filter("update")?;
        log::debug!("update_one on {}: {} $set {}", self.namespace, filter, delta);

        let result = self
            .backend
            .update_one(
                &self.namespace,
                filter.clone(),
                doc! { "$set": delta },
                options.upsert,
            )
            .await?;

        if result.modified_count > 0 && options.reload {
            let fresh = self.get(filter, None).await?;
            item.attributes_mut()
                .reload_from(fresh.attributes());
        }

        Ok(result)
    }

    /// Applies `{$inc: delta}` to the document the instance targets. No reload.
    pub async fn increment(&self, item: &M, delta: Document, upsert: bool) -> DocumentStoreResult<UpdateResult> {
        let filter = item.identity_filter("increment")?;
        log::debug!("update_one on {}: {} $inc {}", self.namespace, filter, delta);

        self.backend
            .update_one(&self.namespace, filter, doc! { "$inc": delta }, upsert)
            .await
    }

    pub async fn count(&self, filter: Document) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(&self.namespace, filter)
            .await
    }

    /// Creates an index on the collection and returns its name.
    pub async fn create_index(&self, index: IndexSpec) -> DocumentStoreResult<String> {
        log::debug!("create_index on {}: {}", self.namespace, index.keys);

        self.backend
            .create_index(&self.namespace, index)
            .await
    }

    /// Runs an aggregation pipeline. Results are raw documents, not instances of `M`.
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .aggregate(&self.namespace, pipeline)
            .await
    }

    /// Deletes every document matching `filter`.
    pub async fn delete_many(&self, filter: Document) -> DocumentStoreResult<DeleteResult> {
        log::debug!("delete_many on {}: {}", self.namespace, filter);

        self.backend
            .delete_many(&self.namespace, filter)
            .await
    }

    /// Applies an update operator document to every document matching `filter`.
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        log::debug!("update_many on {}: {} {}", self.namespace, filter, update);

        self.backend
            .update_many(&self.namespace, filter, update, upsert)
            .await
    }
}

impl<'a, B: StoreBackend, M: Model> Clone for ModelCollection<'a, B, M> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            backend: self.backend,
            _marker: PhantomData,
        }
    }
}

impl<'a, B: StoreBackend, M: Model> fmt::Debug for ModelCollection<'a, B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCollection")
            .field("model", &M::schema().model())
            .field("namespace", &self.namespace)
            .field("backend", self.backend)
            .finish()
    }
}
