//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that keeps documents per namespace
//! in insertion order, behind an async-safe read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use docmodel_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    error::{BulkWriteFailure, BulkWriteItemError, DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, IndexSpec},
    schema::OBJECT_ID_FIELD,
    write::{BulkWriteResult, DeleteResult, InsertOneResult, UpdateResult, WriteRequest},
};

use crate::{
    cursor::{apply_find_options, project, run_pipeline},
    evaluator::{DocumentEvaluator, lookup},
    update::{apply_update, upsert_seed},
};

/// Database used for namespaces that do not name one.
pub const DEFAULT_DATABASE: &str = "test";

/// Error code the store reports for unique index violations.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Error code reported for any other rejected write.
const BAD_VALUE_CODE: i32 = 2;

type StoreMap = HashMap<(String, String), CollectionState>;

#[derive(Debug, Default, Clone)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl CollectionState {
    fn matching(&self, filter: &Document) -> DocumentStoreResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in self.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    /// Checks `candidate` against `_id` and every unique index, ignoring the document
    /// at `replacing`.
    fn check_unique(&self, candidate: &Document, replacing: Option<usize>) -> DocumentStoreResult<()> {
        let id_index = IndexSpec::field(OBJECT_ID_FIELD).unique(true);
        let unique = std::iter::once(&id_index).chain(self.indexes.iter().filter(|index| index.unique));

        for index in unique {
            let key = index
                .keys
                .keys()
                .map(|field| lookup(candidate, field))
                .collect::<Vec<_>>();

            let clash = self
                .documents
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != replacing)
                .any(|(_, existing)| {
                    index
                        .keys
                        .keys()
                        .map(|field| lookup(existing, field))
                        .eq(key.iter().copied())
                });

            if clash {
                return Err(DocumentStoreError::DuplicateKey(format!(
                    "E11000 duplicate key error index: {} dup key: {:?}",
                    index.name.clone().unwrap_or_else(|| index.default_name()),
                    key
                )));
            }
        }

        Ok(())
    }

    fn insert(&mut self, mut document: Document) -> DocumentStoreResult<Bson> {
        if !document.contains_key(OBJECT_ID_FIELD) {
            let mut with_id = doc! { OBJECT_ID_FIELD: ObjectId::new() };
            for (key, value) in document {
                with_id.insert(key, value);
            }
            document = with_id;
        }

        self.check_unique(&document, None)?;

        let id = document
            .get(OBJECT_ID_FIELD)
            .cloned()
            .unwrap_or(Bson::Null);
        self.documents.push(document);

        Ok(id)
    }

    fn delete(&mut self, filter: &Document, many: bool) -> DocumentStoreResult<u64> {
        let mut positions = self.matching(filter)?;
        if !many {
            positions.truncate(1);
        }

        for position in positions.iter().rev() {
            self.documents.remove(*position);
        }

        Ok(positions.len() as u64)
    }

    fn update(
        &mut self,
        filter: &Document,
        update: &Document,
        upsert: bool,
        many: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let mut positions = self.matching(filter)?;
        if !many {
            positions.truncate(1);
        }

        if positions.is_empty() {
            if !upsert {
                return Ok(UpdateResult::default());
            }

            let mut seed = upsert_seed(filter)?;
            apply_update(&mut seed, update)?;
            let id = self.insert(seed)?;

            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            });
        }

        let mut result = UpdateResult {
            matched_count: positions.len() as u64,
            ..UpdateResult::default()
        };

        for position in positions {
            let mut updated = self.documents[position].clone();

            if apply_update(&mut updated, update)? {
                if updated.get(OBJECT_ID_FIELD) != self.documents[position].get(OBJECT_ID_FIELD) {
                    return Err(DocumentStoreError::Backend(
                        "the _id field cannot be modified".to_string(),
                    ));
                }

                self.check_unique(&updated, Some(position))?;
                self.documents[position] = updated;
                result.modified_count += 1;
            }
        }

        Ok(result)
    }
}

/// Thread-safe in-memory document storage backend.
///
/// Implements the [`StoreBackend`] trait with the store's filter, update and cursor
/// semantics for the operators listed in [`crate::evaluator`] and [`crate::update`].
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan every document of a collection. Indexes are recorded, and unique
/// ones enforced, but never used for lookups.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::{Namespace, StoreBackend};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let users = Namespace::new(None, "users");
///
/// store.insert_one(&users, doc! { "name": "Alice", "age": 30 }).await?;
/// assert_eq!(store.count_documents(&users, doc! {}).await?, 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
    default_database: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            default_database: DEFAULT_DATABASE.to_string(),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn key(&self, namespace: &Namespace) -> (String, String) {
        (
            namespace
                .database
                .clone()
                .unwrap_or_else(|| self.default_database.clone()),
            namespace.collection.clone(),
        )
    }

    /// Returns every document of a namespace, in insertion order.
    pub async fn dump(&self, namespace: &Namespace) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(&self.key(namespace))
            .map(|collection| collection.documents.clone())
            .unwrap_or_default()
    }

    /// Returns the indexes created on a namespace.
    pub async fn indexes(&self, namespace: &Namespace) -> Vec<IndexSpec> {
        self.store
            .read()
            .await
            .get(&self.key(namespace))
            .map(|collection| collection.indexes.clone())
            .unwrap_or_default()
    }

    async fn matching_documents(&self, namespace: &Namespace, filter: &Document) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;

        match store.get(&self.key(namespace)) {
            Some(collection) => DocumentEvaluator::filter_documents(collection.documents.iter(), filter),
            None => Ok(Vec::new()),
        }
    }
}

fn item_error(index: usize, err: DocumentStoreError) -> BulkWriteItemError {
    let code = match err {
        DocumentStoreError::DuplicateKey(_) => DUPLICATE_KEY_CODE,
        _ => BAD_VALUE_CODE,
    };

    BulkWriteItemError {
        index,
        code,
        message: err.to_string(),
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> DocumentStoreResult<Option<Document>> {
        let found = self
            .matching_documents(namespace, &filter)
            .await?
            .into_iter()
            .next();

        match (found, projection) {
            (Some(document), Some(projection)) => Ok(Some(project(document, &projection)?)),
            (found, _) => Ok(found),
        }
    }

    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let documents = self.matching_documents(namespace, &filter).await?;

        apply_find_options(documents, &options)
    }

    async fn explain(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Document> {
        let (database, collection) = self.key(namespace);
        let returned = self
            .find(namespace, filter.clone(), options)
            .await?
            .len() as i64;

        Ok(doc! {
            "queryPlanner": {
                "namespace": format!("{database}.{collection}"),
                "parsedQuery": filter,
                "winningPlan": { "stage": "COLLSCAN" },
            },
            "executionStats": { "nReturned": returned },
        })
    }

    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
    ) -> DocumentStoreResult<InsertOneResult> {
        let mut store = self.store.write().await;
        let inserted_id = store
            .entry(self.key(namespace))
            .or_default()
            .insert(document)?;

        Ok(InsertOneResult { inserted_id })
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        let mut store = self.store.write().await;
        let deleted_count = match store.get_mut(&self.key(namespace)) {
            Some(collection) => collection.delete(&filter, false)?,
            None => 0,
        };

        Ok(DeleteResult { deleted_count })
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        let mut store = self.store.write().await;
        let deleted_count = match store.get_mut(&self.key(namespace)) {
            Some(collection) => collection.delete(&filter, true)?,
            None => 0,
        };

        Ok(DeleteResult { deleted_count })
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let mut store = self.store.write().await;

        store
            .entry(self.key(namespace))
            .or_default()
            .update(&filter, &update, upsert, false)
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let mut store = self.store.write().await;

        store
            .entry(self.key(namespace))
            .or_default()
            .update(&filter, &update, upsert, true)
    }

    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<u64> {
        Ok(self
            .matching_documents(namespace, &filter)
            .await?
            .len() as u64)
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        index: IndexSpec,
    ) -> DocumentStoreResult<String> {
        let mut store = self.store.write().await;
        let collection = store.entry(self.key(namespace)).or_default();
        let name = index.name.clone().unwrap_or_else(|| index.default_name());

        if let Some(existing) = collection
            .indexes
            .iter()
            .find(|existing| existing.name.clone().unwrap_or_else(|| existing.default_name()) == name)
        {
            if existing.keys != index.keys || existing.unique != index.unique {
                return Err(DocumentStoreError::Backend(format!(
                    "an index named {name} already exists with different options"
                )));
            }

            return Ok(name);
        }

        if index.unique {
            let candidate = CollectionState {
                documents: collection.documents.clone(),
                indexes: vec![index.clone()],
            };

            for (position, document) in candidate.documents.iter().enumerate() {
                candidate.check_unique(document, Some(position))?;
            }
        }

        collection.indexes.push(index.name(name.clone()));

        Ok(name)
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let documents = self.dump(namespace).await;

        run_pipeline(documents, &pipeline)
    }

    async fn bulk_write(
        &self,
        namespace: &Namespace,
        requests: Vec<WriteRequest>,
        ordered: bool,
    ) -> DocumentStoreResult<BulkWriteResult> {
        let mut store = self.store.write().await;
        let collection = store.entry(self.key(namespace)).or_default();

        let mut result = BulkWriteResult::default();
        let mut write_errors = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            let outcome = match request {
                WriteRequest::InsertOne { document } => collection
                    .insert(document)
                    .map(|_| result.inserted_count += 1),
                WriteRequest::DeleteOne { filter } => collection
                    .delete(&filter, false)
                    .map(|deleted| result.deleted_count += deleted),
                WriteRequest::UpdateOne { filter, update, upsert } => collection
                    .update(&filter, &update, upsert, false)
                    .map(|updated| {
                        result.matched_count += updated.matched_count;
                        result.modified_count += updated.modified_count;
                        result.upserted_count += u64::from(updated.upserted_id.is_some());
                    }),
            };

            if let Err(err) = outcome {
                write_errors.push(item_error(index, err));

                if ordered {
                    break;
                }
            }
        }

        if write_errors.is_empty() {
            return Ok(result);
        }

        log::debug!(
            "bulk write on {} failed for {} request(s)",
            namespace,
            write_errors.len()
        );

        Err(DocumentStoreError::BulkWrite(BulkWriteFailure {
            applied: result.applied(),
            write_errors,
            write_concern_errors: Vec::new(),
        }))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.store.write().await.clear();

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().default_database("catalog").build().await?;
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder {
    default_database: String,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            default_database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl InMemoryStoreBuilder {
    /// Sets the database used for namespaces that do not name one.
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore {
            default_database: self.default_database,
            ..InMemoryStore::new()
        })
    }
}
