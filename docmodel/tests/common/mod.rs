#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use docmodel::{
    backend::{Namespace, StoreBackend},
    error::{BulkWriteFailure, DocumentStoreError, DocumentStoreResult},
    memory::InMemoryStore,
    prelude::*,
    query::IndexSpec,
    write::{BulkWriteResult, DeleteResult, InsertOneResult, UpdateResult, WriteRequest},
};

#[model]
pub struct Audited {
    created: UtcDateTime,
    owner: Text,
}

#[model(collection = "movies", extends = Audited)]
pub struct Movie {
    #[attribute(hash_key)]
    movie_id: Text,
    #[attribute(default = "CN")]
    title: Text,
    year: Number,
    languages: List,
    #[attribute(null)]
    meta: Json,
    #[attribute(name = "views_total")]
    views: Number,
}

#[model(collection = "reviews", database = "critics")]
pub struct Review {
    body: Text,
    stars: Number,
}

pub fn movie(id: &str, year: i32) -> Movie {
    Movie::with_hash_key(id, doc! { "year": year }).unwrap()
}

/// A backend call as seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindOne(Document),
    Find(Document, FindOptions),
    Explain(Document),
    InsertOne(Document),
    DeleteOne(Document),
    DeleteMany(Document),
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateMany(Document),
    Count(Document),
    CreateIndex(Document),
    Aggregate(Vec<Document>),
    BulkWrite {
        requests: Vec<WriteRequest>,
        ordered: bool,
    },
}

/// In-memory backend that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    calls: Mutex<Vec<Call>>,
    fail_bulk_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Returns the requests of every bulk write, in call order.
    pub fn bulk_writes(&self) -> Vec<Vec<WriteRequest>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::BulkWrite { requests, .. } => Some(requests),
                _ => None,
            })
            .collect()
    }

    /// Makes every following bulk write fail without touching the data.
    pub fn fail_bulk_writes(&self, fail: bool) {
        self.fail_bulk_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreBackend for RecordingStore {
    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.record(Call::FindOne(filter.clone()));
        self.inner.find_one(namespace, filter, projection).await
    }

    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.record(Call::Find(filter.clone(), options.clone()));
        self.inner.find(namespace, filter, options).await
    }

    async fn explain(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Document> {
        self.record(Call::Explain(filter.clone()));
        self.inner.explain(namespace, filter, options).await
    }

    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
    ) -> DocumentStoreResult<InsertOneResult> {
        self.record(Call::InsertOne(document.clone()));
        self.inner.insert_one(namespace, document).await
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        self.record(Call::DeleteOne(filter.clone()));
        self.inner.delete_one(namespace, filter).await
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        self.record(Call::DeleteMany(filter.clone()));
        self.inner.delete_many(namespace, filter).await
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        self.record(Call::UpdateOne {
            filter: filter.clone(),
            update: update.clone(),
            upsert,
        });
        self.inner.update_one(namespace, filter, update, upsert).await
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        self.record(Call::UpdateMany(filter.clone()));
        self.inner.update_many(namespace, filter, update, upsert).await
    }

    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<u64> {
        self.record(Call::Count(filter.clone()));
        self.inner.count_documents(namespace, filter).await
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        index: IndexSpec,
    ) -> DocumentStoreResult<String> {
        self.record(Call::CreateIndex(index.keys.clone()));
        self.inner.create_index(namespace, index).await
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.record(Call::Aggregate(pipeline.clone()));
        self.inner.aggregate(namespace, pipeline).await
    }

    async fn bulk_write(
        &self,
        namespace: &Namespace,
        requests: Vec<WriteRequest>,
        ordered: bool,
    ) -> DocumentStoreResult<BulkWriteResult> {
        self.record(Call::BulkWrite {
            requests: requests.clone(),
            ordered,
        });

        if self.fail_bulk_writes.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::BulkWrite(BulkWriteFailure {
                write_concern_errors: vec!["injected failure".into()],
                ..BulkWriteFailure::default()
            }));
        }

        self.inner.bulk_write(namespace, requests, ordered).await
    }
}
