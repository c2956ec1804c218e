use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::{Client, Collection as MongoCollection, Database, options::ClientOptions};
use std::time::Duration;

use docmodel_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    config::{DEFAULT_SERVER_SELECTION_TIMEOUT_MS, StoreConfig},
    error::{BulkWriteFailure, DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, IndexSpec},
    write::{BulkWriteResult, DeleteResult, InsertOneResult, UpdateResult, WriteRequest},
};

use crate::{
    bulk::{command, group_requests, record_reply},
    error::map_error,
    options::{explain_command, find_one_options, find_options, index_model},
};

/// Database used when neither the builder nor the connection string names one.
pub const FALLBACK_DATABASE: &str = "test";

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    default_database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, default_database: String) -> Self {
        Self {
            client,
            default_database,
        }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    /// Creates a builder from connection settings.
    pub fn from_config(config: &StoreConfig) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder {
            uri: config.uri.clone(),
            database: config.default_database.clone(),
            server_selection_timeout: config.server_selection_timeout(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_database(&self, namespace: &Namespace) -> Database {
        self.client.database(
            namespace
                .database
                .as_deref()
                .unwrap_or(&self.default_database),
        )
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.get_database(namespace)
            .collection(&namespace.collection)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one(filter)
            .with_options(find_one_options(projection))
            .await
            .map_err(map_error)
    }

    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(namespace)
            .find(filter)
            .with_options(find_options(options))
            .await
            .map_err(map_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_error)
    }

    async fn explain(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Document> {
        self.get_database(namespace)
            .run_command(explain_command(&namespace.collection, filter, options))
            .await
            .map_err(map_error)
    }

    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
    ) -> DocumentStoreResult<InsertOneResult> {
        let result = self
            .get_collection(namespace)
            .insert_one(document)
            .await
            .map_err(map_error)?;

        Ok(InsertOneResult {
            inserted_id: result.inserted_id,
        })
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        let result = self
            .get_collection(namespace)
            .delete_one(filter)
            .await
            .map_err(map_error)?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<DeleteResult> {
        let result = self
            .get_collection(namespace)
            .delete_many(filter)
            .await
            .map_err(map_error)?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let result = self
            .get_collection(namespace)
            .update_one(filter, update)
            .upsert(upsert)
            .await
            .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let result = self
            .get_collection(namespace)
            .update_many(filter, update)
            .upsert(upsert)
            .await
            .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<u64> {
        self.get_collection(namespace)
            .count_documents(filter)
            .await
            .map_err(map_error)
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        index: IndexSpec,
    ) -> DocumentStoreResult<String> {
        let result = self
            .get_collection(namespace)
            .create_index(index_model(index))
            .await
            .map_err(map_error)?;

        Ok(result.index_name)
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(namespace)
            .aggregate(pipeline)
            .await
            .map_err(map_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_error)
    }

    async fn bulk_write(
        &self,
        namespace: &Namespace,
        requests: Vec<WriteRequest>,
        ordered: bool,
    ) -> DocumentStoreResult<BulkWriteResult> {
        let database = self.get_database(namespace);
        let mut result = BulkWriteResult::default();
        let mut failure = BulkWriteFailure::default();

        for group in group_requests(requests) {
            let (kind, offset) = (group.kind, group.offset);

            let reply = match database
                .run_command(command(&namespace.collection, group, ordered))
                .await
            {
                Ok(reply) => reply,
                Err(err) => {
                    log::warn!(
                        "bulk write on {} aborted after {} applied operation(s): {}",
                        namespace,
                        result.applied(),
                        err
                    );
                    return Err(map_error(err));
                }
            };

            let failed = record_reply(kind, offset, &reply, &mut result, &mut failure);
            if failed && ordered {
                break;
            }
        }

        if failure.write_errors.is_empty() && failure.write_concern_errors.is_empty() {
            return Ok(result);
        }

        log::debug!(
            "bulk write on {} failed: {} write error(s)",
            namespace,
            failure.write_errors.len()
        );

        failure.applied = result.applied();
        Err(DocumentStoreError::BulkWrite(failure))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    uri: String,
    database: Option<String>,
    server_selection_timeout: Duration,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: Some(database.to_string()),
            server_selection_timeout: Duration::from_millis(DEFAULT_SERVER_SELECTION_TIMEOUT_MS),
        }
    }

    /// Sets how long operations wait for a usable server before failing.
    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        options.server_selection_timeout = Some(self.server_selection_timeout);

        let database = self
            .database
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

        log::debug!("connecting to MongoDB, default database {}", database);

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn unreachable_store() -> MongoDbStore {
        MongoDbStore::builder("mongodb://127.0.0.1:9/?connectTimeoutMS=100", "movies_test")
            .server_selection_timeout(Duration::from_millis(200))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn transport_failures_are_not_reported_as_write_failures() {
        let store = unreachable_store().await;
        let namespace = Namespace::new(None, "movies");
        let requests = vec![
            WriteRequest::InsertOne { document: doc! { "title": "Casablanca" } },
            WriteRequest::DeleteOne { filter: doc! { "title": "Vertigo" } },
        ];

        let err = store
            .bulk_write(&namespace, requests, false)
            .await
            .unwrap_err();

        assert!(err.as_bulk_write().is_none());
        assert!(matches!(err, DocumentStoreError::ConnectivityTimeout(_)));
    }
}
