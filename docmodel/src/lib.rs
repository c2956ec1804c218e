//! Main docmodel crate providing a typed object-document mapping layer.
//!
//! This crate is the primary entry point for users of the docmodel framework.
//! It re-exports the core types, the `#[model]` macro and the storage backends.
//!
//! # Features
//!
//! - **Declarative models** - Field kinds, defaults, hash keys and inheritance via `#[model]`
//! - **Async and blocking surfaces** - Every collection operation in both flavors
//! - **Batched writes** - Bounded write queues flushed as a single bulk write
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[model(collection = "movies")]
//! pub struct Movie {
//!     #[attribute(hash_key)]
//!     movie_id: Text,
//!     #[attribute(default = "CN")]
//!     title: Text,
//!     year: Number,
//!     languages: List,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let movies = store.models::<Movie>();
//!
//!     // Construct and insert
//!     let mut movie = Movie::with_hash_key("m1", doc! { "title": "Casablanca", "year": 1942 })?;
//!     movies.save(&mut movie).await?;
//!
//!     // Targeted update, reloading the instance afterwards
//!     movies
//!         .update(&mut movie, doc! { "year": 1943 }, UpdateOptions::default())
//!         .await?;
//!
//!     // Query
//!     let recent = movies
//!         .find(
//!             doc! { "year": { "$gte": 1940 } },
//!             FindOptions::builder().sort("year", SortDirection::Desc).limit(10).build(),
//!         )
//!         .await?;
//!
//!     println!("found {} movie(s)", recent.len());
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Batch Writes
//!
//! A [`BatchWriter`](batch::BatchWriter) queues instance writes and sends them as one bulk
//! write on commit, or automatically once its page limit is reached:
//!
//! ```ignore
//! let mut batch = movies.batch_write().page_limit(500);
//!
//! for movie in &imported {
//!     batch.save(movie).await?;
//! }
//! batch.commit().await?;
//! ```
//!
//! # Blocking Usage
//!
//! Outside an async runtime, [`ModelCollection::blocking`](collection::ModelCollection::blocking)
//! runs the same operations on a shared runtime:
//!
//! ```ignore
//! let movies = store.models::<Movie>().blocking();
//! let movie = movies.get(doc! { "movie_id": "m1" }, None)?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodel;

pub mod prelude;

pub use docmodel_core::{
    attribute, backend, batch, blocking, collection, config, container, error, model, query,
    schema, store, write,
};
pub use docmodel_macros::model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
