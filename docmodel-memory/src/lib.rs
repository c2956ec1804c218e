//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Store filter semantics** - Equality, comparison, membership and logical operators
//! - **Update operators** - `$set`, `$unset` and `$inc`, with upserts
//! - **Cursors and pipelines** - Sort, skip, limit, projection and basic aggregation stages
//! - **Bulk writes** - Ordered and unordered, with per-request failure details
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::prelude::*;
//! use docmodel::memory::InMemoryStore;
//!
//! #[model(collection = "users")]
//! pub struct User {
//!     #[attribute(hash_key)]
//!     user_id: Text,
//!     name: Text,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let mut user = User::with_hash_key("u1", doc! { "name": "Alice" })?;
//!     store.models::<User>().save(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod cursor;
pub mod evaluator;
pub mod store;
pub mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
