//! A typed object-document mapping layer over JSON document stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Attribute descriptors** ([`attribute`]) - Field kinds, defaults and value conversion
//! - **Schemas** ([`schema`]) - Per-type attribute registries, with inheritance
//! - **Attribute containers** ([`container`]) - Instance-level field storage
//! - **Model traits** ([`model`]) - Core traits implemented by model types
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query options** ([`query`]) - Cursor modifiers, index definitions and update options
//! - **Model collections** ([`collection`]) - Async query and mutation surface of a model type
//! - **Blocking surface** ([`blocking`]) - The same operations as blocking calls
//! - **Batch writes** ([`batch`]) - Bounded write queues flushed as bulk writes
//! - **Document store** ([`store`]) - Main entry point owning a backend
//! - **Configuration** ([`config`]) - Connection settings, from serde or the environment
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! #[model(collection = "movies")]
//! pub struct Movie {
//!     #[attribute(hash_key)]
//!     movie_id: Text,
//!     title: Text,
//!     year: Number,
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let mut movie = Movie::with_hash_key("m1", doc! { "title": "Casablanca" })?;
//! store.models::<Movie>().save(&mut movie).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod attribute;
pub mod backend;
pub mod batch;
pub mod blocking;
pub mod collection;
pub mod config;
pub mod container;
pub mod error;
pub mod model;
pub mod query;
pub mod schema;
pub mod store;
pub mod write;
