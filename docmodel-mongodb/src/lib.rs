//! MongoDB backend implementation for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait on top
//! of the official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Per-model namespaces** - Models may name their own database; the rest use the default one
//! - **Bounded server selection** - Unreachable servers fail fast with `ConnectivityTimeout`
//! - **Bulk writes** - Sent as `insert` / `update` / `delete` write commands, ordered or not
//! - **Explain** - Query plans via the `explain` command
//!
//! # Connection
//!
//! The connection string and default database come from the builder, or from a
//! [`StoreConfig`](docmodel_core::config::StoreConfig), typically read from the environment.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{backend::StoreBackendBuilder, config::StoreConfig, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     let from_env = MongoDbStore::from_config(&StoreConfig::from_env()?)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod bulk;
pub mod error;
pub mod options;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
