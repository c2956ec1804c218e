//! Main document store interface.
//!
//! [`DocumentStore`] owns a [`StoreBackend`] and hands out per-model views of it:
//!
//! - [`DocumentStore::models`] - the async [`ModelCollection`] of a model type
//! - [`ModelCollection::blocking`] - the same operations as blocking calls
//!
//! # Example
//!
//! ```ignore
//! use docmodel::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let movie = store.models::<Movie>().get(doc! { "movie_id": "m1" }, None).await?;
//! ```

use crate::{backend::StoreBackend, collection::ModelCollection, error::DocumentStoreResult, model::Model};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type. `&B` and `Arc<B>` are backends too, so a
///   store can borrow or share a backend owned elsewhere.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the query and mutation surface of model type `M`.
    ///
    /// The namespace is taken from [`Model::namespace`].
    pub fn models<'a, M: Model>(&'a self) -> ModelCollection<'a, B, M> {
        ModelCollection::new(M::namespace(), &self.backend)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
