//! Core traits for model types.
//!
//! A model type owns an [`AttributeContainer`] and exposes the [`Schema`] it was
//! declared with. [`HasAttributes`] is enough for abstract bases that only contribute
//! fields; concrete models also implement [`Model`] to name their collection.
//!
//! Models are normally declared with the `#[model]` attribute macro, which generates
//! both impls, a lazily built schema and typed field accessors. Implementing the traits
//! by hand looks like this:
//!
//! ```ignore
//! use std::sync::OnceLock;
//! use docmodel::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! pub struct Movie {
//!     attributes: AttributeContainer,
//! }
//!
//! impl HasAttributes for Movie {
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder("Movie")
//!                 .object_id()
//!                 .attribute("movie_id", Attribute::text().hash_key())
//!                 .attribute("title", Attribute::text())
//!                 .build()
//!                 .expect("valid schema")
//!         })
//!     }
//!
//!     fn attributes(&self) -> &AttributeContainer { &self.attributes }
//!     fn attributes_mut(&mut self) -> &mut AttributeContainer { &mut self.attributes }
//!     fn from_attributes(attributes: AttributeContainer) -> Self { Self { attributes } }
//! }
//!
//! impl Model for Movie {
//!     fn collection_name() -> &'static str { "movies" }
//! }
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{any::TypeId, fmt};

use crate::{
    backend::Namespace,
    container::AttributeContainer,
    error::{DocumentStoreError, DocumentStoreResult},
    schema::Schema,
};

/// A type whose instances hold attribute values described by a static schema.
pub trait HasAttributes: Send + Sync + Clone + 'static {
    /// Returns the type's attribute registry, built once on first use.
    fn schema() -> &'static Schema;

    fn attributes(&self) -> &AttributeContainer;

    fn attributes_mut(&mut self) -> &mut AttributeContainer;

    /// Wraps a container built for [`HasAttributes::schema`].
    fn from_attributes(attributes: AttributeContainer) -> Self;
}

/// A model type stored in its own collection.
pub trait Model: HasAttributes {
    /// Returns the name of the collection instances are stored in.
    fn collection_name() -> &'static str;

    /// Returns the database to use instead of the store's default one.
    fn database_name() -> Option<&'static str> {
        None
    }

    /// Returns the full namespace of the model's collection.
    fn namespace() -> Namespace {
        Namespace::new(Self::database_name(), Self::collection_name())
    }
}

/// Identifies a model type in errors.
///
/// Two kinds are equal only when they were created for the same Rust type, which lets
/// not-found handling be scoped to a single model type.
#[derive(Debug, Clone, Copy)]
pub struct ModelKind {
    type_id: TypeId,
    name: &'static str,
}

impl ModelKind {
    pub fn of<M: HasAttributes>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: M::schema().model(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ModelKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModelKind {}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Construction and conversion helpers available on every [`HasAttributes`] type.
pub trait ModelExt: HasAttributes {
    /// Constructs an instance from field values, applying defaults first.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownAttribute`] if a field is not registered.
    fn new(fields: Document) -> DocumentStoreResult<Self>;

    /// Constructs an instance with the hash key set to `key`, plus other fields.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidSchema`] if the type has no hash key.
    fn with_hash_key(key: impl Into<Bson>, fields: Document) -> DocumentStoreResult<Self>;

    /// Builds an instance from a document read from the store, ignoring unknown keys.
    fn from_raw(document: Document) -> DocumentStoreResult<Self>;

    /// Builds an instance from any serializable value.
    fn from_typed<T: Serialize>(value: &T) -> DocumentStoreResult<Self>;

    /// Converts the stored values into any deserializable type.
    fn to_typed<T: DeserializeOwned>(&self) -> DocumentStoreResult<T>;

    /// Converts the stored values to JSON.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Returns the store-assigned identifier, absent before the first save.
    fn object_id(&self) -> Option<&Bson>;

    /// Resolves the filter targeting this instance for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AttributesEmpty`] when the instance has neither an
    /// object id nor raw constructor fields.
    fn identity_filter(&self, operation: &'static str) -> DocumentStoreResult<Document>;

    /// Copies every attribute except the object id and hash key from `other`.
    fn copy_from(&mut self, other: &Self);
}

impl<M: HasAttributes> ModelExt for M {
    fn new(fields: Document) -> DocumentStoreResult<Self> {
        Ok(Self::from_attributes(AttributeContainer::new(
            Self::schema(),
            fields,
        )?))
    }

    fn with_hash_key(key: impl Into<Bson>, mut fields: Document) -> DocumentStoreResult<Self> {
        let hash_key = Self::schema().hash_key().ok_or_else(|| {
            DocumentStoreError::InvalidSchema(format!(
                "{} has no hash key",
                Self::schema().model()
            ))
        })?;

        fields.insert(hash_key, key.into());
        Self::new(fields)
    }

    fn from_raw(document: Document) -> DocumentStoreResult<Self> {
        Ok(Self::from_attributes(AttributeContainer::from_stored(
            Self::schema(),
            document,
        )?))
    }

    fn from_typed<T: Serialize>(value: &T) -> DocumentStoreResult<Self> {
        match serialize_to_bson(value)? {
            Bson::Document(fields) => Self::new(fields),
            other => Err(DocumentStoreError::Serialization(format!(
                "expected a document, got {other}"
            ))),
        }
    }

    fn to_typed<T: DeserializeOwned>(&self) -> DocumentStoreResult<T> {
        Ok(deserialize_from_bson(Bson::Document(
            self.attributes().values().clone(),
        ))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(serde_json::to_value(self.attributes().values())?)
    }

    fn object_id(&self) -> Option<&Bson> {
        self.attributes().object_id()
    }

    fn identity_filter(&self, operation: &'static str) -> DocumentStoreResult<Document> {
        self.attributes()
            .identity_filter()
            .ok_or(DocumentStoreError::AttributesEmpty {
                model: Self::schema().model(),
                operation,
            })
    }

    fn copy_from(&mut self, other: &Self) {
        self.attributes_mut().copy_from(other.attributes());
    }
}
