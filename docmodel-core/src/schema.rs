//! Per-type attribute registries.
//!
//! A [`Schema`] is built once for every model type and is immutable afterwards.
//! It maps stored field names to their [`Attribute`] descriptors in declaration order,
//! inherited fields first, and records which field (if any) is the hash key.
//!
//! Models declared with the `#[model]` macro build their schema lazily behind a
//! `OnceLock`; hand-written models do the same through [`Schema::builder`].
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{attribute::Attribute, schema::Schema};
//!
//! let schema = Schema::builder("Movie")
//!     .attribute("movie_id", Attribute::text().hash_key())
//!     .attribute("title", Attribute::text().default_value("CN"))
//!     .attribute("languages", Attribute::list())
//!     .build()?;
//!
//! assert_eq!(schema.hash_key(), Some("movie_id"));
//! ```

use std::collections::HashMap;

use crate::{
    attribute::Attribute,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Stored name of the store-assigned identifier.
pub const OBJECT_ID_FIELD: &str = "_id";

/// The attribute registry of one model type.
#[derive(Debug, Clone)]
pub struct Schema {
    model: &'static str,
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
    hash_key: Option<String>,
}

impl Schema {
    /// Starts a schema for the model type named `model`.
    pub fn builder(model: &'static str) -> SchemaBuilder {
        SchemaBuilder::new(model)
    }

    /// Returns the model type name this schema belongs to.
    pub fn model(&self) -> &'static str {
        self.model
    }

    /// Looks up an attribute by stored field name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.index
            .get(name)
            .map(|position| &self.attributes[*position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates over all attributes, inherited ones first, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Iterates over all stored field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(Attribute::name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the hash-key field name, if the model declares one.
    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }
}

/// Builder for [`Schema`].
///
/// Attributes are registered in call order. Registering a name that is already present
/// (typically a field inherited through [`extend`](SchemaBuilder::extend)) replaces
/// the earlier descriptor in place.
#[derive(Debug)]
pub struct SchemaBuilder {
    model: &'static str,
    attributes: Vec<Attribute>,
}

impl SchemaBuilder {
    pub fn new(model: &'static str) -> Self {
        Self {
            model,
            attributes: Vec::new(),
        }
    }

    /// Inherits every attribute of a parent schema.
    pub fn extend(mut self, parent: &Schema) -> Self {
        for attribute in parent.attributes() {
            self.push(attribute.clone());
        }
        self
    }

    /// Registers an attribute declared under `field`.
    ///
    /// The attribute's stored name becomes `field` unless it was set with
    /// [`Attribute::named`].
    pub fn attribute(mut self, field: &str, mut attribute: Attribute) -> Self {
        attribute.bind(field);
        self.push(attribute);
        self
    }

    /// Registers the store-assigned `_id` object-id attribute.
    pub fn object_id(self) -> Self {
        self.attribute(OBJECT_ID_FIELD, Attribute::object_id())
    }

    fn push(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter()
            .position(|existing| existing.name() == attribute.name())
        {
            Some(position) => self.attributes[position] = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Finishes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidSchema`] if more than one attribute is
    /// flagged as the hash key.
    pub fn build(self) -> DocumentStoreResult<Schema> {
        let hash_keys = self
            .attributes
            .iter()
            .filter(|attribute| attribute.is_hash_key())
            .map(|attribute| attribute.name().to_string())
            .collect::<Vec<_>>();

        if hash_keys.len() > 1 {
            return Err(DocumentStoreError::InvalidSchema(format!(
                "{} declares more than one hash key: {}",
                self.model,
                hash_keys.join(", "),
            )));
        }

        let index = self
            .attributes
            .iter()
            .enumerate()
            .map(|(position, attribute)| (attribute.name().to_string(), position))
            .collect();

        Ok(Schema {
            model: self.model,
            attributes: self.attributes,
            index,
            hash_key: hash_keys.into_iter().next(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeKind;

    fn base() -> Schema {
        Schema::builder("Base")
            .object_id()
            .attribute("created", Attribute::utc_datetime())
            .attribute("owner", Attribute::text())
            .build()
            .unwrap()
    }

    #[test]
    fn names_default_to_the_declaring_field() {
        let schema = Schema::builder("Movie")
            .attribute("title", Attribute::text())
            .attribute("year", Attribute::number().named("yr"))
            .build()
            .unwrap();

        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["title", "yr"]);
        assert!(schema.contains("yr"));
        assert!(!schema.contains("year"));
    }

    #[test]
    fn derived_schemas_contain_every_ancestor_field() {
        let parent = base();
        let middle = Schema::builder("Middle")
            .extend(&parent)
            .attribute("tags", Attribute::list())
            .build()
            .unwrap();
        let leaf = Schema::builder("Leaf")
            .extend(&middle)
            .attribute("key", Attribute::text().hash_key())
            .build()
            .unwrap();

        assert_eq!(
            leaf.names().collect::<Vec<_>>(),
            vec!["_id", "created", "owner", "tags", "key"]
        );
        assert_eq!(leaf.hash_key(), Some("key"));
        assert_eq!(parent.len(), 3);
    }

    #[test]
    fn redeclared_fields_replace_inherited_ones_without_duplication() {
        let leaf = Schema::builder("Leaf")
            .extend(&base())
            .attribute("owner", Attribute::number())
            .build()
            .unwrap();

        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf.get("owner").map(Attribute::kind), Some(AttributeKind::Number));
    }

    #[test]
    fn hash_key_is_optional() {
        assert_eq!(base().hash_key(), None);
    }

    #[test]
    fn multiple_hash_keys_are_rejected() {
        let result = Schema::builder("Broken")
            .attribute("a", Attribute::text().hash_key())
            .attribute("b", Attribute::text().hash_key())
            .build();

        assert!(matches!(result, Err(DocumentStoreError::InvalidSchema(_))));
    }
}
