//! Instance-level attribute storage.
//!
//! An [`AttributeContainer`] holds the stored values of one model instance, keyed by
//! field name, together with the raw fields the instance was constructed from.
//! Every write goes through the owning attribute's `serialize`, every read through its
//! `deserialize`, and only names registered on the model's [`Schema`] are accepted.

use bson::{Bson, Document, doc};

use crate::{
    attribute::AttributeType,
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{OBJECT_ID_FIELD, Schema},
};

/// The field values of one model instance.
#[derive(Debug, Clone)]
pub struct AttributeContainer {
    schema: &'static Schema,
    values: Document,
    raw: Document,
}

impl AttributeContainer {
    /// Constructs a container from caller-supplied fields.
    ///
    /// Defaults are applied first, then every supplied field is serialized over them,
    /// so explicit values always win. The supplied fields are kept as the instance's
    /// raw attributes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownAttribute`] for the first field that is not
    /// registered on the schema, or [`DocumentStoreError::InvalidAttributeValue`] if a
    /// value does not fit its attribute.
    pub fn new(schema: &'static Schema, fields: Document) -> DocumentStoreResult<Self> {
        let mut container = Self::with_defaults(schema);

        for (name, value) in fields.iter() {
            container.set(name, value.clone())?;
        }
        container.raw = fields;

        Ok(container)
    }

    /// Constructs a container with an empty field set (defaults only).
    pub fn empty(schema: &'static Schema) -> Self {
        Self::with_defaults(schema)
    }

    /// Builds a container from a document read from the store.
    ///
    /// Every registered field present in `document` goes through its attribute's
    /// `deserialize`; keys the schema does not know are ignored.
    pub fn from_stored(schema: &'static Schema, document: Document) -> DocumentStoreResult<Self> {
        let mut container = Self::with_defaults(schema);
        let mut fields = Document::new();

        for attribute in schema.attributes() {
            if let Some(value) = attribute.deserialize(document.get(attribute.name()).cloned())? {
                container.values.insert(attribute.name(), value.clone());
                fields.insert(attribute.name(), value);
            }
        }

        container.raw = fields;

        Ok(container)
    }

    fn with_defaults(schema: &'static Schema) -> Self {
        let values = schema
            .attributes()
            .filter_map(|attribute| {
                attribute
                    .default()
                    .evaluate()
                    .map(|value| (attribute.name().to_string(), value))
            })
            .collect();

        Self {
            schema,
            values,
            raw: Document::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn unknown(&self, name: &str) -> DocumentStoreError {
        DocumentStoreError::UnknownAttribute {
            model: self.schema.model(),
            attribute: name.to_string(),
        }
    }

    /// Reads a field through its attribute's `deserialize`.
    pub fn get(&self, name: &str) -> DocumentStoreResult<Option<Bson>> {
        let attribute = self.schema.get(name).ok_or_else(|| self.unknown(name))?;

        attribute.deserialize(self.values.get(name).cloned())
    }

    /// Reads a field as a typed value. Unset and unknown fields read as `None`.
    pub fn get_typed<T: AttributeType>(&self, name: &str) -> Option<T::Value> {
        self.values.get(name).and_then(T::from_stored)
    }

    /// Writes a field through its attribute's `serialize`.
    ///
    /// Values that serialize to "unset" (such as an empty string on a text attribute)
    /// remove the field.
    pub fn set(&mut self, name: &str, value: impl Into<Bson>) -> DocumentStoreResult<()> {
        let attribute = self.schema.get(name).ok_or_else(|| self.unknown(name))?;

        match attribute.serialize(Some(value.into()))? {
            Some(stored) => self.values.insert(name, stored),
            None => self.values.remove(name),
        };

        Ok(())
    }

    /// Writes a typed value.
    pub fn set_typed<T: AttributeType>(&mut self, name: &str, value: T::Value) -> DocumentStoreResult<()> {
        if !self.schema.contains(name) {
            return Err(self.unknown(name));
        }
        self.set_registered::<T>(name, value);

        Ok(())
    }

    /// Writes a typed value to a field known to be registered.
    ///
    /// Used by generated accessors, whose field names come from the schema itself.
    #[doc(hidden)]
    pub fn set_registered<T: AttributeType>(&mut self, name: &str, value: T::Value) {
        debug_assert!(self.schema.contains(name), "{name} is not registered");

        match T::into_stored(value) {
            Some(stored) => self.values.insert(name, stored),
            None => self.values.remove(name),
        };
    }

    /// Clears a field.
    pub fn unset(&mut self, name: &str) -> DocumentStoreResult<()> {
        if !self.schema.contains(name) {
            return Err(self.unknown(name));
        }
        self.values.remove(name);

        Ok(())
    }

    /// Returns the stored values, as written to the store on insert.
    pub fn values(&self) -> &Document {
        &self.values
    }

    pub fn into_values(self) -> Document {
        self.values
    }

    /// Returns the fields the instance was constructed from.
    pub fn raw_fields(&self) -> &Document {
        &self.raw
    }

    /// Returns the store-assigned identifier, absent before the first save.
    pub fn object_id(&self) -> Option<&Bson> {
        self.values.get(OBJECT_ID_FIELD)
    }

    pub(crate) fn set_object_id(&mut self, id: Bson) {
        self.values.insert(OBJECT_ID_FIELD, id);
    }

    /// Resolves the filter that targets this instance in the store.
    ///
    /// Prefers `{_id: object_id}`; falls back to the raw constructor fields; returns
    /// `None` when neither is available.
    pub fn identity_filter(&self) -> Option<Document> {
        match self.object_id() {
            Some(id) => Some(doc! { OBJECT_ID_FIELD: id.clone() }),
            None if !self.raw.is_empty() => Some(self.raw.clone()),
            None => None,
        }
    }

    /// Overwrites every registered field with the values of a freshly fetched instance.
    ///
    /// Fields absent from `fresh` become unset.
    pub fn reload_from(&mut self, fresh: &AttributeContainer) {
        for name in self.schema.names() {
            match fresh.values.get(name) {
                Some(value) => self.values.insert(name, value.clone()),
                None => self.values.remove(name),
            };
        }
    }

    /// Copies every attribute except the object id and the hash key from `other`.
    ///
    /// Fields of `other` that this schema does not register are skipped.
    pub fn copy_from(&mut self, other: &AttributeContainer) {
        for attribute in other.schema.attributes() {
            let name = attribute.name();

            if name == OBJECT_ID_FIELD || attribute.is_hash_key() || !self.schema.contains(name) {
                continue;
            }

            match other.values.get(name) {
                Some(value) => self.values.insert(name, value.clone()),
                None => self.values.remove(name),
            };
        }
    }
}

impl PartialEq for AttributeContainer {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, List, Number, NumberValue, Text};
    use bson::oid::ObjectId;
    use std::sync::OnceLock;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();

        SCHEMA.get_or_init(|| {
            Schema::builder("Movie")
                .object_id()
                .attribute("title", Attribute::text().default_value("CN"))
                .attribute("movie_id", Attribute::text().hash_key())
                .attribute("languages", Attribute::list())
                .attribute("meta", Attribute::json().nullable(true))
                .attribute("year", Attribute::number())
                .build()
                .unwrap()
        })
    }

    #[test]
    fn defaults_are_applied_before_explicit_values() {
        let movie = AttributeContainer::new(schema(), doc! { "title": "Casablanca" }).unwrap();
        let fallback = AttributeContainer::empty(schema());

        assert_eq!(movie.get_typed::<Text>("title").as_deref(), Some("Casablanca"));
        assert_eq!(fallback.get_typed::<Text>("title").as_deref(), Some("CN"));
        assert_eq!(fallback.get_typed::<List>("languages"), Some(vec![]));
        assert_eq!(fallback.get("year").unwrap(), None);
    }

    #[test]
    fn container_defaults_are_not_shared_between_instances() {
        let mut first = AttributeContainer::empty(schema());
        let second = AttributeContainer::empty(schema());

        first.set_typed::<List>("languages", vec!["English".into()]).unwrap();

        assert_eq!(first.get_typed::<List>("languages").map(|l| l.len()), Some(1));
        assert_eq!(second.get_typed::<List>("languages"), Some(vec![]));
    }

    #[test]
    fn unknown_fields_fail_construction() {
        let result = AttributeContainer::new(schema(), doc! { "title": "x", "rating": 5 });

        match result {
            Err(DocumentStoreError::UnknownAttribute { model, attribute }) => {
                assert_eq!(model, "Movie");
                assert_eq!(attribute, "rating");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn writes_go_through_serialization() {
        let mut movie = AttributeContainer::empty(schema());

        movie.set("title", "").unwrap();
        movie.set("year", 1943).unwrap();

        assert_eq!(movie.get("title").unwrap(), None);
        assert_eq!(movie.get_typed::<Number>("year"), Some(NumberValue::Int(1943)));
        assert!(movie.set("year", "nineteen").is_err());
        assert!(movie.set("rating", 3).is_err());
    }

    #[test]
    fn identity_prefers_the_object_id() {
        let mut movie = AttributeContainer::new(schema(), doc! { "movie_id": "m1" }).unwrap();
        assert_eq!(movie.identity_filter(), Some(doc! { "movie_id": "m1" }));

        let id = ObjectId::new();
        movie.set_object_id(Bson::ObjectId(id));
        assert_eq!(movie.identity_filter(), Some(doc! { "_id": id }));

        assert_eq!(AttributeContainer::empty(schema()).identity_filter(), None);
    }

    #[test]
    fn stored_documents_ignore_unknown_keys() {
        let id = ObjectId::new();
        let movie = AttributeContainer::from_stored(
            schema(),
            doc! { "_id": id, "movie_id": "m1", "legacy": true, "year": 1999 },
        )
        .unwrap();

        assert_eq!(movie.object_id(), Some(&Bson::ObjectId(id)));
        assert!(!movie.values().contains_key("legacy"));
        assert_eq!(movie.get_typed::<Text>("title").as_deref(), Some("CN"));
        assert_eq!(movie.raw_fields().get_str("movie_id").unwrap(), "m1");
    }

    #[test]
    fn reload_overwrites_every_registered_field() {
        let mut stale = AttributeContainer::new(schema(), doc! { "movie_id": "m1", "year": 1942 }).unwrap();
        let fresh = AttributeContainer::from_stored(schema(), doc! { "movie_id": "m1", "title": "X" }).unwrap();

        stale.reload_from(&fresh);

        assert_eq!(stale.get_typed::<Text>("title").as_deref(), Some("X"));
        assert_eq!(stale.get("year").unwrap(), None);
        assert_eq!(stale, fresh);
    }

    #[test]
    fn copy_from_skips_identity_fields() {
        let mut target = AttributeContainer::new(schema(), doc! { "movie_id": "keep" }).unwrap();
        let mut source = AttributeContainer::new(schema(), doc! { "movie_id": "other", "year": 2001 }).unwrap();
        source.set_object_id(Bson::ObjectId(ObjectId::new()));

        target.copy_from(&source);

        assert_eq!(target.get_typed::<Text>("movie_id").as_deref(), Some("keep"));
        assert_eq!(target.get_typed::<Number>("year"), Some(NumberValue::Int(2001)));
        assert_eq!(target.object_id(), None);
    }
}
