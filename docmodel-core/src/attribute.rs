//! Attribute descriptors: how one model field is stored.
//!
//! An [`Attribute`] describes a single field of a model: the kind of value it holds,
//! how that value serializes to and from the store's native BSON representation,
//! and the field metadata (stored name, default, hash-key flag, nullability).
//!
//! Serialization works on `Option<Bson>` where `None` means "unset": an unset field
//! is simply absent from the stored document. For every kind,
//! `deserialize(serialize(v)) == serialize(v)`, so values written through an attribute
//! read back unchanged.
//!
//! The marker types at the bottom of this module ([`Number`], [`Boolean`], [`Text`],
//! [`UtcDateTime`], [`Json`], [`List`], [`ObjectIdRef`]) implement [`AttributeType`]
//! and give models typed accessors over the same stored values.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::attribute::Attribute;
//!
//! let key = Attribute::text().hash_key();
//! let title = Attribute::text().default_value("CN");
//! let tags = Attribute::list(); // defaults to a fresh empty array per instance
//! ```

use bson::{Bson, DateTime, Document, oid::ObjectId};
use chrono::Utc;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The kinds of values an attribute can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Integer or floating point number, stored as-is.
    Number,
    /// Boolean, normalized from any truthy or falsy input.
    Boolean,
    /// Text; empty strings are stored as unset.
    Text,
    /// UTC timestamp, stored as a native BSON date-time.
    UtcDateTime,
    /// Embedded document.
    Json,
    /// Ordered list of values.
    List,
    /// Opaque store-assigned identifier.
    ObjectId,
}

/// The default value of an attribute, evaluated once per constructed instance.
#[derive(Debug, Clone)]
pub enum AttributeDefault {
    /// No default; the field starts unset.
    None,
    /// A literal value, cloned into every instance.
    Literal(Bson),
    /// A producer called for every instance, so mutable values are never shared.
    Factory(fn() -> Bson),
}

impl AttributeDefault {
    /// Evaluates the default. `Null` results count as no default.
    pub fn evaluate(&self) -> Option<Bson> {
        let value = match self {
            AttributeDefault::None => return None,
            AttributeDefault::Literal(value) => value.clone(),
            AttributeDefault::Factory(factory) => factory(),
        };

        match value {
            Bson::Null => None,
            value => Some(value),
        }
    }
}

fn empty_document() -> Bson {
    Bson::Document(Document::new())
}

fn empty_array() -> Bson {
    Bson::Array(Vec::new())
}

/// Descriptor for a single model field.
///
/// Attributes are declared through the builder-style constructors and registered on a
/// [`Schema`](crate::schema::Schema), which assigns the declaring field's name to every
/// attribute that was not explicitly [`named`](Attribute::named).
#[derive(Debug, Clone)]
pub struct Attribute {
    name: Option<String>,
    kind: AttributeKind,
    hash_key: bool,
    nullable: bool,
    default: AttributeDefault,
}

impl Attribute {
    /// Creates an attribute of the given kind with that kind's default value.
    ///
    /// [`AttributeKind::Json`] defaults to a fresh empty document and
    /// [`AttributeKind::List`] to a fresh empty array; every other kind starts unset.
    pub fn new(kind: AttributeKind) -> Self {
        let default = match kind {
            AttributeKind::Json => AttributeDefault::Factory(empty_document),
            AttributeKind::List => AttributeDefault::Factory(empty_array),
            _ => AttributeDefault::None,
        };

        Self {
            name: None,
            kind,
            hash_key: false,
            nullable: false,
            default,
        }
    }

    pub fn number() -> Self {
        Self::new(AttributeKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(AttributeKind::Boolean)
    }

    pub fn text() -> Self {
        Self::new(AttributeKind::Text)
    }

    pub fn utc_datetime() -> Self {
        Self::new(AttributeKind::UtcDateTime)
    }

    pub fn json() -> Self {
        Self::new(AttributeKind::Json)
    }

    pub fn list() -> Self {
        Self::new(AttributeKind::List)
    }

    pub fn object_id() -> Self {
        Self::new(AttributeKind::ObjectId)
    }

    /// Marks this attribute as the model's hash key. Hash keys are never nullable.
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self.nullable = false;
        self
    }

    /// Sets whether the attribute may be null. Ignored for hash keys.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable && !self.hash_key;
        self
    }

    /// Sets a literal default value.
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = AttributeDefault::Literal(value.into());
        self
    }

    /// Sets a default produced freshly for every instance.
    pub fn default_with(mut self, factory: fn() -> Bson) -> Self {
        self.default = AttributeDefault::Factory(factory);
        self
    }

    /// Overrides the stored field name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the stored field name, or an empty string before registration.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn is_hash_key(&self) -> bool {
        self.hash_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> &AttributeDefault {
        &self.default
    }

    /// Assigns the declaring field's name unless a name was set explicitly.
    pub(crate) fn bind(&mut self, field: &str) {
        if self.name.is_none() {
            self.name = Some(field.to_string());
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> DocumentStoreError {
        DocumentStoreError::InvalidAttributeValue {
            attribute: self.name().to_string(),
            reason: reason.into(),
        }
    }

    /// Converts a value into its stored representation.
    ///
    /// Returns `Ok(None)` when the value should be stored as unset.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidAttributeValue`] if the value cannot be
    /// represented by this attribute's kind.
    pub fn serialize(&self, value: Option<Bson>) -> DocumentStoreResult<Option<Bson>> {
        let value = match value {
            None | Some(Bson::Null) => return Ok(None),
            Some(value) => value,
        };

        match self.kind {
            AttributeKind::Number => match value {
                Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
                    Ok(Some(value))
                }
                other => Err(self.invalid(format!("expected a number, got {other}"))),
            },
            AttributeKind::Boolean => Ok(Some(Bson::Boolean(truthy(&value)))),
            AttributeKind::Text => match value {
                Bson::String(s) if s.is_empty() => Ok(None),
                Bson::String(s) => Ok(Some(Bson::String(s))),
                Bson::Int32(n) => Ok(Some(Bson::String(n.to_string()))),
                Bson::Int64(n) => Ok(Some(Bson::String(n.to_string()))),
                Bson::Double(n) => Ok(Some(Bson::String(n.to_string()))),
                Bson::Boolean(b) => Ok(Some(Bson::String(b.to_string()))),
                Bson::ObjectId(oid) => Ok(Some(Bson::String(oid.to_hex()))),
                other => Err(self.invalid(format!("cannot store {other} as text"))),
            },
            AttributeKind::UtcDateTime => match value {
                Bson::DateTime(dt) => Ok(Some(Bson::DateTime(dt))),
                Bson::Int64(millis) => Ok(Some(Bson::DateTime(DateTime::from_millis(millis)))),
                Bson::String(s) => DateTime::parse_rfc3339_str(&s)
                    .map(|dt| Some(Bson::DateTime(dt)))
                    .map_err(|err| self.invalid(err.to_string())),
                other => Err(self.invalid(format!("expected a date-time, got {other}"))),
            },
            AttributeKind::Json => match value {
                Bson::Document(doc) => Ok(Some(Bson::Document(doc))),
                other => Err(self.invalid(format!("expected a document, got {other}"))),
            },
            AttributeKind::List => match value {
                Bson::Array(items) => Ok(Some(Bson::Array(items))),
                other => Err(self.invalid(format!("expected an array, got {other}"))),
            },
            AttributeKind::ObjectId => Ok(Some(value)),
        }
    }

    /// Converts a stored value back into the attribute's value.
    ///
    /// Stored data is trusted: apart from boolean normalization, values pass through
    /// unchanged.
    pub fn deserialize(&self, value: Option<Bson>) -> DocumentStoreResult<Option<Bson>> {
        match value {
            None | Some(Bson::Null) => Ok(None),
            Some(value) => match self.kind {
                AttributeKind::Boolean => Ok(Some(Bson::Boolean(truthy(&value)))),
                _ => Ok(Some(value)),
            },
        }
    }
}

/// Truthiness of a stored value: zero, empty and null values are false.
fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::String(s) => !s.is_empty(),
        Bson::Array(items) => !items.is_empty(),
        Bson::Document(doc) => !doc.is_empty(),
        _ => true,
    }
}

/// A statically typed view of an attribute kind.
///
/// Implemented by the marker types in this module; models use them for typed field
/// accessors, e.g. `AttributeContainer::get_typed::<Text>("title")`.
pub trait AttributeType {
    /// The attribute kind this type maps to.
    const KIND: AttributeKind;

    /// The Rust value exposed by typed accessors.
    type Value;

    /// Converts a typed value into its stored representation (`None` means unset).
    fn into_stored(value: Self::Value) -> Option<Bson>;

    /// Reads a typed value from its stored representation.
    fn from_stored(value: &Bson) -> Option<Self::Value>;
}

/// A number that is either integral or floating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Float(f64),
}

impl NumberValue {
    /// Returns the value as an integer.
    ///
    /// Floats are truncated toward zero and saturate at the `i64` bounds; `NaN` becomes
    /// `0`. Use [`NumberValue::to_exact_i64`] to reject lossy conversions.
    pub fn as_i64(&self) -> i64 {
        match *self {
            NumberValue::Int(n) => n,
            NumberValue::Float(n) => n as i64,
        }
    }

    /// Returns the value as an integer only if no information is lost.
    pub fn to_exact_i64(&self) -> Option<i64> {
        match *self {
            NumberValue::Int(n) => Some(n),
            NumberValue::Float(n) if n.fract() == 0.0 && n >= -(2f64.powi(63)) && n < 2f64.powi(63) => {
                Some(n as i64)
            }
            NumberValue::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            NumberValue::Int(n) => n as f64,
            NumberValue::Float(n) => n,
        }
    }
}

impl From<i32> for NumberValue {
    fn from(value: i32) -> Self {
        NumberValue::Int(value.into())
    }
}

impl From<i64> for NumberValue {
    fn from(value: i64) -> Self {
        NumberValue::Int(value)
    }
}

impl From<u32> for NumberValue {
    fn from(value: u32) -> Self {
        NumberValue::Int(value.into())
    }
}

impl From<f32> for NumberValue {
    fn from(value: f32) -> Self {
        NumberValue::Float(value.into())
    }
}

impl From<f64> for NumberValue {
    fn from(value: f64) -> Self {
        NumberValue::Float(value)
    }
}

impl From<NumberValue> for Bson {
    fn from(value: NumberValue) -> Self {
        match value {
            NumberValue::Int(n) => Bson::Int64(n),
            NumberValue::Float(n) => Bson::Double(n),
        }
    }
}

pub struct Number;

impl AttributeType for Number {
    const KIND: AttributeKind = AttributeKind::Number;
    type Value = NumberValue;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(value.into())
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        match value {
            Bson::Int32(n) => Some(NumberValue::Int((*n).into())),
            Bson::Int64(n) => Some(NumberValue::Int(*n)),
            Bson::Double(n) => Some(NumberValue::Float(*n)),
            _ => None,
        }
    }
}

pub struct Boolean;

impl AttributeType for Boolean {
    const KIND: AttributeKind = AttributeKind::Boolean;
    type Value = bool;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(Bson::Boolean(value))
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        Some(truthy(value))
    }
}

pub struct Text;

impl AttributeType for Text {
    const KIND: AttributeKind = AttributeKind::Text;
    type Value = String;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        if value.is_empty() {
            None
        } else {
            Some(Bson::String(value))
        }
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        value.as_str().map(str::to_string)
    }
}

pub struct UtcDateTime;

impl AttributeType for UtcDateTime {
    const KIND: AttributeKind = AttributeKind::UtcDateTime;
    type Value = chrono::DateTime<Utc>;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(Bson::DateTime(DateTime::from_chrono(value)))
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        value.as_datetime().map(|dt| dt.to_chrono())
    }
}

pub struct Json;

impl AttributeType for Json {
    const KIND: AttributeKind = AttributeKind::Json;
    type Value = Document;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(Bson::Document(value))
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        value.as_document().cloned()
    }
}

pub struct List;

impl AttributeType for List {
    const KIND: AttributeKind = AttributeKind::List;
    type Value = Vec<Bson>;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(Bson::Array(value))
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        value.as_array().cloned()
    }
}

pub struct ObjectIdRef;

impl AttributeType for ObjectIdRef {
    const KIND: AttributeKind = AttributeKind::ObjectId;
    type Value = ObjectId;

    fn into_stored(value: Self::Value) -> Option<Bson> {
        Some(Bson::ObjectId(value))
    }

    fn from_stored(value: &Bson) -> Option<Self::Value> {
        value.as_object_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn lossy_integer_conversions_are_detectable() {
        assert_eq!(NumberValue::Float(2.9).as_i64(), 2);
        assert_eq!(NumberValue::Float(1e300).as_i64(), i64::MAX);
        assert_eq!(NumberValue::Float(f64::NAN).as_i64(), 0);

        assert_eq!(NumberValue::Int(7).to_exact_i64(), Some(7));
        assert_eq!(NumberValue::Float(-42.0).to_exact_i64(), Some(-42));
        assert_eq!(NumberValue::Float(2.9).to_exact_i64(), None);
        assert_eq!(NumberValue::Float(1e300).to_exact_i64(), None);
        assert_eq!(NumberValue::Float(f64::NAN).to_exact_i64(), None);
    }

    fn named(attribute: Attribute) -> Attribute {
        let mut attribute = attribute;
        attribute.bind("field");
        attribute
    }

    fn round_trip(attribute: &Attribute, value: Option<Bson>) -> Option<Bson> {
        let stored = attribute.serialize(value).unwrap();
        let restored = attribute.deserialize(stored.clone()).unwrap();
        assert_eq!(restored, stored);
        restored
    }

    #[test]
    fn every_kind_round_trips_its_legal_values() {
        let cases: Vec<(Attribute, Vec<Option<Bson>>)> = vec![
            (Attribute::number(), vec![None, Some(Bson::Int32(7)), Some(Bson::Int64(-3)), Some(Bson::Double(1.5))]),
            (Attribute::boolean(), vec![None, Some(Bson::Boolean(true)), Some(Bson::Boolean(false))]),
            (Attribute::text(), vec![None, Some(Bson::String("Casablanca".into()))]),
            (Attribute::utc_datetime(), vec![None, Some(Bson::DateTime(DateTime::from_millis(1_700_000_000_000)))]),
            (Attribute::json(), vec![None, Some(Bson::Document(doc! { "a": 1 }))]),
            (Attribute::list(), vec![None, Some(Bson::Array(vec!["x".into(), 2.into()]))]),
            (Attribute::object_id(), vec![None, Some(Bson::ObjectId(ObjectId::new()))]),
        ];

        for (attribute, values) in cases {
            let attribute = named(attribute);
            for value in values {
                assert_eq!(round_trip(&attribute, value.clone()), value, "{:?}", attribute.kind());
            }
        }
    }

    #[test]
    fn boolean_normalizes_truthiness_but_keeps_unset() {
        let attribute = named(Attribute::boolean());

        assert_eq!(attribute.serialize(Some(Bson::Int32(5))).unwrap(), Some(Bson::Boolean(true)));
        assert_eq!(attribute.serialize(Some(Bson::String(String::new()))).unwrap(), Some(Bson::Boolean(false)));
        assert_eq!(attribute.serialize(Some(Bson::Int64(0))).unwrap(), Some(Bson::Boolean(false)));
        assert_eq!(attribute.serialize(None).unwrap(), None);
        assert_eq!(attribute.deserialize(Some(Bson::Int32(0))).unwrap(), Some(Bson::Boolean(false)));
    }

    #[test]
    fn text_treats_empty_as_unset_and_coerces_scalars() {
        let attribute = named(Attribute::text());

        assert_eq!(attribute.serialize(Some(Bson::String(String::new()))).unwrap(), None);
        assert_eq!(attribute.serialize(Some(Bson::Null)).unwrap(), None);
        assert_eq!(attribute.serialize(Some(Bson::Int32(1988))).unwrap(), Some(Bson::String("1988".into())));
        assert!(attribute.serialize(Some(Bson::Array(vec![]))).is_err());
    }

    #[test]
    fn timestamps_accept_rfc3339_strings() {
        let attribute = named(Attribute::utc_datetime());
        let stored = attribute
            .serialize(Some(Bson::String("2024-01-02T03:04:05Z".into())))
            .unwrap();

        assert_eq!(stored, Some(Bson::DateTime(DateTime::from_millis(1_704_164_645_000))));
        assert!(attribute.serialize(Some(Bson::String("yesterday".into()))).is_err());
    }

    #[test]
    fn wrong_shapes_are_rejected_with_the_attribute_name() {
        let attribute = named(Attribute::number());

        match attribute.serialize(Some(Bson::String("seven".into()))) {
            Err(DocumentStoreError::InvalidAttributeValue { attribute, .. }) => assert_eq!(attribute, "field"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn container_kinds_default_to_fresh_values() {
        let json = Attribute::json();
        let list = Attribute::list();

        assert_eq!(json.default().evaluate(), Some(Bson::Document(Document::new())));
        assert_eq!(list.default().evaluate(), Some(Bson::Array(Vec::new())));
        assert!(Attribute::text().default().evaluate().is_none());
        assert!(Attribute::text().default_value(Bson::Null).default().evaluate().is_none());
    }

    #[test]
    fn hash_keys_are_never_nullable() {
        let attribute = Attribute::text().hash_key().nullable(true);

        assert!(attribute.is_hash_key());
        assert!(!attribute.is_nullable());
        assert!(Attribute::json().nullable(true).is_nullable());
    }

    #[test]
    fn explicit_names_survive_binding() {
        let mut attribute = Attribute::number().named("yr");
        attribute.bind("year");

        assert_eq!(attribute.name(), "yr");
    }

    #[test]
    fn typed_views_match_stored_values() {
        assert_eq!(Text::into_stored(String::new()), None);
        assert_eq!(Number::from_stored(&Bson::Int32(3)), Some(NumberValue::Int(3)));
        assert_eq!(Number::into_stored(2.5.into()), Some(Bson::Double(2.5)));
        assert_eq!(Boolean::from_stored(&Bson::Int32(1)), Some(true));
        assert_eq!(List::from_stored(&Bson::Array(vec![1.into()])), Some(vec![Bson::Int32(1)]));
    }
}
