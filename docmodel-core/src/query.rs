//! Cursor and write options passed through to the store.
//!
//! Filters, updates and pipelines are plain BSON documents handed to the store
//! verbatim; this module only carries the modifiers around them:
//!
//! - [`FindOptions`] - sort, skip, limit, projection, index hint and explain
//! - [`IndexSpec`] - index keys plus name, uniqueness, TTL and partial filter
//! - [`UpdateOptions`] - reload and upsert flags of instance updates
//!
//! # Example
//!
//! ```ignore
//! use docmodel::query::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("year", SortDirection::Desc)
//!     .skip(20)
//!     .limit(10)
//!     .projection(["title", "year"])
//!     .build();
//! ```

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Sort direction for query results and index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Returns the store's numeric form (`1` or `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// An index the query planner should use.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexHint {
    /// Hint by index name.
    Name(String),
    /// Hint by index key pattern.
    Keys(Document),
}

/// Cursor modifiers for `find`.
///
/// The store applies them in the order sort, skip, limit, hint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification, e.g. `{year: -1, title: 1}`.
    pub sort: Option<Document>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return. Zero means no limit.
    pub limit: Option<i64>,
    /// Fields to return, as `{field: 1}`.
    pub projection: Option<Document>,
    /// Index hint for the query planner.
    pub hint: Option<IndexHint>,
    /// Whether to fetch and log the query plan.
    pub explain: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }
}

/// Builds a projection document from a list of field names.
pub fn projection<I, S>(fields: I) -> Option<Document>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let projection = fields
        .into_iter()
        .map(|field| (field.into(), Bson::Int32(1)))
        .collect::<Document>();

    (!projection.is_empty()).then_some(projection)
}

/// Reads a non-negative count from a keyword-style filter value.
pub(crate) fn count_value(key: &str, value: &Bson) -> DocumentStoreResult<i64> {
    let count = match value {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        Bson::Double(n) if n.fract() == 0.0 => *n as i64,
        other => {
            return Err(DocumentStoreError::InvalidAttributeValue {
                attribute: key.to_string(),
                reason: format!("expected an integer, got {other}"),
            });
        }
    };

    if count < 0 {
        return Err(DocumentStoreError::InvalidAttributeValue {
            attribute: key.to_string(),
            reason: format!("expected a non-negative integer, got {count}"),
        });
    }

    Ok(count)
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sort key. Keys are applied in the order they are added.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options
            .sort
            .get_or_insert_with(Document::new)
            .insert(field.into(), direction.as_i32());
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Restricts returned documents to the given fields.
    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.projection = projection(fields);
        self
    }

    pub fn hint(mut self, hint: IndexHint) -> Self {
        self.options.hint = Some(hint);
        self
    }

    /// Requests the query plan to be logged after the query runs.
    pub fn explain(mut self, explain: bool) -> Self {
        self.options.explain = explain;
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Definition of an index to create.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Key pattern, e.g. `{user_id: -1, time: 1}`.
    pub keys: Document,
    /// Custom index name. The store generates one when absent.
    pub name: Option<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Time to live of documents, for TTL indexes.
    pub expire_after_seconds: Option<u64>,
    /// Filter restricting the documents the index covers.
    pub partial_filter: Option<Document>,
}

impl IndexSpec {
    /// A single-key ascending index.
    pub fn field(field: impl Into<String>) -> Self {
        Self::compound([(field, SortDirection::Asc)])
    }

    /// A compound index over `(field, direction)` pairs.
    pub fn compound<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, SortDirection)>,
        S: Into<String>,
    {
        Self::keys(
            keys.into_iter()
                .map(|(field, direction)| (field.into(), Bson::Int32(direction.as_i32())))
                .collect(),
        )
    }

    /// An index over an explicit key pattern.
    pub fn keys(keys: Document) -> Self {
        Self {
            keys,
            name: None,
            unique: false,
            expire_after_seconds: None,
            partial_filter: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn expire_after_seconds(mut self, seconds: u64) -> Self {
        self.expire_after_seconds = Some(seconds);
        self
    }

    pub fn partial_filter(mut self, filter: Document) -> Self {
        self.partial_filter = Some(filter);
        self
    }

    /// Returns the name the store derives when none is given (`field_1_other_-1`).
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, direction)| format!("{field}_{direction}"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Options of an instance update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Re-fetch the instance after a successful modification.
    pub reload: bool,
    /// Insert a document when nothing matches the identity filter.
    pub upsert: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            reload: true,
            upsert: false,
        }
    }
}

impl UpdateOptions {
    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}
