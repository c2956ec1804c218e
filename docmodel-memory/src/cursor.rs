//! Cursor modifiers and aggregation stages over in-memory result sets.

use bson::{Bson, Document, doc};
use std::cmp::Ordering;

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindOptions,
    schema::OBJECT_ID_FIELD,
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

fn direction(field: &str, value: &Bson) -> DocumentStoreResult<Ordering> {
    match value {
        Bson::Int32(1) | Bson::Int64(1) => Ok(Ordering::Less),
        Bson::Double(d) if *d == 1.0 => Ok(Ordering::Less),
        Bson::Int32(-1) | Bson::Int64(-1) => Ok(Ordering::Greater),
        Bson::Double(d) if *d == -1.0 => Ok(Ordering::Greater),
        other => Err(DocumentStoreError::Backend(format!(
            "invalid sort direction for {field}: {other}"
        ))),
    }
}

/// Sorts documents by a `{field: 1 | -1, ...}` specification. Missing fields sort
/// as null.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &Document) -> DocumentStoreResult<()> {
    let keys = sort
        .iter()
        .map(|(field, value)| Ok((field.as_str(), direction(field, value)? == Ordering::Greater)))
        .collect::<DocumentStoreResult<Vec<_>>>()?;

    documents.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = lookup(a, field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);
            let right = lookup(b, field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);

            let ordering = match descending {
                false => left.sort_cmp(&right),
                true => right.sort_cmp(&left),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    });

    Ok(())
}

/// Restricts documents to an inclusion (`{field: 1}`) or exclusion (`{field: 0}`)
/// projection. `_id` is kept unless explicitly excluded.
pub(crate) fn project(document: Document, projection: &Document) -> DocumentStoreResult<Document> {
    let included = |value: &Bson| match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    };

    let inclusion = projection
        .iter()
        .filter(|(field, _)| field.as_str() != OBJECT_ID_FIELD)
        .map(|(_, value)| included(value))
        .collect::<Vec<_>>();

    if inclusion.iter().any(|b| *b) && inclusion.iter().any(|b| !*b) {
        return Err(DocumentStoreError::Backend(
            "projection cannot mix inclusion and exclusion".to_string(),
        ));
    }

    let keep_id = projection
        .get(OBJECT_ID_FIELD)
        .is_none_or(included);

    if inclusion.first().copied().unwrap_or(false) {
        let mut projected = Document::new();

        for (field, value) in document {
            if field == OBJECT_ID_FIELD {
                if keep_id {
                    projected.insert(field, value);
                }
            } else if projection.get(&field).is_some_and(included) {
                projected.insert(field, value);
            }
        }

        Ok(projected)
    } else {
        Ok(document
            .into_iter()
            .filter(|(field, _)| match field.as_str() {
                OBJECT_ID_FIELD => keep_id,
                other => projection.get(other).is_none_or(included),
            })
            .collect())
    }
}

fn skip_and_limit(documents: Vec<Document>, skip: u64, limit: Option<i64>) -> Vec<Document> {
    let limit = match limit {
        Some(0) | None => usize::MAX,
        Some(n) => n.unsigned_abs() as usize,
    };

    documents
        .into_iter()
        .skip(skip as usize)
        .take(limit)
        .collect()
}

/// Applies sort, skip, limit and projection, in that order. Hints are ignored.
pub(crate) fn apply_find_options(
    mut documents: Vec<Document>,
    options: &FindOptions,
) -> DocumentStoreResult<Vec<Document>> {
    if let Some(sort) = &options.sort {
        sort_documents(&mut documents, sort)?;
    }

    let documents = skip_and_limit(documents, options.skip.unwrap_or(0), options.limit);

    match &options.projection {
        Some(projection) => documents
            .into_iter()
            .map(|document| project(document, projection))
            .collect(),
        None => Ok(documents),
    }
}

fn count_stage(stage: &str, value: &Bson) -> DocumentStoreResult<u64> {
    match value {
        Bson::Int32(n) if *n >= 0 => Ok(*n as u64),
        Bson::Int64(n) if *n >= 0 => Ok(*n as u64),
        other => Err(DocumentStoreError::Backend(format!(
            "{stage} needs a non-negative integer, got {other}"
        ))),
    }
}

/// Runs an aggregation pipeline of `$match`, `$sort`, `$skip`, `$limit`, `$project`
/// and `$count` stages.
pub(crate) fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> DocumentStoreResult<Vec<Document>> {
    for stage in pipeline {
        let mut operators = stage.iter();
        let (Some((operator, argument)), None) = (operators.next(), operators.next()) else {
            return Err(DocumentStoreError::Backend(format!(
                "a pipeline stage must have exactly one field: {stage}"
            )));
        };

        let as_document = || {
            argument.as_document().ok_or_else(|| {
                DocumentStoreError::Backend(format!("{operator} needs a document, got {argument}"))
            })
        };

        documents = match operator.as_str() {
            "$match" => DocumentEvaluator::filter_documents(documents.iter(), as_document()?)?,
            "$sort" => {
                sort_documents(&mut documents, as_document()?)?;
                documents
            }
            "$skip" => skip_and_limit(documents, count_stage(operator, argument)?, None),
            "$limit" => {
                let limit = count_stage(operator, argument)?;
                documents.truncate(limit as usize);
                documents
            }
            "$project" => {
                let projection = as_document()?;
                documents
                    .into_iter()
                    .map(|document| project(document, projection))
                    .collect::<DocumentStoreResult<Vec<_>>>()?
            }
            "$count" => {
                let field = argument.as_str().ok_or_else(|| {
                    DocumentStoreError::Backend(format!("$count needs a field name, got {argument}"))
                })?;
                vec![doc! { field: documents.len() as i64 }]
            }
            other => {
                return Err(DocumentStoreError::Backend(format!(
                    "unsupported pipeline stage {other}"
                )));
            }
        };
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movies() -> Vec<Document> {
        vec![
            doc! { "_id": 1, "title": "Vertigo", "year": 1958 },
            doc! { "_id": 2, "title": "Casablanca", "year": 1942 },
            doc! { "_id": 3, "title": "Rebecca", "year": 1940 },
            doc! { "_id": 4, "title": "Notorious" },
        ]
    }

    fn titles(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.get_str("title").unwrap())
            .collect()
    }

    #[test]
    fn sort_skip_limit_apply_in_order() {
        let options = FindOptions::builder()
            .sort("year", docmodel_core::query::SortDirection::Desc)
            .skip(1)
            .limit(2)
            .build();

        let result = apply_find_options(movies(), &options).unwrap();

        assert_eq!(titles(&result), ["Casablanca", "Rebecca"]);
    }

    #[test]
    fn missing_sort_keys_order_first_ascending() {
        let mut documents = movies();
        sort_documents(&mut documents, &doc! { "year": 1 }).unwrap();

        assert_eq!(titles(&documents), ["Notorious", "Rebecca", "Casablanca", "Vertigo"]);
    }

    #[test]
    fn projections_keep_the_object_id() {
        let projected = project(doc! { "_id": 1, "title": "Vertigo", "year": 1958 }, &doc! { "title": 1 }).unwrap();
        assert_eq!(projected, doc! { "_id": 1, "title": "Vertigo" });

        let excluded = project(doc! { "_id": 1, "title": "Vertigo", "year": 1958 }, &doc! { "_id": 0, "year": 0 }).unwrap();
        assert_eq!(excluded, doc! { "title": "Vertigo" });

        assert!(project(doc! {}, &doc! { "title": 1, "year": 0 }).is_err());
    }

    #[test]
    fn pipelines_chain_stages() {
        let pipeline = vec![
            doc! { "$match": { "year": { "$exists": true } } },
            doc! { "$sort": { "year": 1 } },
            doc! { "$skip": 1 },
            doc! { "$project": { "title": 1, "_id": 0 } },
        ];

        let result = run_pipeline(movies(), &pipeline).unwrap();
        assert_eq!(result, vec![doc! { "title": "Casablanca" }, doc! { "title": "Vertigo" }]);

        let counted = run_pipeline(movies(), &[doc! { "$count": "total" }]).unwrap();
        assert_eq!(counted, vec![doc! { "total": 4_i64 }]);

        assert!(run_pipeline(movies(), &[doc! { "$group": { "_id": "$year" } }]).is_err());
    }
}
