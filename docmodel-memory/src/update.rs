//! Update operator application.
//!
//! Supports `$set`, `$unset` and `$inc` on top-level and dotted paths. Replacement
//! documents (updates without operators) are rejected, as the store does for
//! `update_one` and `update_many`.

use bson::{Bson, Document};

use docmodel_core::error::{DocumentStoreError, DocumentStoreResult};

use crate::evaluator::is_operator_document;

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Backend(message.into())
}

/// Applies `update` to `document` and returns whether anything changed.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> DocumentStoreResult<bool> {
    if !is_operator_document(&Bson::Document(update.clone())) {
        return Err(invalid("update document requires atomic operators"));
    }

    let before = document.clone();

    for (operator, fields) in update {
        let fields = fields.as_document().ok_or_else(|| {
            invalid(format!("{operator} needs a document, got {fields}"))
        })?;

        for (path, operand) in fields {
            match operator.as_str() {
                "$set" => set_path(document, path, operand.clone())?,
                "$unset" => unset_path(document, path),
                "$inc" => increment_path(document, path, operand)?,
                other => return Err(invalid(format!("unsupported update operator {other}"))),
            }
        }
    }

    Ok(*document != before)
}

/// Builds the document an upsert inserts: the equality conditions of `filter`.
pub(crate) fn upsert_seed(filter: &Document) -> DocumentStoreResult<Document> {
    let mut seed = Document::new();

    for (key, condition) in filter {
        if key.starts_with('$') {
            continue;
        }

        match condition {
            Bson::Document(operators) if is_operator_document(condition) => {
                if let Some(value) = operators.get("$eq") {
                    set_path(&mut seed, key, value.clone())?;
                }
            }
            value => set_path(&mut seed, key, value.clone())?,
        }
    }

    Ok(seed)
}

fn parent_mut<'a>(document: &'a mut Document, path: &'a str) -> DocumentStoreResult<(&'a mut Document, &'a str)> {
    match path.split_once('.') {
        None => Ok((document, path)),
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(inner)) => parent_mut(inner, rest),
                _ => Err(invalid(format!("cannot create field {rest} in non-document {head}"))),
            }
        }
    }
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let (parent, field) = parent_mut(document, path)?;
    parent.insert(field, value);

    Ok(())
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

fn increment_path(document: &mut Document, path: &str, operand: &Bson) -> DocumentStoreResult<()> {
    let (parent, field) = parent_mut(document, path)?;

    let sum = match (parent.get(field), operand) {
        (None, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => operand.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(checked_sum(i64::from(*a), *b)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(checked_sum(*a, i64::from(*b))?),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(checked_sum(*a, *b)?),
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Some(Bson::Double(a)), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (Some(Bson::Int64(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (current, _) => {
            return Err(invalid(format!(
                "cannot apply $inc {operand} to {field} = {}",
                current.map(ToString::to_string).unwrap_or_else(|| "missing".to_string())
            )));
        }
    };

    parent.insert(field, sum);

    Ok(())
}

fn checked_sum(a: i64, b: i64) -> DocumentStoreResult<i64> {
    a.checked_add(b).ok_or_else(|| invalid("$inc overflow"))
}
