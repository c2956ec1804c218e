//! Bulk writes as `insert` / `update` / `delete` write commands.
//!
//! Consecutive requests of the same kind are sent as one write command, so staging
//! order is preserved across kinds. Each command reports `writeErrors` with indexes
//! relative to the command; they are shifted back to indexes into the whole request.

use bson::{Bson, Document, doc, oid::ObjectId};

use docmodel_core::{
    error::{BulkWriteFailure, BulkWriteItemError},
    schema::OBJECT_ID_FIELD,
    write::{BulkWriteResult, WriteRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Insert,
    Update,
    Delete,
}

impl CommandKind {
    fn of(request: &WriteRequest) -> Self {
        match request {
            WriteRequest::InsertOne { .. } => CommandKind::Insert,
            WriteRequest::UpdateOne { .. } => CommandKind::Update,
            WriteRequest::DeleteOne { .. } => CommandKind::Delete,
        }
    }
}

/// A run of same-kind requests and the index of its first request.
#[derive(Debug)]
pub(crate) struct CommandGroup {
    pub kind: CommandKind,
    pub offset: usize,
    pub requests: Vec<WriteRequest>,
}

/// Splits `requests` into runs of consecutive same-kind requests.
pub(crate) fn group_requests(requests: Vec<WriteRequest>) -> Vec<CommandGroup> {
    let mut groups: Vec<CommandGroup> = Vec::new();

    for (index, request) in requests.into_iter().enumerate() {
        let kind = CommandKind::of(&request);

        match groups.last_mut() {
            Some(group) if group.kind == kind => group.requests.push(request),
            _ => groups.push(CommandGroup {
                kind,
                offset: index,
                requests: vec![request],
            }),
        }
    }

    groups
}

fn with_object_id(document: Document) -> Document {
    if document.contains_key(OBJECT_ID_FIELD) {
        return document;
    }

    let mut with_id = doc! { OBJECT_ID_FIELD: ObjectId::new() };
    for (key, value) in document {
        with_id.insert(key, value);
    }

    with_id
}

/// Builds the write command of a group.
pub(crate) fn command(collection: &str, group: CommandGroup, ordered: bool) -> Document {
    let mut entries = Vec::with_capacity(group.requests.len());

    for request in group.requests {
        let entry = match request {
            WriteRequest::InsertOne { document } => Bson::Document(with_object_id(document)),
            WriteRequest::UpdateOne { filter, update, upsert } => Bson::Document(doc! {
                "q": filter,
                "u": update,
                "upsert": upsert,
                "multi": false,
            }),
            WriteRequest::DeleteOne { filter } => Bson::Document(doc! { "q": filter, "limit": 1 }),
        };
        entries.push(entry);
    }

    match group.kind {
        CommandKind::Insert => doc! { "insert": collection, "documents": entries, "ordered": ordered },
        CommandKind::Update => doc! { "update": collection, "updates": entries, "ordered": ordered },
        CommandKind::Delete => doc! { "delete": collection, "deletes": entries, "ordered": ordered },
    }
}

fn count(reply: &Document, key: &str) -> u64 {
    match reply.get(key) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) => n.max(0.0) as u64,
        _ => 0,
    }
}

fn code(document: &Document) -> i32 {
    match document.get("code") {
        Some(Bson::Int32(n)) => *n,
        Some(Bson::Int64(n)) => *n as i32,
        Some(Bson::Double(n)) => *n as i32,
        _ => 0,
    }
}

fn message(document: &Document) -> String {
    document
        .get_str("errmsg")
        .unwrap_or_default()
        .to_string()
}

/// Adds a command reply to the running totals and failure details.
///
/// Returns whether the reply carried write errors.
pub(crate) fn record_reply(
    kind: CommandKind,
    offset: usize,
    reply: &Document,
    result: &mut BulkWriteResult,
    failure: &mut BulkWriteFailure,
) -> bool {
    let n = count(reply, "n");

    match kind {
        CommandKind::Insert => result.inserted_count += n,
        CommandKind::Delete => result.deleted_count += n,
        CommandKind::Update => {
            let upserted = reply
                .get_array("upserted")
                .map(|upserted| upserted.len() as u64)
                .unwrap_or(0);

            result.upserted_count += upserted;
            result.matched_count += n.saturating_sub(upserted);
            result.modified_count += count(reply, "nModified");
        }
    }

    let write_errors = reply
        .get_array("writeErrors")
        .map(|errors| {
            errors
                .iter()
                .filter_map(Bson::as_document)
                .map(|error| BulkWriteItemError {
                    index: offset + count(error, "index") as usize,
                    code: code(error),
                    message: message(error),
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if let Ok(concern) = reply.get_document("writeConcernError") {
        failure
            .write_concern_errors
            .push(format!("{} (code {})", message(concern), code(concern)));
    }

    let failed = !write_errors.is_empty();
    failure.write_errors.extend(write_errors);

    failed
}
