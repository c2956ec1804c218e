//! Driver error mapping.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

use docmodel_core::error::DocumentStoreError;

/// Server error code of unique index violations.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Maps a driver error onto the store error taxonomy.
///
/// Server selection failures become [`DocumentStoreError::ConnectivityTimeout`] and
/// unique index violations [`DocumentStoreError::DuplicateKey`]; everything else is a
/// [`DocumentStoreError::Backend`] error.
pub(crate) fn map_error(err: MongoError) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => DocumentStoreError::ConnectivityTimeout(err.to_string()),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE => {
            DocumentStoreError::DuplicateKey(write_error.message.clone())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            DocumentStoreError::DuplicateKey(command_error.message.clone())
        }
        _ => DocumentStoreError::Backend(err.to_string()),
    }
}
