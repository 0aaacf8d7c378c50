// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Error types for the mapping layer and for the document store collaborator.

use crate::constants::status;

/// A specialized `Result` type for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A `Result` produced by a [`DocumentStoreClient`](crate::clients::DocumentStoreClient).
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the mapping layer.
///
/// Local precondition failures (`InvalidArgument`, `UnsupportedOperation`, `IllegalState`)
/// are raised before any request reaches the store. Store failures are reclassified at the
/// [`CosmosTemplate`](crate::clients::CosmosTemplate) boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("document '{id}' not found in container '{container}'")]
    NotFound { container: String, id: String },

    #[error("precondition failed for document '{id}' in container '{container}'")]
    ConcurrencyConflict { container: String, id: String },

    #[error("{operation} against container '{container}' failed: {source}")]
    StoreAccess {
        operation: &'static str,
        container: String,
        #[source]
        source: StoreError,
    },

    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A query-then-delete stopped at its first failure.
    ///
    /// `deleted` lists the ids removed before the failure; those deletions are not rolled back.
    #[error("delete in container '{container}' stopped after {} deletion(s): {source}", .deleted.len())]
    PartialDelete {
        container: String,
        deleted: Vec<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedOperation(message.into())
    }

    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        Error::IllegalState(message.into())
    }

    /// Reclassifies a store failure for the given operation.
    ///
    /// `id` names the document targeted by point operations and is used for `NotFound` and
    /// `ConcurrencyConflict`; query operations pass `None` and always get `StoreAccess`.
    pub(crate) fn from_store(
        operation: &'static str,
        container: &str,
        id: Option<&str>,
        source: StoreError,
    ) -> Self {
        match (source.status(), id) {
            (Some(status::NOT_FOUND), Some(id)) => Error::NotFound {
                container: container.to_string(),
                id: id.to_string(),
            },
            (Some(status::PRECONDITION_FAILED), Some(id)) => Error::ConcurrencyConflict {
                container: container.to_string(),
                id: id.to_string(),
            },
            _ => Error::StoreAccess {
                operation,
                container: container.to_string(),
                source,
            },
        }
    }

    /// Returns `true` if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns `true` if this is a [`Error::ConcurrencyConflict`].
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict { .. })
    }
}

/// A failure reported by the document store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The service answered with a non-success status.
    #[error("HTTP {status}{}: {message}", code_suffix(.error_code))]
    HttpResponse {
        status: u16,
        error_code: Option<String>,
        message: String,
    },

    /// The request did not complete (connection, timeout).
    #[error("I/O error: {0}")]
    Io(String),

    /// The response could not be interpreted.
    #[error("data conversion: {0}")]
    DataConversion(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Creates a [`StoreError::HttpResponse`] with the given status and no error code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        StoreError::HttpResponse {
            status,
            error_code: None,
            message: message.into(),
        }
    }

    /// The HTTP status, if the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::HttpResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn code_suffix(error_code: &Option<String>) -> String {
    error_code
        .as_deref()
        .map(|code| format!(" ({})", code))
        .unwrap_or_default()
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::DataConversion(error.to_string())
    }
}
