#![forbid(unsafe_code)]

use mg_core::entry::EntryPoint;
use mg_storage::StoreError;

/// Failure raised by a business-logic handler. The dispatcher never inspects it.
#[derive(Debug, thiserror::Error)]
pub(crate) enum HandlerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HandlerError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::Store(StoreError::InvalidInput(_)) => "INVALID_INPUT",
            Self::NotFound(_) | Self::Store(StoreError::UnknownId(_)) => "NOT_FOUND",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DispatchError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unsupported operation for {}: {operation}", .entry_point.tool_name())]
    UnsupportedOperation {
        entry_point: EntryPoint,
        operation: String,
    },
    #[error("unsupported bulk operation: {0}")]
    UnsupportedBulkOperation(String),
    #[error("operation {operation} of {} is not implemented", .entry_point.tool_name())]
    UnimplementedOperation {
        entry_point: EntryPoint,
        operation: &'static str,
    },
    #[error(transparent)]
    HandlerFailure(#[from] HandlerError),
}

impl DispatchError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            Self::UnsupportedBulkOperation(_) => "UNSUPPORTED_BULK_OPERATION",
            Self::UnimplementedOperation { .. } => "UNIMPLEMENTED_OPERATION",
            Self::HandlerFailure(_) => "HANDLER_FAILURE",
        }
    }

    /// Caller mistakes, as opposed to server-side gaps or handler failures.
    pub(crate) fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::UnsupportedOperation { .. }
                | Self::UnsupportedBulkOperation(_)
        )
    }
}
