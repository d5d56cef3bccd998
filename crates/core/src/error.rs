use crate::types::DbId;

/// A business-rule violation raised by a domain operation.
///
/// Every guard in the access, membership and issue modules fails with one of
/// these variants. They are never retried.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{entity} with id {id} has been deleted")]
    Deleted { entity: &'static str, id: DbId },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidArgument,
}

impl CoreError {
    /// Fold the error into the three-way taxonomy callers map to responses.
    ///
    /// `Deleted` is a flavour of `NotFound`; `Conflict` (e.g. "already
    /// invited") is a flavour of `Forbidden`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } | CoreError::Deleted { .. } => ErrorKind::NotFound,
            CoreError::Forbidden(_) | CoreError::Conflict(_) => ErrorKind::Forbidden,
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Forbidden(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }
}

/// An infrastructure failure reported by the storage gateway.
///
/// The source error is carried as-is so callers can tell "business rule
/// broken" from "system unavailable".
#[derive(Debug, thiserror::Error)]
#[error("Storage error: {source}")]
pub struct StorageError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Borrow the underlying error, e.g. to downcast to `sqlx::Error`.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Error returned by every service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// The domain error, if this is a business-rule violation.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Storage(_) => None,
        }
    }
}

/// Convenience alias for service return values.
pub type ServiceResult<T> = Result<T, ServiceError>;
