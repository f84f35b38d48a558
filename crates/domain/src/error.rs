//! Domain error types.

use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// One rejected payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field problem found in a payload, so a caller can fix them all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if any error concerns `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Ok when nothing was collected, otherwise a `Validation` error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Why a write was refused because of existing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    SoldOut,
    AlreadyRegistered,
    /// A uniqueness constraint rejected the write.
    Duplicate(String),
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::SoldOut => f.write_str("sold out"),
            ConflictReason::AlreadyRegistered => f.write_str("already registered"),
            ConflictReason::Duplicate(constraint) => write!(f, "duplicate ({constraint})"),
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range payload; raised before any storage access.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor lacks rights for the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// The event has already started.
    #[error("The event registration is closed")]
    RegistrationClosed,

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// A collaborator such as the geocoder failed.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Internal consistency check failed; points at a storage or concurrency bug.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(ValidationErrors::single(field, message))
    }

    /// Stable machine-readable kind, used as the error tag at the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound { .. } => "not_found",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Conflict(_) => "conflict",
            DomainError::RegistrationClosed => "registration_closed",
            DomainError::NotImplemented(_) => "not_implemented",
            DomainError::UpstreamFailure(_) => "upstream_failure",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::Store(_) => "internal_error",
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { constraint } => {
                DomainError::Conflict(ConflictReason::Duplicate(constraint))
            }
            StoreError::MissingReference(constraint) => DomainError::NotFound {
                entity: "reference",
                id: constraint,
            },
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
