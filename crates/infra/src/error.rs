use thiserror::Error;

use roster_auth::{Action, AuthzError, CredentialError};
use roster_core::{DomainError, Field, ValidationKind};

use crate::store::StoreError;

/// Error surfaced by the lifecycle services.
///
/// Variants carry tags only; turning them into user-facing text is the
/// transport's job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A field failed validation (including pre-checked duplicates).
    #[error("validation failed: {field} {kind}")]
    Validation { field: Field, kind: ValidationKind },

    /// Policy denial (`action` set) or failed credential check (`action` unset).
    #[error("unauthorized")]
    Unauthorized { action: Option<Action> },

    #[error("not found")]
    NotFound,

    /// A uniqueness race was lost at write time.
    #[error("conflict on {0}")]
    Conflict(Field),

    #[error("username generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("credential failure: {0}")]
    Credential(String),

    #[error("store failure: {0}")]
    Store(String),
}

impl ServiceError {
    pub fn unauthorized(action: Action) -> Self {
        Self::Unauthorized {
            action: Some(action),
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::Unauthorized { action: None }
    }

    pub fn duplicate(field: Field) -> Self {
        Self::Validation {
            field,
            kind: ValidationKind::Duplicate,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation { field, kind } => ServiceError::Validation { field, kind },
            // An unparseable id cannot name an existing record.
            DomainError::InvalidId(_) => ServiceError::NotFound,
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::unauthorized(value.action())
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(field) => ServiceError::Conflict(field),
            StoreError::Backend(msg) => ServiceError::Store(msg),
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        ServiceError::Credential(value.to_string())
    }
}
