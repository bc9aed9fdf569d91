//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A field of a persisted record, used to tag validation and uniqueness failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Username,
    Email,
    Password,
    FirstName,
    LastName,
    PhoneNumber,
    Role,
    CompanyName,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::PhoneNumber => "phone_number",
            Field::Role => "role",
            Field::CompanyName => "company_name",
        }
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was wrong with a field value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    Empty,
    TooShort,
    TooLong,
    Malformed,
    Duplicate,
}

impl core::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ValidationKind::Empty => "empty",
            ValidationKind::TooShort => "too_short",
            ValidationKind::TooLong => "too_long",
            ValidationKind::Malformed => "malformed",
            ValidationKind::Duplicate => "duplicate",
        })
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic field and record failures. Variants
/// carry tags only; mapping to user-facing text is the transport's job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field value failed validation (malformed, too long, duplicate, ...).
    #[error("validation failed: {field} {kind}")]
    Validation { field: Field, kind: ValidationKind },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(field: Field, kind: ValidationKind) -> Self {
        Self::Validation { field, kind }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The offending field, where the failure is attributable to one.
    pub fn field(&self) -> Option<Field> {
        match self {
            DomainError::Validation { field, .. } => Some(*field),
            DomainError::InvalidId(_) => None,
        }
    }
}
