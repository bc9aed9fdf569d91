//! `roster-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, and validated field values.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, Field, ValidationKind};
pub use id::{CompanyId, TeamMemberId, UserId};
pub use value_object::{CompanyName, Email, Password, PersonName, PhoneNumber, Username, ValueObject};
