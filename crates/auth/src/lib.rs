//! `roster-auth`: pure authorization boundary plus credential hashing.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers
//! resolve the actor upstream and pass it in.

pub mod authorize;
pub mod credentials;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, Decision, DenyReason, RuleMatched, authorize,
    authorize_company, explain_authorization,
};
pub use credentials::{Argon2Hasher, CredentialError, CredentialHasher, PasswordHash};
pub use permissions::Action;
pub use principal::{Actor, Target};
pub use roles::Role;
