//! Infrastructure layer: identity storage, lifecycle services, config.

pub mod config;
pub mod error;
pub mod services;
pub mod store;
pub mod username;

pub use config::RosterConfig;
pub use error::ServiceError;
pub use services::{CallContext, CompanyService, TeamDirectory, UserService};
pub use store::{IdentityStore, InMemoryIdentityStore, PostgresIdentityStore, StoreError, UserFilter};
pub use username::{RandomTokens, TokenSource, UsernameGenerator};
