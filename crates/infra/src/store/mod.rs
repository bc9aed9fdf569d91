//! Identity store boundary.
//!
//! Persistence for companies, users and team members behind one async
//! trait, with an in-memory implementation for tests/dev and a Postgres one.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryIdentityStore;
pub use postgres::PostgresIdentityStore;
pub use r#trait::{IdentityStore, StoreError, StoreResult, UserFilter};
