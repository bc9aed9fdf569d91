use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use roster_core::{CompanyId, Email, Field, TeamMemberId, UserId, Username};
use roster_identity::{Company, TeamMember, User};

pub type StoreResult<T> = Result<T, StoreError>;

/// Identity store operation error.
///
/// Infrastructure failures only. Field validation happens before a record
/// ever reaches the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A mutation addressed a record (or referenced company) that does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was violated by the write.
    #[error("unique constraint violated on {0}")]
    Conflict(Field),

    /// Connection, decode or other backend failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Which users `list_users` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Company(CompanyId),
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Company(company) => user.company == Some(*company),
        }
    }
}

/// Record repository for the identity model.
///
/// ## Semantics
///
/// - Finders return `Ok(None)` on a miss, not `NotFound`. Callers decide
///   what a miss means.
/// - Mutations addressing a missing id return `StoreError::NotFound`.
/// - Username, email and company name are unique; a violation returns
///   `StoreError::Conflict(field)` and writes nothing.
/// - Listings are in insertion order.
/// - `delete_company` removes the company and all of its users atomically.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &Username) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>>;
    async fn list_users(&self, filter: UserFilter) -> StoreResult<Vec<User>>;
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn update_user(&self, user: User) -> StoreResult<User>;
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    async fn insert_company(&self, company: Company) -> StoreResult<Company>;
    async fn update_company(&self, company: Company) -> StoreResult<Company>;
    async fn find_company_by_id(&self, id: CompanyId) -> StoreResult<Option<Company>>;
    async fn list_companies(&self) -> StoreResult<Vec<Company>>;
    async fn delete_company(&self, id: CompanyId) -> StoreResult<()>;

    async fn insert_team_member(&self, member: TeamMember) -> StoreResult<TeamMember>;
    async fn update_team_member(&self, member: TeamMember) -> StoreResult<TeamMember>;
    async fn find_team_member(&self, id: TeamMemberId) -> StoreResult<Option<TeamMember>>;
    async fn list_team_members(&self) -> StoreResult<Vec<TeamMember>>;
    async fn delete_team_member(&self, id: TeamMemberId) -> StoreResult<()>;
}

#[async_trait]
impl<S> IdentityStore for Arc<S>
where
    S: IdentityStore + ?Sized,
{
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        (**self).find_user_by_id(id).await
    }

    async fn find_user_by_username(&self, username: &Username) -> StoreResult<Option<User>> {
        (**self).find_user_by_username(username).await
    }

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        (**self).find_user_by_email(email).await
    }

    async fn list_users(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        (**self).list_users(filter).await
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        (**self).insert_user(user).await
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        (**self).update_user(user).await
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        (**self).delete_user(id).await
    }

    async fn insert_company(&self, company: Company) -> StoreResult<Company> {
        (**self).insert_company(company).await
    }

    async fn update_company(&self, company: Company) -> StoreResult<Company> {
        (**self).update_company(company).await
    }

    async fn find_company_by_id(&self, id: CompanyId) -> StoreResult<Option<Company>> {
        (**self).find_company_by_id(id).await
    }

    async fn list_companies(&self) -> StoreResult<Vec<Company>> {
        (**self).list_companies().await
    }

    async fn delete_company(&self, id: CompanyId) -> StoreResult<()> {
        (**self).delete_company(id).await
    }

    async fn insert_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        (**self).insert_team_member(member).await
    }

    async fn update_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        (**self).update_team_member(member).await
    }

    async fn find_team_member(&self, id: TeamMemberId) -> StoreResult<Option<TeamMember>> {
        (**self).find_team_member(id).await
    }

    async fn list_team_members(&self) -> StoreResult<Vec<TeamMember>> {
        (**self).list_team_members().await
    }

    async fn delete_team_member(&self, id: TeamMemberId) -> StoreResult<()> {
        (**self).delete_team_member(id).await
    }
}
