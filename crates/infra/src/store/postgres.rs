//! Postgres-backed identity store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict(field)` | username/email/company name taken (field from the constraint name) |
//! | Database (foreign key violation) | `23503` | `NotFound` | user references a company that does not exist |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! Rows that no longer pass field validation on load surface as `Backend`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, Row};
use tracing::instrument;
use uuid::Uuid;

use roster_auth::{PasswordHash, Role};
use roster_core::{
    CompanyId, CompanyName, DomainError, Email, Field, PersonName, PhoneNumber, TeamMemberId,
    UserId, Username,
};
use roster_identity::{Company, TeamMember, User};

use super::r#trait::{IdentityStore, StoreError, StoreResult, UserFilter};

/// Schema applied by [`PostgresIdentityStore::migrate`]. Idempotent.
pub const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    seq BIGSERIAL NOT NULL,
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT companies_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS users (
    seq BIGSERIAL NOT NULL,
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    phone_number TEXT NULL,
    role TEXT NOT NULL DEFAULT 'regular' CHECK (role IN ('admin', 'regular')),
    company_id UUID NULL REFERENCES companies (id) ON DELETE CASCADE,
    is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
    date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT users_username_key UNIQUE (username),
    CONSTRAINT users_email_key UNIQUE (email)
);

CREATE INDEX IF NOT EXISTS users_company_id_idx ON users (company_id);

CREATE TABLE IF NOT EXISTS team_members (
    seq BIGSERIAL NOT NULL,
    id UUID PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'regular' CHECK (role IN ('admin', 'regular'))
);
"#;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     phone_number, role, company_id, is_superuser, date_joined";

/// Postgres-backed identity store.
///
/// Uniqueness and company references are enforced by constraints, so
/// concurrent writers lose with `Conflict`/`NotFound` rather than
/// corrupting state. Listings are ordered by insertion (`seq`).
#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: Arc<PgPool>,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(MIGRATIONS)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn fetch_user(&self, operation: &str, column: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|row| decode_user(operation, &row)).transpose()
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    #[instrument(skip(self, id), fields(user_id = %id), err)]
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.map(|row| decode_user("find_user_by_id", &row)).transpose()
    }

    #[instrument(skip(self, username), fields(username = %username), err)]
    async fn find_user_by_username(&self, username: &Username) -> StoreResult<Option<User>> {
        self.fetch_user("find_user_by_username", "username", username.as_str())
            .await
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        self.fetch_user("find_user_by_email", "email", email.as_str())
            .await
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let company: Option<Uuid> = match filter {
            UserFilter::All => None,
            UserFilter::Company(id) => Some(id.into()),
        };
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::uuid IS NULL OR company_id = $1) \
             ORDER BY seq ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(company)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(|row| decode_user("list_users", row)).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, company_id = ?user.company), err)]
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                username,
                email,
                password_hash,
                first_name,
                last_name,
                phone_number,
                role,
                company_id,
                is_superuser,
                date_joined
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.first_name.as_str())
        .bind(user.last_name.as_str())
        .bind(user.phone_number.as_ref().map(|p| p.as_str()))
        .bind(user.role.as_str())
        .bind(user.company.map(Uuid::from))
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> StoreResult<User> {
        // username is never part of the SET list.
        let sql = format!(
            r#"
            UPDATE users SET
                email = $2,
                password_hash = $3,
                first_name = $4,
                last_name = $5,
                phone_number = $6,
                role = $7,
                company_id = $8,
                is_superuser = $9
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(user.email.as_str())
            .bind(user.password_hash.as_str())
            .bind(user.first_name.as_str())
            .bind(user.last_name.as_str())
            .bind(user.phone_number.as_ref().map(|p| p.as_str()))
            .bind(user.role.as_str())
            .bind(user.company.map(Uuid::from))
            .bind(user.is_superuser)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?
            .ok_or(StoreError::NotFound)?;
        decode_user("update_user", &row)
    }

    #[instrument(skip(self, id), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, company), fields(company_id = %company.id), err)]
    async fn insert_company(&self, company: Company) -> StoreResult<Company> {
        sqlx::query("INSERT INTO companies (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(company.id.as_uuid())
            .bind(company.name.as_str())
            .bind(company.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_company", e))?;
        Ok(company)
    }

    #[instrument(skip(self, company), fields(company_id = %company.id), err)]
    async fn update_company(&self, company: Company) -> StoreResult<Company> {
        let result = sqlx::query("UPDATE companies SET name = $2 WHERE id = $1")
            .bind(company.id.as_uuid())
            .bind(company.name.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_company", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(company)
    }

    #[instrument(skip(self, id), fields(company_id = %id), err)]
    async fn find_company_by_id(&self, id: CompanyId) -> StoreResult<Option<Company>> {
        let row = sqlx::query("SELECT id, name, created_at FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_company_by_id", e))?;
        row.map(|row| decode_company("find_company_by_id", &row))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_companies(&self) -> StoreResult<Vec<Company>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM companies ORDER BY seq ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_companies", e))?;
        rows.iter()
            .map(|row| decode_company("list_companies", row))
            .collect()
    }

    /// Users go first, explicitly, in the same transaction as the company.
    #[instrument(skip(self, id), fields(company_id = %id), err)]
    async fn delete_company(&self, id: CompanyId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let users = sqlx::query("DELETE FROM users WHERE company_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_company_users", e))?;

        let company = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_company", e))?;

        if company.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::debug!(removed_users = users.rows_affected(), "company deleted");
        Ok(())
    }

    #[instrument(skip(self, member), fields(member_id = %member.id), err)]
    async fn insert_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        sqlx::query(
            r#"
            INSERT INTO team_members (id, first_name, last_name, phone_number, email, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.first_name.as_str())
        .bind(member.last_name.as_str())
        .bind(member.phone_number.as_str())
        .bind(member.email.as_str())
        .bind(member.role.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_team_member", e))?;
        Ok(member)
    }

    #[instrument(skip(self, member), fields(member_id = %member.id), err)]
    async fn update_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        let result = sqlx::query(
            r#"
            UPDATE team_members SET
                first_name = $2,
                last_name = $3,
                phone_number = $4,
                email = $5,
                role = $6
            WHERE id = $1
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.first_name.as_str())
        .bind(member.last_name.as_str())
        .bind(member.phone_number.as_str())
        .bind(member.email.as_str())
        .bind(member.role.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_team_member", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(member)
    }

    #[instrument(skip(self, id), fields(member_id = %id), err)]
    async fn find_team_member(&self, id: TeamMemberId) -> StoreResult<Option<TeamMember>> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, phone_number, email, role FROM team_members WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_team_member", e))?;
        row.map(|row| decode_team_member("find_team_member", &row))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_team_members(&self) -> StoreResult<Vec<TeamMember>> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, phone_number, email, role FROM team_members ORDER BY seq ASC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_team_members", e))?;
        rows.iter()
            .map(|row| decode_team_member("list_team_members", row))
            .collect()
    }

    #[instrument(skip(self, id), fields(member_id = %id), err)]
    async fn delete_team_member(&self, id: TeamMemberId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_team_member", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => match db_err.constraint().and_then(constraint_field) {
                    Some(field) => StoreError::Conflict(field),
                    None => StoreError::Backend(msg),
                },
                // Foreign key violation: the referenced company is gone.
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn constraint_field(constraint: &str) -> Option<Field> {
    match constraint {
        "users_username_key" => Some(Field::Username),
        "users_email_key" => Some(Field::Email),
        "companies_name_key" => Some(Field::CompanyName),
        _ => None,
    }
}

fn decode_error(operation: &str, what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {what} row in {operation}: {err}"))
}

fn invalid_column(operation: &str, err: DomainError) -> StoreError {
    StoreError::Backend(format!("stored value failed validation in {operation}: {err}"))
}

fn decode_user(operation: &str, row: &PgRow) -> StoreResult<User> {
    let row = UserRow::from_row(row).map_err(|e| decode_error(operation, "user", e))?;
    row.into_user().map_err(|e| invalid_column(operation, e))
}

fn decode_company(operation: &str, row: &PgRow) -> StoreResult<Company> {
    let row = CompanyRow::from_row(row).map_err(|e| decode_error(operation, "company", e))?;
    row.into_company().map_err(|e| invalid_column(operation, e))
}

fn decode_team_member(operation: &str, row: &PgRow) -> StoreResult<TeamMember> {
    let row = TeamMemberRow::from_row(row).map_err(|e| decode_error(operation, "team member", e))?;
    row.into_member().map_err(|e| invalid_column(operation, e))
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    role: String,
    company_id: Option<Uuid>,
    is_superuser: bool,
    date_joined: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            role: row.try_get("role")?,
            company_id: row.try_get("company_id")?,
            is_superuser: row.try_get("is_superuser")?,
            date_joined: row.try_get("date_joined")?,
        })
    }
}

impl UserRow {
    fn into_user(self) -> Result<User, DomainError> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            username: Username::parse(&self.username)?,
            email: Email::parse(&self.email)?,
            password_hash: PasswordHash::from_stored(self.password_hash),
            first_name: PersonName::parse(Field::FirstName, &self.first_name)?,
            last_name: PersonName::parse(Field::LastName, &self.last_name)?,
            phone_number: match self.phone_number {
                Some(raw) => PhoneNumber::parse_optional(&raw)?,
                None => None,
            },
            role: self.role.parse::<Role>()?,
            company: self.company_id.map(CompanyId::from_uuid),
            is_superuser: self.is_superuser,
            date_joined: self.date_joined,
        })
    }
}

#[derive(Debug)]
struct CompanyRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CompanyRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CompanyRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl CompanyRow {
    fn into_company(self) -> Result<Company, DomainError> {
        Ok(Company {
            id: CompanyId::from_uuid(self.id),
            name: CompanyName::parse(&self.name)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct TeamMemberRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    phone_number: String,
    email: String,
    role: String,
}

impl<'r> FromRow<'r, PgRow> for TeamMemberRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TeamMemberRow {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
        })
    }
}

impl TeamMemberRow {
    fn into_member(self) -> Result<TeamMember, DomainError> {
        Ok(TeamMember {
            id: TeamMemberId::from_uuid(self.id),
            first_name: PersonName::parse_required(Field::FirstName, &self.first_name)?,
            last_name: PersonName::parse_required(Field::LastName, &self.last_name)?,
            phone_number: PhoneNumber::parse(&self.phone_number)?,
            email: Email::parse(&self.email)?,
            role: self.role.parse::<Role>()?,
        })
    }
}
