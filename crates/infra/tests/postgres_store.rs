//! Postgres identity store against a live database.
//!
//! Set `ROSTER_TEST_DATABASE_URL` to run; otherwise every test returns early.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;

use roster_auth::{PasswordHash, Role};
use roster_core::{CompanyId, CompanyName, Email, Field, PersonName, UserId, Username};
use roster_identity::{Company, User};
use roster_infra::{IdentityStore, PostgresIdentityStore, StoreError, UserFilter};

async fn store() -> Option<PostgresIdentityStore> {
    let Ok(url) = std::env::var("ROSTER_TEST_DATABASE_URL") else {
        eprintln!("ROSTER_TEST_DATABASE_URL not set; skipping");
        return None;
    };
    roster_observability::tracing::init_for_tests();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    let store = PostgresIdentityStore::new(pool);
    store.migrate().await.expect("apply schema");
    Some(store)
}

fn suffix() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

fn company(tag: &str) -> Company {
    Company::new(CompanyName::parse(&format!("{tag} {}", suffix())).unwrap())
}

fn user(company: Option<CompanyId>) -> User {
    let username = format!("u_{}", suffix());
    User {
        id: UserId::new(),
        username: Username::parse(&username).unwrap(),
        email: Email::parse(&format!("{username}@example.com")).unwrap(),
        password_hash: PasswordHash::from_stored("$argon2id$stub"),
        first_name: PersonName::parse(Field::FirstName, "Test").unwrap(),
        last_name: PersonName::parse(Field::LastName, "User").unwrap(),
        phone_number: None,
        role: Role::Regular,
        company,
        is_superuser: false,
        date_joined: Utc::now(),
    }
}

#[tokio::test]
async fn user_round_trip() {
    let Some(store) = store().await else { return };

    let acme = store.insert_company(company("Acme")).await.unwrap();
    let alice = store.insert_user(user(Some(acme.id))).await.unwrap();

    let found = store.find_user_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(found.username, alice.username);
    assert_eq!(found.email, alice.email);
    assert_eq!(found.company, Some(acme.id));
    assert_eq!(found.password_hash.as_str(), "$argon2id$stub");

    let by_name = store.find_user_by_username(&alice.username).await.unwrap();
    assert_eq!(by_name.map(|u| u.id), Some(alice.id));

    let mut changed = found.clone();
    changed.role = Role::Admin;
    let updated = store.update_user(changed).await.unwrap();
    assert_eq!(updated.role, Role::Admin);

    let listed = store.list_users(UserFilter::Company(acme.id)).await.unwrap();
    assert_eq!(listed.iter().map(|u| u.id).collect::<Vec<_>>(), vec![alice.id]);

    store.delete_user(alice.id).await.unwrap();
    assert_eq!(store.delete_user(alice.id).await, Err(StoreError::NotFound));
}

#[tokio::test]
async fn unique_fields_conflict() {
    let Some(store) = store().await else { return };

    let first = store.insert_user(user(None)).await.unwrap();

    let mut same_username = user(None);
    same_username.username = first.username.clone();
    assert_eq!(
        store.insert_user(same_username).await,
        Err(StoreError::Conflict(Field::Username))
    );

    let mut same_email = user(None);
    same_email.email = first.email.clone();
    assert_eq!(
        store.insert_user(same_email).await,
        Err(StoreError::Conflict(Field::Email))
    );

    let acme = store.insert_company(company("Acme")).await.unwrap();
    let twin = Company::new(acme.name.clone());
    assert_eq!(
        store.insert_company(twin).await,
        Err(StoreError::Conflict(Field::CompanyName))
    );

    assert_eq!(
        store.insert_user(user(Some(CompanyId::new()))).await,
        Err(StoreError::NotFound)
    );
}

#[tokio::test]
async fn deleting_a_company_removes_its_users() {
    let Some(store) = store().await else { return };

    let doomed = store.insert_company(company("Doomed")).await.unwrap();
    let kept = store.insert_company(company("Kept")).await.unwrap();
    let gone = store.insert_user(user(Some(doomed.id))).await.unwrap();
    let stays = store.insert_user(user(Some(kept.id))).await.unwrap();

    store.delete_company(doomed.id).await.unwrap();

    assert!(store.find_company_by_id(doomed.id).await.unwrap().is_none());
    assert!(store.find_user_by_id(gone.id).await.unwrap().is_none());
    assert!(store.find_user_by_id(stays.id).await.unwrap().is_some());
    assert_eq!(store.delete_company(doomed.id).await, Err(StoreError::NotFound));
}
