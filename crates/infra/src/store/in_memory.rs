use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use roster_core::{CompanyId, Email, Entity, Field, TeamMemberId, UserId, Username};
use roster_identity::{Company, TeamMember, User};

use super::r#trait::{IdentityStore, StoreError, StoreResult, UserFilter};

fn by_id<E: Entity + Clone>(records: &[E], id: &E::Id) -> Option<E> {
    records.iter().find(|r| r.id() == id).cloned()
}

fn index_of<E: Entity>(records: &[E], id: &E::Id) -> StoreResult<usize> {
    records
        .iter()
        .position(|r| r.id() == id)
        .ok_or(StoreError::NotFound)
}

#[derive(Debug, Default)]
struct State {
    companies: Vec<Company>,
    users: Vec<User>,
    team: Vec<TeamMember>,
}

impl State {
    fn company_exists(&self, id: CompanyId) -> bool {
        self.companies.iter().any(|c| c.id == id)
    }

    /// First unique field of `user` already taken by a different record.
    fn user_conflict(&self, user: &User) -> Option<Field> {
        let others = self.users.iter().filter(|u| u.id != user.id);
        for other in others {
            if other.username == user.username {
                return Some(Field::Username);
            }
            if other.email == user.email {
                return Some(Field::Email);
            }
        }
        None
    }

    fn check_user_write(&self, user: &User) -> StoreResult<()> {
        if let Some(field) = self.user_conflict(user) {
            return Err(StoreError::Conflict(field));
        }
        match user.company {
            Some(company) if !self.company_exists(company) => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    fn company_name_taken(&self, company: &Company) -> bool {
        self.companies
            .iter()
            .any(|c| c.id != company.id && c.name == company.name)
    }
}

/// In-memory identity store.
///
/// Intended for tests/dev. Every mutation validates and writes under one
/// write lock, so uniqueness checks cannot race.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    state: RwLock<State>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let state = self.read()?;
        Ok(by_id(&state.users, &id))
    }

    async fn find_user_by_username(&self, username: &Username) -> StoreResult<Option<User>> {
        let state = self.read()?;
        Ok(state.users.iter().find(|u| &u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        let state = self.read()?;
        Ok(state.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn list_users(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let state = self.read()?;
        Ok(state
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.write()?;
        if by_id(&state.users, &user.id).is_some() {
            return Err(StoreError::Backend(format!("duplicate user id {}", user.id)));
        }
        state.check_user_write(&user)?;
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> StoreResult<User> {
        let mut state = self.write()?;
        let idx = index_of(&state.users, &user.id)?;
        // Usernames are immutable.
        user.username = state.users[idx].username.clone();
        state.check_user_write(&user)?;
        state.users[idx] = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        let idx = index_of(&state.users, &id)?;
        state.users.remove(idx);
        Ok(())
    }

    async fn insert_company(&self, company: Company) -> StoreResult<Company> {
        let mut state = self.write()?;
        if state.company_exists(company.id) {
            return Err(StoreError::Backend(format!("duplicate company id {}", company.id)));
        }
        if state.company_name_taken(&company) {
            return Err(StoreError::Conflict(Field::CompanyName));
        }
        state.companies.push(company.clone());
        Ok(company)
    }

    async fn update_company(&self, company: Company) -> StoreResult<Company> {
        let mut state = self.write()?;
        let idx = index_of(&state.companies, &company.id)?;
        if state.company_name_taken(&company) {
            return Err(StoreError::Conflict(Field::CompanyName));
        }
        state.companies[idx] = company.clone();
        Ok(company)
    }

    async fn find_company_by_id(&self, id: CompanyId) -> StoreResult<Option<Company>> {
        let state = self.read()?;
        Ok(by_id(&state.companies, &id))
    }

    async fn list_companies(&self) -> StoreResult<Vec<Company>> {
        Ok(self.read()?.companies.clone())
    }

    async fn delete_company(&self, id: CompanyId) -> StoreResult<()> {
        let mut state = self.write()?;
        let idx = index_of(&state.companies, &id)?;
        state.companies.remove(idx);
        state.users.retain(|u| u.company != Some(id));
        Ok(())
    }

    async fn insert_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        let mut state = self.write()?;
        if index_of(&state.team, &member.id).is_ok() {
            return Err(StoreError::Backend(format!("duplicate team member id {}", member.id)));
        }
        state.team.push(member.clone());
        Ok(member)
    }

    async fn update_team_member(&self, member: TeamMember) -> StoreResult<TeamMember> {
        let mut state = self.write()?;
        let idx = index_of(&state.team, &member.id)?;
        state.team[idx] = member.clone();
        Ok(member)
    }

    async fn find_team_member(&self, id: TeamMemberId) -> StoreResult<Option<TeamMember>> {
        let state = self.read()?;
        Ok(by_id(&state.team, &id))
    }

    async fn list_team_members(&self) -> StoreResult<Vec<TeamMember>> {
        Ok(self.read()?.team.clone())
    }

    async fn delete_team_member(&self, id: TeamMemberId) -> StoreResult<()> {
        let mut state = self.write()?;
        let idx = index_of(&state.team, &id)?;
        state.team.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use roster_auth::{PasswordHash, Role};
    use roster_core::{CompanyName, PersonName};

    pub(crate) fn user_named(username: &str, company: Option<CompanyId>) -> User {
        User {
            id: UserId::new(),
            username: Username::parse(username).unwrap(),
            email: Email::parse(&format!("{username}@example.com")).unwrap(),
            password_hash: PasswordHash::from_stored("$argon2id$stub"),
            first_name: PersonName::parse(Field::FirstName, "Test").unwrap(),
            last_name: PersonName::parse(Field::LastName, username).unwrap(),
            phone_number: None,
            role: Role::Regular,
            company,
            is_superuser: false,
            date_joined: chrono::Utc::now(),
        }
    }

    fn company(name: &str) -> Company {
        Company::new(CompanyName::parse(name).unwrap())
    }

    #[tokio::test]
    async fn finders_return_none_on_miss() {
        let store = InMemoryIdentityStore::new();
        assert!(store.find_user_by_id(UserId::new()).await.unwrap().is_none());
        assert!(store
            .find_user_by_username(&Username::parse("ghost").unwrap())
            .await
            .unwrap()
            .is_none());
        assert!(store.find_company_by_id(CompanyId::new()).await.unwrap().is_none());
        assert!(store.find_team_member(TeamMemberId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mutations_on_missing_records_are_not_found() {
        let store = InMemoryIdentityStore::new();
        assert_eq!(
            store.update_user(user_named("ghost", None)).await,
            Err(StoreError::NotFound)
        );
        assert_eq!(store.delete_user(UserId::new()).await, Err(StoreError::NotFound));
        assert_eq!(store.delete_company(CompanyId::new()).await, Err(StoreError::NotFound));
        assert_eq!(
            store.delete_team_member(TeamMemberId::new()).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn username_and_email_are_unique() {
        let store = InMemoryIdentityStore::new();
        store.insert_user(user_named("alice", None)).await.unwrap();

        assert_eq!(
            store.insert_user(user_named("alice", None)).await,
            Err(StoreError::Conflict(Field::Username))
        );

        let mut sneaky = user_named("bob", None);
        sneaky.email = Email::parse("ALICE@example.com").unwrap();
        assert_eq!(
            store.insert_user(sneaky).await,
            Err(StoreError::Conflict(Field::Email))
        );
        assert_eq!(store.list_users(UserFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn user_must_reference_existing_company() {
        let store = InMemoryIdentityStore::new();
        assert_eq!(
            store.insert_user(user_named("orphan", Some(CompanyId::new()))).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn listing_keeps_insertion_order_and_filters() {
        let store = InMemoryIdentityStore::new();
        let acme = store.insert_company(company("Acme")).await.unwrap();
        let names = ["carol", "dave", "erin"];
        for name in names {
            store.insert_user(user_named(name, Some(acme.id))).await.unwrap();
        }
        store.insert_user(user_named("frank", None)).await.unwrap();

        let listed: Vec<String> = store
            .list_users(UserFilter::Company(acme.id))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username.into_inner())
            .collect();
        assert_eq!(listed, names);
        assert_eq!(store.list_users(UserFilter::All).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn deleting_company_cascades_to_users() {
        let store = InMemoryIdentityStore::new();
        let acme = store.insert_company(company("Acme")).await.unwrap();
        let other = store.insert_company(company("Globex")).await.unwrap();
        store.insert_user(user_named("gina", Some(acme.id))).await.unwrap();
        store.insert_user(user_named("hank", Some(other.id))).await.unwrap();

        store.delete_company(acme.id).await.unwrap();

        assert!(store.list_users(UserFilter::Company(acme.id)).await.unwrap().is_empty());
        assert_eq!(store.list_users(UserFilter::All).await.unwrap().len(), 1);
        assert!(store.find_company_by_id(acme.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn company_names_are_unique() {
        let store = InMemoryIdentityStore::new();
        store.insert_company(company("Acme")).await.unwrap();
        assert_eq!(
            store.insert_company(company("Acme")).await,
            Err(StoreError::Conflict(Field::CompanyName))
        );

        let mut globex = store.insert_company(company("Globex")).await.unwrap();
        globex.rename(CompanyName::parse("Acme").unwrap());
        assert_eq!(
            store.update_company(globex).await,
            Err(StoreError::Conflict(Field::CompanyName))
        );
    }
}
