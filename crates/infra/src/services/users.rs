//! User lifecycle: registration, delegated creation, profile updates,
//! password changes, deletion and listing.

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use roster_auth::{Action, Actor, CredentialHasher, Target, authorize};
use roster_core::{CompanyId, Field, Password, UserId, Username};
use roster_identity::{NewUser, RegisterUser, User, UserDraft, UserPatch};

use super::{CallContext, cancellable, enforce};
use crate::error::ServiceError;
use crate::store::{IdentityStore, UserFilter};
use crate::username::UsernameGenerator;

fn require(actor: &Actor, action: Action, target: Option<&Target>) -> Result<(), ServiceError> {
    enforce(actor, action, authorize(actor, action, target))
}

/// Orchestrates user records over an [`IdentityStore`] and a
/// [`CredentialHasher`].
///
/// Stateless apart from its collaborators; share it behind an `Arc`.
pub struct UserService<S, H> {
    store: S,
    hasher: H,
    usernames: UsernameGenerator,
}

impl<S, H> UserService<S, H>
where
    S: IdentityStore,
    H: CredentialHasher,
{
    pub fn new(store: S, hasher: H, usernames: UsernameGenerator) -> Self {
        Self {
            store,
            hasher,
            usernames,
        }
    }

    /// Self-registration. The new user is a regular user without company.
    #[instrument(skip_all, err)]
    pub async fn register(&self, cancel: &CancellationToken, input: RegisterUser) -> Result<User, ServiceError> {
        let draft = input.validate()?;
        let user = self.create(cancel, draft).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Creation by a company admin (inside their own company) or a superuser
    /// (inside any existing company, or none).
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn create_within_company(&self, ctx: &CallContext, input: NewUser) -> Result<User, ServiceError> {
        let actor = &ctx.actor;
        require(actor, Action::Create, None)?;

        let mut draft = input.validate()?;
        if actor.is_superuser {
            if let Some(company) = draft.company {
                self.ensure_company(&ctx.cancel, company).await?;
            }
        } else {
            draft.company = actor.company;
        }

        let user = self.create(&ctx.cancel, draft).await?;
        tracing::info!(
            actor_id = %actor.id,
            user_id = %user.id,
            company_id = ?user.company,
            "user created"
        );
        Ok(user)
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, user_id = %id), err)]
    pub async fn get(&self, ctx: &CallContext, id: UserId) -> Result<User, ServiceError> {
        let user = self.load(&ctx.cancel, id).await?;
        require(&ctx.actor, Action::Read, Some(&user.target()))?;
        Ok(user)
    }

    /// Apply a partial update, all or nothing.
    ///
    /// Editing oneself needs `UpdateOwnProfile`, anyone else `Update`. A role
    /// that differs from the current one also needs `UpdateRole`, a company
    /// that differs needs `ReassignCompany`.
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, user_id = %target_id), err)]
    pub async fn update_profile(
        &self,
        ctx: &CallContext,
        target_id: UserId,
        patch: UserPatch,
    ) -> Result<User, ServiceError> {
        let actor = &ctx.actor;
        let mut user = self.load(&ctx.cancel, target_id).await?;
        let target = user.target();

        let base = if actor.id == user.id {
            Action::UpdateOwnProfile
        } else {
            Action::Update
        };
        require(actor, base, Some(&target))?;

        let patch = patch.validate()?;
        if patch.changes_role(&user) {
            require(actor, Action::UpdateRole, Some(&target))?;
        }
        if patch.changes_company(&user) {
            require(actor, Action::ReassignCompany, Some(&target))?;
            if let Some(Some(company)) = patch.company {
                self.ensure_company(&ctx.cancel, company).await?;
            }
        }
        if let Some(email) = patch.new_email(&user) {
            let holder = cancellable(&ctx.cancel, self.store.find_user_by_email(email)).await?;
            if holder.is_some_and(|other| other.id != user.id) {
                return Err(ServiceError::duplicate(Field::Email));
            }
        }

        if patch.is_empty() {
            return Ok(user);
        }

        user.apply(patch);
        let user = cancellable(&ctx.cancel, self.store.update_user(user)).await?;
        tracing::info!(actor_id = %actor.id, user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Replace a user's password. Trusted path: no actor, no policy check.
    #[instrument(skip_all, fields(user_id = %target_id), err)]
    pub async fn set_password(
        &self,
        cancel: &CancellationToken,
        target_id: UserId,
        plaintext: &str,
    ) -> Result<(), ServiceError> {
        let password = Password::parse(plaintext)?;
        let mut user = self.load(cancel, target_id).await?;
        user.password_hash = self.hasher.hash(&password)?;
        cancellable(cancel, self.store.update_user(user)).await?;
        tracing::info!(user_id = %target_id, "password set");
        Ok(())
    }

    /// The actor changes their own password after proving the current one.
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn change_password(&self, ctx: &CallContext, current: &str, new: &str) -> Result<(), ServiceError> {
        let mut user = self.load(&ctx.cancel, ctx.actor.id).await?;
        if !self.hasher.verify(current, &user.password_hash) {
            tracing::info!(user_id = %user.id, "password change rejected");
            return Err(ServiceError::invalid_credentials());
        }
        let password = Password::parse(new)?;
        user.password_hash = self.hasher.hash(&password)?;
        cancellable(&ctx.cancel, self.store.update_user(user)).await?;
        tracing::info!(user_id = %ctx.actor.id, "password changed");
        Ok(())
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, user_id = %target_id), err)]
    pub async fn delete(&self, ctx: &CallContext, target_id: UserId) -> Result<(), ServiceError> {
        let user = self.load(&ctx.cancel, target_id).await?;
        require(&ctx.actor, Action::Delete, Some(&user.target()))?;
        cancellable(&ctx.cancel, self.store.delete_user(target_id)).await?;
        tracing::info!(actor_id = %ctx.actor.id, user_id = %target_id, "user deleted");
        Ok(())
    }

    /// Users visible to the actor, in store order.
    ///
    /// Superusers see everyone, members see their company, and an actor
    /// without company sees only themselves.
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<User>, ServiceError> {
        let actor = &ctx.actor;
        require(actor, Action::List, None)?;

        if actor.is_superuser {
            return cancellable(&ctx.cancel, self.store.list_users(UserFilter::All)).await;
        }
        match actor.company {
            Some(company) => {
                cancellable(&ctx.cancel, self.store.list_users(UserFilter::Company(company))).await
            }
            None => {
                let me = cancellable(&ctx.cancel, self.store.find_user_by_id(actor.id)).await?;
                Ok(me.into_iter().collect())
            }
        }
    }

    /// Check a username/password pair. Unknown usernames and wrong passwords
    /// are indistinguishable to the caller.
    #[instrument(skip_all, err)]
    pub async fn verify_credentials(
        &self,
        cancel: &CancellationToken,
        username: &str,
        plaintext: &str,
    ) -> Result<User, ServiceError> {
        let Ok(username) = Username::parse(username) else {
            return Err(ServiceError::invalid_credentials());
        };
        let user = cancellable(cancel, self.store.find_user_by_username(&username)).await?;
        match user {
            Some(user) if self.hasher.verify(plaintext, &user.password_hash) => Ok(user),
            _ => {
                tracing::info!(username = %username, "credential check failed");
                Err(ServiceError::invalid_credentials())
            }
        }
    }

    async fn load(&self, cancel: &CancellationToken, id: UserId) -> Result<User, ServiceError> {
        cancellable(cancel, self.store.find_user_by_id(id))
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn ensure_company(&self, cancel: &CancellationToken, id: CompanyId) -> Result<(), ServiceError> {
        cancellable(cancel, self.store.find_company_by_id(id))
            .await?
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    async fn generate_username(&self, cancel: &CancellationToken) -> Result<Username, ServiceError> {
        cancellable(cancel, self.usernames.generate_unique(&self.store)).await
    }

    /// Shared tail of `register` and `create_within_company`.
    async fn create(&self, cancel: &CancellationToken, draft: UserDraft) -> Result<User, ServiceError> {
        if cancellable(cancel, self.store.find_user_by_email(&draft.email))
            .await?
            .is_some()
        {
            return Err(ServiceError::duplicate(Field::Email));
        }

        let (username, generated) = match draft.username.clone() {
            Some(username) => {
                if cancellable(cancel, self.store.find_user_by_username(&username))
                    .await?
                    .is_some()
                {
                    return Err(ServiceError::duplicate(Field::Username));
                }
                (username, false)
            }
            None => (self.generate_username(cancel).await?, true),
        };

        let password_hash = self.hasher.hash(&draft.password)?;
        let mut user = draft.into_user(username, password_hash);

        match cancellable(cancel, self.store.insert_user(user.clone())).await {
            Err(ServiceError::Conflict(Field::Username)) if generated => {
                tracing::debug!(username = %user.username, "generated username taken concurrently; retrying");
                user.username = self.generate_username(cancel).await?;
                cancellable(cancel, self.store.insert_user(user)).await
            }
            result => result,
        }
    }
}
