use tracing::instrument;

use roster_core::TeamMemberId;
use roster_identity::{TeamMember, TeamMemberInput};

use super::{CallContext, cancellable};
use crate::error::ServiceError;
use crate::store::IdentityStore;

/// Internal team directory. Any authenticated actor may manage it; the
/// context only supplies identity for logs and the cancellation token.
pub struct TeamDirectory<S> {
    store: S,
}

impl<S: IdentityStore> TeamDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<TeamMember>, ServiceError> {
        cancellable(&ctx.cancel, self.store.list_team_members()).await
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, member_id = %id), err)]
    pub async fn get(&self, ctx: &CallContext, id: TeamMemberId) -> Result<TeamMember, ServiceError> {
        cancellable(&ctx.cancel, self.store.find_team_member(id))
            .await?
            .ok_or(ServiceError::NotFound)
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn create(&self, ctx: &CallContext, input: TeamMemberInput) -> Result<TeamMember, ServiceError> {
        let member = input.into_member(TeamMemberId::new())?;
        let member = cancellable(&ctx.cancel, self.store.insert_team_member(member)).await?;
        tracing::info!(member_id = %member.id, "team member added");
        Ok(member)
    }

    /// Replaces every field of an existing member.
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, member_id = %id), err)]
    pub async fn update(
        &self,
        ctx: &CallContext,
        id: TeamMemberId,
        input: TeamMemberInput,
    ) -> Result<TeamMember, ServiceError> {
        let member = input.into_member(id)?;
        cancellable(&ctx.cancel, self.store.update_team_member(member)).await
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, member_id = %id), err)]
    pub async fn delete(&self, ctx: &CallContext, id: TeamMemberId) -> Result<(), ServiceError> {
        cancellable(&ctx.cancel, self.store.delete_team_member(id)).await?;
        tracing::info!(member_id = %id, "team member removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use roster_auth::Role;
    use roster_core::{Field, ValidationKind};

    use super::*;
    use crate::services::fixtures::world;

    fn input(first_name: &str) -> TeamMemberInput {
        TeamMemberInput {
            first_name: first_name.into(),
            last_name: "Doe".into(),
            phone_number: "1234567890".into(),
            email: "john@example.com".into(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn any_actor_manages_the_directory() {
        let world = world().await;
        let team = TeamDirectory::new(world.store.clone());
        let ctx = CallContext::detached(world.acme_regular.actor());

        let john = team.create(&ctx, input("John")).await.unwrap();
        assert_eq!(team.get(&ctx, john.id).await.unwrap(), john);

        let renamed = team.update(&ctx, john.id, input("Johnny")).await.unwrap();
        assert_eq!(renamed.first_name.as_str(), "Johnny");
        assert_eq!(team.list(&ctx).await.unwrap(), vec![renamed]);

        team.delete(&ctx, john.id).await.unwrap();
        assert_eq!(team.get(&ctx, john.id).await, Err(ServiceError::NotFound));
    }

    #[tokio::test]
    async fn invalid_fields_and_missing_members() {
        let world = world().await;
        let team = TeamDirectory::new(world.store.clone());
        let ctx = CallContext::detached(world.superuser.actor());

        assert_eq!(
            team.create(&ctx, input("")).await,
            Err(ServiceError::Validation {
                field: Field::FirstName,
                kind: ValidationKind::Empty
            })
        );
        assert_eq!(
            team.update(&ctx, TeamMemberId::new(), input("Ghost")).await,
            Err(ServiceError::NotFound)
        );
    }
}
