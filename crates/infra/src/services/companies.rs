use tracing::instrument;

use roster_auth::{Action, authorize_company};
use roster_core::{CompanyId, CompanyName};
use roster_identity::Company;

use super::{CallContext, cancellable, enforce};
use crate::error::ServiceError;
use crate::store::IdentityStore;

/// Company administration. Mutations are reserved to superusers.
pub struct CompanyService<S> {
    store: S,
}

impl<S: IdentityStore> CompanyService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn create(&self, ctx: &CallContext, name: &str) -> Result<Company, ServiceError> {
        let actor = &ctx.actor;
        enforce(actor, Action::Create, authorize_company(actor, Action::Create, None))?;

        let company = Company::new(CompanyName::parse(name)?);
        let company = cancellable(&ctx.cancel, self.store.insert_company(company)).await?;
        tracing::info!(company_id = %company.id, "company created");
        Ok(company)
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, company_id = %id), err)]
    pub async fn rename(&self, ctx: &CallContext, id: CompanyId, name: &str) -> Result<Company, ServiceError> {
        let actor = &ctx.actor;
        enforce(actor, Action::Update, authorize_company(actor, Action::Update, Some(id)))?;

        let name = CompanyName::parse(name)?;
        let mut company = self.load(ctx, id).await?;
        company.rename(name);
        let company = cancellable(&ctx.cancel, self.store.update_company(company)).await?;
        tracing::info!(company_id = %company.id, "company renamed");
        Ok(company)
    }

    /// Removes the company and, in the same store transaction, its users.
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, company_id = %id), err)]
    pub async fn delete(&self, ctx: &CallContext, id: CompanyId) -> Result<(), ServiceError> {
        let actor = &ctx.actor;
        enforce(actor, Action::Delete, authorize_company(actor, Action::Delete, Some(id)))?;

        cancellable(&ctx.cancel, self.store.delete_company(id)).await?;
        tracing::info!(company_id = %id, "company deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(actor_id = %ctx.actor.id, company_id = %id), err)]
    pub async fn get(&self, ctx: &CallContext, id: CompanyId) -> Result<Company, ServiceError> {
        let actor = &ctx.actor;
        enforce(actor, Action::Read, authorize_company(actor, Action::Read, Some(id)))?;
        self.load(ctx, id).await
    }

    /// All companies for superusers, otherwise the actor's own (if any).
    #[instrument(skip_all, fields(actor_id = %ctx.actor.id), err)]
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<Company>, ServiceError> {
        let actor = &ctx.actor;
        enforce(actor, Action::List, authorize_company(actor, Action::List, None))?;

        if actor.is_superuser {
            return cancellable(&ctx.cancel, self.store.list_companies()).await;
        }
        match actor.company {
            Some(id) => {
                let own = cancellable(&ctx.cancel, self.store.find_company_by_id(id)).await?;
                Ok(own.into_iter().collect())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn load(&self, ctx: &CallContext, id: CompanyId) -> Result<Company, ServiceError> {
        cancellable(&ctx.cancel, self.store.find_company_by_id(id))
            .await?
            .ok_or(ServiceError::NotFound)
    }
}
