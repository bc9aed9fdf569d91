//! Lifecycle services.
//!
//! Every operation authorizes and validates first, then performs a single
//! mutating store call. Store calls race the caller's cancellation token.

pub mod companies;
pub mod team;
pub mod users;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use roster_auth::{Action, Actor, Decision};

use crate::error::ServiceError;

pub use companies::CompanyService;
pub use team::TeamDirectory;
pub use users::UserService;

/// Per-call context: who is asking, and how to stop asking.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub actor: Actor,
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(actor: Actor, cancel: CancellationToken) -> Self {
        Self { actor, cancel }
    }

    /// A context whose token is never cancelled by anyone else.
    pub fn detached(actor: Actor) -> Self {
        Self::new(actor, CancellationToken::new())
    }
}

/// Turn a policy decision into a result, logging denials.
pub(crate) fn enforce(actor: &Actor, action: Action, decision: Decision) -> Result<(), ServiceError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::info!(
                actor_id = %actor.id,
                action = %action,
                reason = %reason,
                "authorization denied"
            );
            Err(ServiceError::unauthorized(action))
        }
    }
}

/// Run `op` unless `cancel` fires first.
///
/// An already-cancelled token fails before `op` is polled. When the token
/// wins the race the in-flight future is dropped.
pub(crate) async fn cancellable<F, T, E>(cancel: &CancellationToken, op: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ServiceError>,
{
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ServiceError::Cancelled),
        result = op => result.map_err(Into::into),
    }
}
