use serde::Serialize;
use thiserror::Error;

use roster_core::CompanyId;

use crate::{Action, Actor, Target};

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// An object-level action was evaluated without a target record.
    MissingTarget,
    /// The action needs the company admin role.
    NotAdmin,
    /// The target belongs to a company other than the actor's.
    OtherCompany,
    /// Only the record's own user may do this.
    NotSelf,
    /// Only platform superusers may do this.
    SuperuserOnly,
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DenyReason::MissingTarget => "missing_target",
            DenyReason::NotAdmin => "not_admin",
            DenyReason::OtherCompany => "other_company",
            DenyReason::NotSelf => "not_self",
            DenyReason::SuperuserOnly => "superuser_only",
        })
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "reason")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self, action: Action) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AuthzError::Denied { action, reason }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {action} ({reason})")]
    Denied { action: Action, reason: DenyReason },
}

impl AuthzError {
    pub fn action(&self) -> Action {
        match self {
            AuthzError::Denied { action, .. } => *action,
        }
    }
}

/// Which row of the decision table produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMatched {
    Superuser,
    ListAlways,
    CreateByAdmin,
    SelfAccess,
    SameCompanyMember,
    SameCompanyAdmin,
    NoMatch,
}

/// Decide whether `actor` may perform `action` on `target`.
///
/// - No IO
/// - No panics
/// - Rules apply in fixed precedence: superuser, list, create, object-level, deny
pub fn authorize(actor: &Actor, action: Action, target: Option<&Target>) -> Decision {
    evaluate(actor, action, target).1
}

fn evaluate(actor: &Actor, action: Action, target: Option<&Target>) -> (RuleMatched, Decision) {
    if actor.is_superuser {
        return (RuleMatched::Superuser, Decision::Allow);
    }

    match action {
        // Visible-set filtering is the caller's job.
        Action::List => (RuleMatched::ListAlways, Decision::Allow),
        Action::Create => {
            if actor.is_company_admin() {
                (RuleMatched::CreateByAdmin, Decision::Allow)
            } else {
                (RuleMatched::NoMatch, Decision::Deny(DenyReason::NotAdmin))
            }
        }
        Action::ReassignCompany => (RuleMatched::NoMatch, Decision::Deny(DenyReason::SuperuserOnly)),
        Action::Read
        | Action::Update
        | Action::Delete
        | Action::UpdateRole
        | Action::UpdateOwnProfile => match target {
            Some(target) => object_level(actor, action, target),
            None => (RuleMatched::NoMatch, Decision::Deny(DenyReason::MissingTarget)),
        },
    }
}

fn object_level(actor: &Actor, action: Action, target: &Target) -> (RuleMatched, Decision) {
    let is_self = actor.id == target.id;
    let same_company = actor.belongs_to(target.company);

    match action {
        Action::Read if is_self => (RuleMatched::SelfAccess, Decision::Allow),
        Action::Read if same_company => (RuleMatched::SameCompanyMember, Decision::Allow),
        Action::Read => (RuleMatched::NoMatch, Decision::Deny(DenyReason::OtherCompany)),

        Action::UpdateOwnProfile if is_self => (RuleMatched::SelfAccess, Decision::Allow),
        Action::UpdateOwnProfile => (RuleMatched::NoMatch, Decision::Deny(DenyReason::NotSelf)),

        // UpdateRole is held to the same bar as Update/Delete; being the
        // target does not help a non-admin.
        Action::Update | Action::Delete | Action::UpdateRole => {
            if !actor.is_company_admin() {
                (RuleMatched::NoMatch, Decision::Deny(DenyReason::NotAdmin))
            } else if same_company {
                (RuleMatched::SameCompanyAdmin, Decision::Allow)
            } else {
                (RuleMatched::NoMatch, Decision::Deny(DenyReason::OtherCompany))
            }
        }

        Action::List | Action::Create | Action::ReassignCompany => {
            (RuleMatched::NoMatch, Decision::Deny(DenyReason::SuperuserOnly))
        }
    }
}

/// Decide whether `actor` may perform `action` on a company record.
///
/// Companies are platform-managed: superusers do everything, members may
/// read their own company, listing is filtered by the caller.
pub fn authorize_company(actor: &Actor, action: Action, company: Option<CompanyId>) -> Decision {
    if actor.is_superuser {
        return Decision::Allow;
    }
    match action {
        Action::List => Decision::Allow,
        Action::Read if actor.belongs_to(company) => Decision::Allow,
        Action::Read => Decision::Deny(DenyReason::OtherCompany),
        _ => Decision::Deny(DenyReason::SuperuserOnly),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Structured account of an authorization decision.
///
/// Carries tags only, so the transport can render or log it as it likes.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub granted: bool,
    pub rule: RuleMatched,
    pub denial: Option<DenyReason>,
    pub actor: Actor,
    pub target: Option<Target>,
    pub same_company: bool,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(
    actor: &Actor,
    action: Action,
    target: Option<&Target>,
) -> AuthorizationExplanation {
    let (rule, decision) = evaluate(actor, action, target);
    AuthorizationExplanation {
        action,
        granted: decision.is_allowed(),
        rule,
        denial: match decision {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason),
        },
        actor: *actor,
        target: target.copied(),
        same_company: target.is_some_and(|t| actor.belongs_to(t.company)),
    }
}
