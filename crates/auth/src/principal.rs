use serde::{Deserialize, Serialize};

use roster_core::{CompanyId, UserId};

use crate::Role;

/// The authenticated identity performing an operation.
///
/// Resolved upstream (token, session, ...); this crate never authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub company: Option<CompanyId>,
    pub is_superuser: bool,
}

impl Actor {
    /// A company member with the given role.
    pub fn member(id: UserId, company: CompanyId, role: Role) -> Self {
        Self {
            id,
            role,
            company: Some(company),
            is_superuser: false,
        }
    }

    /// A platform superuser (company optional).
    pub fn superuser(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
            company: None,
            is_superuser: true,
        }
    }

    pub fn is_company_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether `company` is the actor's own company. No company matches nothing.
    pub fn belongs_to(&self, company: Option<CompanyId>) -> bool {
        self.company.is_some() && self.company == company
    }
}

/// The slice of a user record that authorization looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: UserId,
    pub company: Option<CompanyId>,
}

impl Target {
    pub fn new(id: UserId, company: Option<CompanyId>) -> Self {
        Self { id, company }
    }
}
