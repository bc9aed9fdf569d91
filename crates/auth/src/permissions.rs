use serde::{Deserialize, Serialize};

/// Action an actor attempts on user (or company) records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Create,
    Read,
    Update,
    Delete,
    UpdateOwnProfile,
    UpdateRole,
    /// Moving a user to another company (or out of one).
    ReassignCompany,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::List,
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::UpdateOwnProfile,
        Action::UpdateRole,
        Action::ReassignCompany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::UpdateOwnProfile => "update_own_profile",
            Action::UpdateRole => "update_role",
            Action::ReassignCompany => "reassign_company",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
