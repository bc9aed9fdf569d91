use serde::{Deserialize, Serialize};

use roster_auth::Role;
use roster_core::{DomainResult, Email, Entity, Field, PersonName, PhoneNumber, TeamMemberId};

/// Entry in the internal team directory.
///
/// Not a login: no credentials and no company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub phone_number: PhoneNumber,
    pub email: Email,
    pub role: Role,
}

impl TeamMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for TeamMember {
    type Id = TeamMemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Full field set for creating or replacing a team member.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamMemberInput {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl TeamMemberInput {
    pub fn into_member(self, id: TeamMemberId) -> DomainResult<TeamMember> {
        Ok(TeamMember {
            id,
            first_name: PersonName::parse_required(Field::FirstName, &self.first_name)?,
            last_name: PersonName::parse_required(Field::LastName, &self.last_name)?,
            phone_number: PhoneNumber::parse(&self.phone_number)?,
            email: Email::parse(&self.email)?,
            role: self.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{DomainError, ValidationKind};

    fn input() -> TeamMemberInput {
        TeamMemberInput {
            first_name: "John".into(),
            last_name: "Doe".into(),
            phone_number: "1234567890".into(),
            email: "john@example.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn valid_input_builds_member() {
        let id = TeamMemberId::new();
        let member = input().into_member(id).unwrap();
        assert_eq!(member.id, id);
        assert_eq!(member.full_name(), "John Doe");
        assert_eq!(member.role, Role::Admin);
    }

    #[test]
    fn names_and_phone_are_required() {
        let err = TeamMemberInput {
            last_name: String::new(),
            ..input()
        }
        .into_member(TeamMemberId::new())
        .unwrap_err();
        assert_eq!(err, DomainError::validation(Field::LastName, ValidationKind::Empty));

        let err = TeamMemberInput {
            phone_number: String::new(),
            ..input()
        }
        .into_member(TeamMemberId::new())
        .unwrap_err();
        assert_eq!(err.field(), Some(Field::PhoneNumber));
    }

    #[test]
    fn role_defaults_to_regular() {
        let input: TeamMemberInput = serde_json::from_str(
            r#"{"first_name":"Jane","last_name":"Roe","phone_number":"+12345678901","email":"jane@example.com"}"#,
        )
        .unwrap();
        assert_eq!(input.role, Role::Regular);
    }
}
