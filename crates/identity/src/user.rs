use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use roster_auth::{Actor, PasswordHash, Role, Target};
use roster_core::{
    CompanyId, DomainResult, Email, Entity, Field, Password, PersonName, PhoneNumber, UserId,
    Username,
};

/// A login-capable user record.
///
/// `username` is assigned once at creation; nothing in this crate offers a
/// way to change it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub phone_number: Option<PhoneNumber>,
    pub role: Role,
    pub company: Option<CompanyId>,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn is_company_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// This user acting on their own behalf.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            company: self.company,
            is_superuser: self.is_superuser,
        }
    }

    /// This user as the subject of an authorization check.
    pub fn target(&self) -> Target {
        Target::new(self.id, self.company)
    }

    /// Apply an already validated and authorized patch.
    pub fn apply(&mut self, patch: ValidatedPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.company {
            Some(company) => write!(f, "{} ({company})", self.full_name()),
            None => write!(f, "{} (none)", self.full_name()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Creation inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Self-registration request. Carries no role or company: both are fixed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUser {
    /// Absent or blank means "generate one".
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
}

impl RegisterUser {
    pub fn validate(self) -> DomainResult<UserDraft> {
        UserDraft::parse(
            self.username.as_deref(),
            &self.email,
            &self.password,
            &self.first_name,
            &self.last_name,
            &self.phone_number,
            Role::Regular,
            None,
        )
    }
}

/// Delegated creation by a company admin or superuser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub role: Role,
    /// Honoured for superusers only.
    #[serde(default)]
    pub company: Option<CompanyId>,
}

impl NewUser {
    pub fn validate(self) -> DomainResult<UserDraft> {
        UserDraft::parse(
            self.username.as_deref(),
            &self.email,
            &self.password,
            &self.first_name,
            &self.last_name,
            &self.phone_number,
            self.role,
            self.company,
        )
    }
}

/// A validated creation request still waiting for its username and hash.
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub username: Option<Username>,
    pub email: Email,
    pub password: Password,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub phone_number: Option<PhoneNumber>,
    pub role: Role,
    pub company: Option<CompanyId>,
}

impl UserDraft {
    #[allow(clippy::too_many_arguments)]
    fn parse(
        username: Option<&str>,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        phone_number: &str,
        role: Role,
        company: Option<CompanyId>,
    ) -> DomainResult<Self> {
        let username = match username {
            Some(raw) if !raw.trim().is_empty() => Some(Username::parse(raw)?),
            _ => None,
        };
        Ok(Self {
            username,
            email: Email::parse(email)?,
            password: Password::parse(password)?,
            first_name: PersonName::parse(Field::FirstName, first_name)?,
            last_name: PersonName::parse(Field::LastName, last_name)?,
            phone_number: PhoneNumber::parse_optional(phone_number)?,
            role,
            company,
        })
    }

    /// Finish the record once the username is settled and the password hashed.
    pub fn into_user(self, username: Username, password_hash: PasswordHash) -> User {
        User {
            id: UserId::new(),
            username,
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            role: self.role,
            company: self.company,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update. `None` means "leave as is".
///
/// Has no username field: usernames never change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `Some("")` clears the phone number.
    pub phone_number: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` (explicit `null`) detaches the user from their company.
    #[serde(default, deserialize_with = "present")]
    pub company: Option<Option<CompanyId>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UserPatch {
    /// Validate every present field; the first failure wins.
    pub fn validate(self) -> DomainResult<ValidatedPatch> {
        Ok(ValidatedPatch {
            email: self.email.as_deref().map(Email::parse).transpose()?,
            first_name: self
                .first_name
                .as_deref()
                .map(|raw| PersonName::parse(Field::FirstName, raw))
                .transpose()?,
            last_name: self
                .last_name
                .as_deref()
                .map(|raw| PersonName::parse(Field::LastName, raw))
                .transpose()?,
            phone_number: self
                .phone_number
                .as_deref()
                .map(PhoneNumber::parse_optional)
                .transpose()?,
            role: self.role,
            company: self.company,
        })
    }
}

/// A patch whose fields have all passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedPatch {
    pub email: Option<Email>,
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub phone_number: Option<Option<PhoneNumber>>,
    pub role: Option<Role>,
    pub company: Option<Option<CompanyId>>,
}

impl ValidatedPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A role that differs from the user's current one.
    pub fn changes_role(&self, user: &User) -> bool {
        self.role.is_some_and(|role| role != user.role)
    }

    /// A company that differs from the user's current one.
    pub fn changes_company(&self, user: &User) -> bool {
        self.company.is_some_and(|company| company != user.company)
    }

    /// A new email that differs from the user's current one.
    pub fn new_email(&self, user: &User) -> Option<&Email> {
        self.email.as_ref().filter(|email| **email != user.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{DomainError, ValidationKind};

    fn registration() -> RegisterUser {
        RegisterUser {
            username: None,
            email: "Ada@Example.com".into(),
            password: "difference engine".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone_number: String::new(),
        }
    }

    fn user() -> User {
        registration()
            .validate()
            .unwrap()
            .into_user(
                Username::parse("ada").unwrap(),
                PasswordHash::from_stored("$argon2id$stub"),
            )
    }

    #[test]
    fn registration_fixes_role_and_company() {
        let draft = registration().validate().unwrap();
        assert_eq!(draft.role, Role::Regular);
        assert_eq!(draft.company, None);
        assert_eq!(draft.username, None);
        assert_eq!(draft.email.as_str(), "ada@example.com");
    }

    #[test]
    fn blank_username_means_generate() {
        let draft = RegisterUser {
            username: Some("   ".into()),
            ..registration()
        }
        .validate()
        .unwrap();
        assert!(draft.username.is_none());
    }

    #[test]
    fn invalid_phone_rejects_registration() {
        let err = RegisterUser {
            phone_number: "abc123".into(),
            ..registration()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(Field::PhoneNumber, ValidationKind::Malformed)
        );
    }

    #[test]
    fn new_user_keeps_requested_role_and_company() {
        let company = CompanyId::new();
        let draft = NewUser {
            email: "grace@example.com".into(),
            password: "compilers rule".into(),
            role: Role::Admin,
            company: Some(company),
            ..NewUser::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.role, Role::Admin);
        assert_eq!(draft.company, Some(company));
    }

    #[test]
    fn display_and_full_name() {
        let mut user = user();
        assert_eq!(user.full_name(), "Ada Lovelace");
        assert_eq!(user.to_string(), "Ada Lovelace (none)");

        let company = CompanyId::new();
        user.company = Some(company);
        assert_eq!(user.to_string(), format!("Ada Lovelace ({company})"));
        assert!(!user.is_company_admin());
    }

    #[test]
    fn serialization_omits_password_hash() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "regular");
    }

    #[test]
    fn patch_distinguishes_absent_and_null_company() {
        let absent: UserPatch = serde_json::from_str(r#"{"first_name":"A"}"#).unwrap();
        assert_eq!(absent.company, None);

        let null: UserPatch = serde_json::from_str(r#"{"company":null}"#).unwrap();
        assert_eq!(null.company, Some(None));
    }

    #[test]
    fn patch_validation_fails_on_first_bad_field() {
        let err = UserPatch {
            email: Some("not-an-email".into()),
            ..UserPatch::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field(), Some(Field::Email));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut user = user();
        let patch = UserPatch {
            last_name: Some("King".into()),
            phone_number: Some("+12345678901".into()),
            ..UserPatch::default()
        }
        .validate()
        .unwrap();
        assert!(!patch.changes_role(&user));
        user.apply(patch);

        assert_eq!(user.first_name.as_str(), "Ada");
        assert_eq!(user.last_name.as_str(), "King");
        assert_eq!(user.phone_number.as_ref().map(|p| p.as_str()), Some("+12345678901"));

        let clear = UserPatch {
            phone_number: Some(String::new()),
            ..UserPatch::default()
        }
        .validate()
        .unwrap();
        user.apply(clear);
        assert_eq!(user.phone_number, None);
    }

    #[test]
    fn unchanged_role_is_not_a_role_change() {
        let user = user();
        let patch = UserPatch {
            role: Some(Role::Regular),
            company: Some(None),
            ..UserPatch::default()
        }
        .validate()
        .unwrap();
        assert!(!patch.changes_role(&user));
        assert!(!patch.changes_company(&user));
        assert!(!patch.is_empty());
    }
}
