//! Value objects: validated field values, equal by value.
//!
//! Every constructor validates at write time and rejects bad input with a
//! `DomainError::Validation` naming the field; values are never truncated.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, Field, ValidationKind};

/// Marker trait for value objects.
///
/// Value objects are immutable, have no identity and compare by value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_MAX_LEN: usize = 17;
pub const PERSON_NAME_MAX_LEN: usize = 150;
pub const COMPANY_NAME_MAX_LEN: usize = 100;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.@+-]+$").expect("username pattern compiles"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?[0-9]{9,15}$").expect("phone pattern compiles"));

fn invalid(field: Field, kind: ValidationKind) -> DomainError {
    DomainError::validation(field, kind)
}

macro_rules! string_value_object {
    ($t:ident) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ValueObject for $t {}

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }
    };
}

/// Login name, unique across the platform. Assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(Field::Username, ValidationKind::Empty));
        }
        if raw.chars().count() > USERNAME_MAX_LEN {
            return Err(invalid(Field::Username, ValidationKind::TooLong));
        }
        if !USERNAME_RE.is_match(raw) {
            return Err(invalid(Field::Username, ValidationKind::Malformed));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value_object!(Username);

/// Email address, stored lowercased so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(Field::Email, ValidationKind::Empty));
        }
        if raw.len() > EMAIL_MAX_LEN {
            return Err(invalid(Field::Email, ValidationKind::TooLong));
        }
        if !EMAIL_RE.is_match(raw) {
            return Err(invalid(Field::Email, ValidationKind::Malformed));
        }
        Ok(Self(raw.to_lowercase()))
    }
}

string_value_object!(Email);

/// Phone number: optional leading `+`, optional `1`, then 9 to 15 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(Field::PhoneNumber, ValidationKind::Empty));
        }
        if raw.chars().count() > PHONE_MAX_LEN {
            return Err(invalid(Field::PhoneNumber, ValidationKind::TooLong));
        }
        if !PHONE_RE.is_match(raw) {
            return Err(invalid(Field::PhoneNumber, ValidationKind::Malformed));
        }
        Ok(Self(raw.to_string()))
    }

    /// Blank input means "no phone number" for records where it is optional.
    pub fn parse_optional(raw: &str) -> DomainResult<Option<Self>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Self::parse(raw).map(Some)
    }
}

string_value_object!(PhoneNumber);

/// Company display name, unique across the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyName(String);

impl CompanyName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(Field::CompanyName, ValidationKind::Empty));
        }
        if raw.chars().count() > COMPANY_NAME_MAX_LEN {
            return Err(invalid(Field::CompanyName, ValidationKind::TooLong));
        }
        Ok(Self(raw.to_string()))
    }
}

string_value_object!(CompanyName);

/// First or last name. Which field it is decides the error tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    /// Blank names are allowed (stored empty).
    pub fn parse(field: Field, raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.chars().count() > PERSON_NAME_MAX_LEN {
            return Err(invalid(field, ValidationKind::TooLong));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn parse_required(field: Field, raw: &str) -> DomainResult<Self> {
        let name = Self::parse(field, raw)?;
        if name.0.is_empty() {
            return Err(invalid(field, ValidationKind::Empty));
        }
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl ValueObject for PersonName {}

impl core::fmt::Display for PersonName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext password on its way to the credential hasher.
///
/// `Debug` never prints the secret and there is no `Serialize` impl.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Password(String);

impl Password {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let len = raw.chars().count();
        if len == 0 {
            return Err(invalid(Field::Password, ValidationKind::Empty));
        }
        if len < PASSWORD_MIN_LEN {
            return Err(invalid(Field::Password, ValidationKind::TooShort));
        }
        if len > PASSWORD_MAX_LEN {
            return Err(invalid(Field::Password, ValidationKind::TooLong));
        }
        Ok(Self(raw.to_string()))
    }

    /// Exposes the plaintext. Only the credential hasher should call this.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Password {}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl TryFrom<String> for Password {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kind_of(err: DomainError) -> (Field, ValidationKind) {
        match err {
            DomainError::Validation { field, kind } => (field, kind),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn phone_accepts_documented_formats() {
        assert!(PhoneNumber::parse("+12345678901").is_ok());
        assert!(PhoneNumber::parse("123456789").is_ok());
        assert!(PhoneNumber::parse("+999999999").is_ok());
    }

    #[test]
    fn phone_rejects_letters_and_overlong_input() {
        assert_eq!(
            kind_of(PhoneNumber::parse("abc123").unwrap_err()),
            (Field::PhoneNumber, ValidationKind::Malformed)
        );
        let twenty = "1".repeat(20);
        assert_eq!(
            kind_of(PhoneNumber::parse(&twenty).unwrap_err()),
            (Field::PhoneNumber, ValidationKind::TooLong)
        );
        assert!(PhoneNumber::parse("12345678").is_err());
        assert!(PhoneNumber::parse("+1-234-567-8901").is_err());
    }

    #[test]
    fn phone_rejects_non_ascii_digits() {
        assert_eq!(
            kind_of(PhoneNumber::parse("12345678\u{0669}").unwrap_err()),
            (Field::PhoneNumber, ValidationKind::Malformed)
        );
        // Over the limit in bytes, within it in chars.
        assert_eq!(
            kind_of(PhoneNumber::parse("+1\u{0661}\u{0662}\u{0663}\u{0664}\u{0665}\u{0666}\u{0667}\u{0668}\u{0669}").unwrap_err()),
            (Field::PhoneNumber, ValidationKind::Malformed)
        );
    }

    #[test]
    fn phone_optional_treats_blank_as_absent() {
        assert_eq!(PhoneNumber::parse_optional("   ").unwrap(), None);
        assert!(PhoneNumber::parse_optional("555").is_err());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert!(Email::parse("alice").is_err());
        assert!(Email::parse("").is_err());
    }

    #[test]
    fn username_charset() {
        assert!(Username::parse("user_0a1b2c3d").is_ok());
        assert!(Username::parse("a.b@c+d-e").is_ok());
        assert_eq!(
            kind_of(Username::parse("has space").unwrap_err()),
            (Field::Username, ValidationKind::Malformed)
        );
        assert_eq!(
            kind_of(Username::parse(&"x".repeat(151)).unwrap_err()),
            (Field::Username, ValidationKind::TooLong)
        );
    }

    #[test]
    fn person_name_tags_its_field() {
        assert_eq!(PersonName::parse(Field::FirstName, "").unwrap().as_str(), "");
        assert_eq!(
            kind_of(PersonName::parse_required(Field::LastName, " ").unwrap_err()),
            (Field::LastName, ValidationKind::Empty)
        );
    }

    #[test]
    fn password_debug_is_redacted() {
        let password = Password::parse("correct horse").unwrap();
        assert_eq!(format!("{password:?}"), "Password([REDACTED])");
        assert_eq!(
            kind_of(Password::parse("short").unwrap_err()),
            (Field::Password, ValidationKind::TooShort)
        );
    }

    #[test]
    fn deserialize_runs_validation() {
        let ok: PhoneNumber = serde_json::from_str("\"+12345678901\"").unwrap();
        assert_eq!(ok.as_str(), "+12345678901");
        assert!(serde_json::from_str::<PhoneNumber>("\"abc123\"").is_err());
    }

    proptest! {
        #[test]
        fn phone_digit_runs_validate_by_length(digits in "[0-9]{1,20}") {
            let ok = PhoneNumber::parse(&digits).is_ok();
            let expected = if digits.len() > PHONE_MAX_LEN {
                false
            } else if digits.starts_with('1') {
                // A leading 1 may be the optional country digit.
                (9..=16).contains(&digits.len())
            } else {
                (9..=15).contains(&digits.len())
            };
            prop_assert_eq!(ok, expected);
        }
    }
}
