use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::{CompanyId, CompanyName, Entity};

/// Tenant boundary. Users belong to at most one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: CompanyName,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: CompanyName) -> Self {
        Self {
            id: CompanyId::new(),
            name,
            created_at: Utc::now(),
        }
    }

    /// The name is the only mutable field.
    pub fn rename(&mut self, name: CompanyName) {
        self.name = name;
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Company {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_keeps_identity() {
        let mut company = Company::new(CompanyName::parse("Acme").unwrap());
        let id = company.id;
        company.rename(CompanyName::parse("Acme Ltd").unwrap());
        assert_eq!(company.id, id);
        assert_eq!(company.to_string(), "Acme Ltd");
    }

    #[test]
    fn deserialize_rejects_blank_name() {
        let json = format!(
            r#"{{"id":"{}","name":"  ","created_at":"2024-01-01T00:00:00Z"}}"#,
            CompanyId::new()
        );
        assert!(serde_json::from_str::<Company>(&json).is_err());
    }
}
