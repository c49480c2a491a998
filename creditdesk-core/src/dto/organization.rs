//! Organization registration DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new organization together with its first admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOrganization {
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub organization_email: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterOrganization {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            &self.organization_name,
            &self.organization_email,
            &self.admin_email,
            &self.password,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err("All fields are required".to_string());
        }
        Ok(())
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub success: bool,
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_required() {
        let mut req = RegisterOrganization {
            organization_name: "Acme".to_string(),
            organization_email: "ops@acme.com".to_string(),
            admin_email: "admin@acme.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(req.validate().is_ok());

        req.password = String::new();
        assert_eq!(req.validate().unwrap_err(), "All fields are required");
    }
}
