use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Suspended,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Suspended => "suspended",
            CompanyStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub rfc: Option<String>,
    #[serde(default)]
    pub fiscal_address: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_company_status")]
    pub status: CompanyStatus,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_company_status() -> CompanyStatus {
    CompanyStatus::Active
}

/// Partial update for the company profile; unset fields are not sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateCompanyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl UpdateCompanyRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoUpload {
    pub logo_url: String,
}

/// A company employee as listed by the team endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    #[serde(default)]
    pub company_id: Option<i64>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub roles: Vec<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TeamMember {
    /// Display name of the first role, "User" when none is assigned
    pub fn primary_role(&self) -> String {
        self.roles
            .first()
            .and_then(|role| match role {
                serde_json::Value::String(name) => Some(name.clone()),
                serde_json::Value::Object(map) => map
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .unwrap_or_else(|| "User".to_string())
    }
}

/// Body for creating an employee; the backend takes the company from the session
#[derive(Clone, Serialize)]
pub struct NewTeamMember {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub roles: Vec<i64>,
}

impl std::fmt::Debug for NewTeamMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewTeamMember")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_status_does_not_fail() {
        let company: Company = serde_json::from_value(json!({
            "id": 1, "name": "Acme", "status": "archived"
        }))
        .unwrap();
        assert_eq!(company.status, CompanyStatus::Unknown);
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let request = UpdateCompanyRequest {
            phone: Some("5512345678".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"phone": "5512345678"}));
        assert!(UpdateCompanyRequest::default().is_empty());
    }

    #[test]
    fn test_primary_role_reads_objects_and_strings() {
        let mut member: TeamMember = serde_json::from_value(json!({
            "id": 3, "name": "Ana", "email": "ana@acme.mx",
            "roles": [{"id": 2, "name": "Administrador"}]
        }))
        .unwrap();
        assert_eq!(member.primary_role(), "Administrador");

        member.roles = vec![json!("Operador")];
        assert_eq!(member.primary_role(), "Operador");

        member.roles.clear();
        assert_eq!(member.primary_role(), "User");
    }
}
