//! Company profile and team management.

use super::{api_failure, decode, decode_list};
use crate::client::ApiClient;
use crate::models::{Company, LogoUpload, NewTeamMember, TeamMember, UpdateCompanyRequest};
use crate::utils::validation::validate_new_member;
use crate::utils::{unwrap_data, unwrap_list};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Service for the signed-in user's company
#[derive(Debug, Clone)]
pub struct CompanyService {
    client: ApiClient,
}

/// Content type for a logo file, by extension
fn logo_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl CompanyService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /admin/company-users/get-users`
    pub async fn company_employees(&self) -> Result<Vec<TeamMember>> {
        let body: Value = self
            .client
            .get("/admin/company-users/get-users")
            .await
            .map_err(api_failure("Failed to load team members"))?;
        decode_list(unwrap_list(body), "team member")
    }

    /// `GET /admin/companie/my-company`
    pub async fn get_company(&self) -> Result<Company> {
        let body: Value = self
            .client
            .get("/admin/companie/my-company")
            .await
            .map_err(api_failure("Failed to load company information"))?;
        decode(unwrap_data(body), "company")
    }

    /// `PUT /admin/companie/updateMyCompanie`. Unset fields are not sent.
    pub async fn update_company(&self, data: &UpdateCompanyRequest) -> Result<Company> {
        let body: Value = self
            .client
            .put("/admin/companie/updateMyCompanie", data)
            .await
            .map_err(api_failure("Failed to update company information"))?;
        info!("Company information updated");
        decode(unwrap_data(body), "company")
    }

    /// Multipart `POST /admin/company/update-logo` with the file in part `logo`
    pub async fn upload_logo(&self, path: &Path) -> Result<LogoUpload> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read logo file: {:?}", path))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("logo")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(logo_mime(path))
            .context("Invalid logo content type")?;
        let form = Form::new().part("logo", part);

        let body: Value = self
            .client
            .upload("/admin/company/update-logo", form)
            .await
            .map_err(api_failure("Failed to upload logo"))?;
        info!("Company logo uploaded");
        decode(unwrap_data(body), "logo upload")
    }

    /// `DELETE /admin/company/delete/logo`
    pub async fn delete_logo(&self) -> Result<()> {
        self.client
            .delete::<Value>("/admin/company/delete/logo")
            .await
            .map_err(api_failure("Failed to delete logo"))?;
        info!("Company logo deleted");
        Ok(())
    }

    /// `POST /users`; the backend attaches the member to the caller's company
    pub async fn add_employee(&self, member: &NewTeamMember) -> Result<TeamMember> {
        validate_new_member(&member.name, &member.email, &member.password)?;

        let body: Value = self
            .client
            .post("/users", member)
            .await
            .map_err(api_failure("Failed to add team member"))?;
        info!("Team member {} added", member.email);
        decode(unwrap_data(body), "team member")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_mime_by_extension() {
        assert_eq!(logo_mime(Path::new("/tmp/logo.PNG")), "image/png");
        assert_eq!(logo_mime(Path::new("brand.jpeg")), "image/jpeg");
        assert_eq!(logo_mime(Path::new("logo")), "application/octet-stream");
    }
}
