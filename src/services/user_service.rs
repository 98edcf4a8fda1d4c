//! Users, roles and permissions.

use super::{api_failure, decode, decode_array};
use crate::client::ApiClient;
use crate::models::{
    ActionOutcome, CreateRoleRequest, CreateUserRequest, Permission, Role, UpdateRoleRequest,
    UpdateUserRequest, User,
};
use crate::utils::unwrap_data;
use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

const INVITATION_SENT: &str = "Invitation sent";

/// Service for account administration
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn users(&self) -> Result<Vec<User>> {
        let body: Value = self
            .client
            .get("/users")
            .await
            .map_err(api_failure("Failed to load users"))?;
        decode_array(body, "user")
    }

    pub async fn user(&self, id: i64) -> Result<User> {
        let body: Value = self
            .client
            .get(&format!("/users/{}", id))
            .await
            .map_err(api_failure("Failed to load user"))?;
        decode(unwrap_data(body), "user")
    }

    pub async fn create_user(&self, data: &CreateUserRequest) -> Result<User> {
        let body: Value = self
            .client
            .post("/users", data)
            .await
            .map_err(api_failure("Failed to create user"))?;
        info!("User {} created", data.email);
        decode(unwrap_data(body), "user")
    }

    pub async fn update_user(&self, id: i64, data: &UpdateUserRequest) -> Result<User> {
        let body: Value = self
            .client
            .put(&format!("/users/{}", id), data)
            .await
            .map_err(api_failure("Failed to update user"))?;
        info!("User {} updated", id);
        decode(unwrap_data(body), "user")
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.client
            .delete::<Value>(&format!("/users/{}", id))
            .await
            .map_err(api_failure("Failed to delete user"))?;
        info!("User {} deleted", id);
        Ok(())
    }

    /// `PATCH /users/{id}/status`
    pub async fn toggle_user_status(&self, id: i64, is_active: bool) -> Result<User> {
        let body: Value = self
            .client
            .patch(
                &format!("/users/{}/status", id),
                &json!({ "is_active": is_active }),
            )
            .await
            .map_err(api_failure("Failed to change user status"))?;
        info!("User {} active={}", id, is_active);
        decode(unwrap_data(body), "user")
    }

    /// `POST /users/invite`
    pub async fn invite_user(&self, email: &str, role_id: i64) -> Result<ActionOutcome> {
        let body: Value = self
            .client
            .post(
                "/users/invite",
                &json!({ "email": email, "role_id": role_id }),
            )
            .await
            .map_err(api_failure("Failed to send invitation"))?;
        info!("Invitation sent to {}", email);

        Ok(ActionOutcome {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(true),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(INVITATION_SENT)
                .to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Roles and permissions
    // ------------------------------------------------------------------

    pub async fn roles(&self) -> Result<Vec<Role>> {
        let body: Value = self
            .client
            .get("/roles")
            .await
            .map_err(api_failure("Failed to load roles"))?;
        decode_array(body, "role")
    }

    pub async fn role(&self, id: i64) -> Result<Role> {
        let body: Value = self
            .client
            .get(&format!("/roles/{}", id))
            .await
            .map_err(api_failure("Failed to load role"))?;
        decode(unwrap_data(body), "role")
    }

    pub async fn create_role(&self, data: &CreateRoleRequest) -> Result<Role> {
        let body: Value = self
            .client
            .post("/roles", data)
            .await
            .map_err(api_failure("Failed to create role"))?;
        info!("Role {} created", data.name);
        decode(unwrap_data(body), "role")
    }

    pub async fn update_role(&self, id: i64, data: &UpdateRoleRequest) -> Result<Role> {
        let body: Value = self
            .client
            .put(&format!("/roles/{}", id), data)
            .await
            .map_err(api_failure("Failed to update role"))?;
        info!("Role {} updated", id);
        decode(unwrap_data(body), "role")
    }

    pub async fn delete_role(&self, id: i64) -> Result<()> {
        self.client
            .delete::<Value>(&format!("/roles/{}", id))
            .await
            .map_err(api_failure("Failed to delete role"))?;
        info!("Role {} deleted", id);
        Ok(())
    }

    pub async fn permissions(&self) -> Result<Vec<Permission>> {
        let body: Value = self
            .client
            .get("/permissions")
            .await
            .map_err(api_failure("Failed to load permissions"))?;
        decode_array(body, "permission")
    }
}
