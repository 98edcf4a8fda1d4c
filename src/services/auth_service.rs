//! Authentication service.
//!
//! Login and registration never fail with an error: they return a
//! [`LoginResponse`] with `success == false` and a message to show. The
//! token and user are persisted only when the backend sends both.

use crate::client::{ApiClient, ApiError};
use crate::models::{
    ActionOutcome, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
    SessionUser,
};
use crate::session::SessionStore;
use anyhow::Result;
use serde_json::{json, Value};
use tracing::{error, info, warn};

const RECOVERY_EMAIL_SENT: &str = "Recovery email sent";
const PASSWORD_UPDATED: &str = "Password updated";

/// Service for login, registration and session lifecycle
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// Persist token and user when the response carries both.
    ///
    /// Returns `false` when there was nothing to persist.
    fn persist(&self, response: &LoginResponse) -> Result<bool> {
        let (Some(token), Some(user)) = (&response.token, &response.user) else {
            return Ok(false);
        };
        self.session().set_token(token)?;
        self.session().set_user(user)?;
        Ok(true)
    }

    /// `POST /auth/login`
    pub async fn login(&self, credentials: &LoginRequest) -> LoginResponse {
        let response: LoginResponse = match self.client.post("/auth/login", credentials).await {
            Ok(response) => response,
            Err(e) => {
                error!("Login error: {}", e);
                return LoginResponse::failure(e.describe());
            }
        };

        match self.persist(&response) {
            Ok(true) => {}
            Ok(false) => {
                warn!("Login response did not include both token and user");
                return response;
            }
            Err(e) => {
                error!("Failed to store session: {:#}", e);
                return LoginResponse::failure(format!("{:#}", e));
            }
        }

        let remembered = if credentials.remember {
            self.session().remember_email(&credentials.email)
        } else {
            self.session().forget_email()
        };
        if let Err(e) = remembered {
            warn!("Failed to update remembered email: {:#}", e);
        }

        info!("Logged in as {}", credentials.email);
        LoginResponse {
            success: true,
            ..response
        }
    }

    /// `POST /logout`. The local session is cleared even if the call fails.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.client.post_empty::<Value>("/logout").await {
            error!("Logout error: {}", e);
        }
        self.session().clear_auth()?;
        info!("Session cleared");
        Ok(())
    }

    /// `POST /register`
    pub async fn register(&self, data: &RegisterRequest) -> LoginResponse {
        let response: LoginResponse = match self.client.post("/register", data).await {
            Ok(response) => response,
            Err(e) => {
                error!("Register error: {}", e);
                return LoginResponse::failure(e.describe());
            }
        };

        match self.persist(&response) {
            Ok(true) => {
                info!("Registered {}", data.email);
                LoginResponse {
                    success: true,
                    ..response
                }
            }
            Ok(false) => response,
            Err(e) => {
                error!("Failed to store session: {:#}", e);
                LoginResponse::failure(format!("{:#}", e))
            }
        }
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.session().token()
    }

    pub fn current_user(&self) -> Result<Option<SessionUser>> {
        self.session().user()
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.token()?.is_some())
    }

    /// Email kept by "remember me", if enabled
    pub fn saved_email(&self) -> Result<Option<String>> {
        self.session().saved_email()
    }

    /// `GET /user`. Any failure logs out and returns `false`.
    pub async fn verify_token(&self) -> bool {
        match self.client.get::<Value>("/user").await {
            Ok(body) => !body.is_null(),
            Err(e) => {
                warn!("Token verification failed: {}", e);
                if let Err(e) = self.logout().await {
                    error!("Failed to clear session: {:#}", e);
                }
                false
            }
        }
    }

    /// `POST /refresh`. Stores the new token when one comes back.
    pub async fn refresh_token(&self) -> bool {
        let body = match self.client.post_empty::<Value>("/refresh").await {
            Ok(body) => body,
            Err(e) => {
                error!("Refresh token error: {}", e);
                return false;
            }
        };

        let token = body
            .get("token")
            .or_else(|| body.get("data").and_then(|data| data.get("token")))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => match self.session().set_token(token) {
                Ok(()) => {
                    info!("Token refreshed");
                    true
                }
                Err(e) => {
                    error!("Failed to store refreshed token: {:#}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// `POST /forgot-password`
    pub async fn forgot_password(&self, email: &str) -> ActionOutcome {
        let result = self
            .client
            .post::<Value, _>("/forgot-password", &json!({ "email": email }))
            .await;
        outcome(result, RECOVERY_EMAIL_SENT)
    }

    /// `POST /reset-password`
    pub async fn reset_password(&self, data: &ResetPasswordRequest) -> ActionOutcome {
        let result = self.client.post::<Value, _>("/reset-password", data).await;
        outcome(result, PASSWORD_UPDATED)
    }
}

fn outcome(result: Result<Value, ApiError>, default_message: &str) -> ActionOutcome {
    match result {
        Ok(body) => ActionOutcome {
            success: true,
            message: body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(default_message)
                .to_string(),
        },
        Err(e) => {
            error!("Password recovery error: {}", e);
            ActionOutcome {
                success: false,
                message: e.describe(),
            }
        }
    }
}
