//! Application services layer.
//!
//! One service per backend resource. Each maps a handful of REST endpoints
//! to typed async functions and turns transport failures into messages a
//! person can read. Services never call each other; the only state they
//! share is the session token, read by the [`ApiClient`] on every request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  CLI Layer                      │
//! │  (commands, prompts, output helpers)            │
//! └─────────────────────┬───────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 Services Layer                       │
//! │  ┌─────────────┐ ┌────────────────┐ ┌───────────────┐│
//! │  │ AuthService │ │ CompanyService │ │ DeviceService ││
//! │  └─────────────┘ └────────────────┘ └───────────────┘│
//! │  ┌────────────────┐ ┌─────────────┐ ┌─────────────┐  │
//! │  │ PaymentService │ │ PlanService │ │ UserService │  │
//! │  └───────┬────────┘ └─────────────┘ └─────────────┘  │
//! │          │ PaymentGateway (OpenPay)                  │
//! └──────────┼───────────────┬───────────────────────────┘
//!            │               │
//!            ▼               ▼
//! ┌─────────────────┐ ┌──────────────────────────────────┐
//! │ Payment provider│ │ ApiClient + SessionStore         │
//! │ (tokenization)  │ │ (bearer token, 401 handling)     │
//! └─────────────────┘ └──────────────────────────────────┘
//! ```

pub mod auth_service;
pub mod company_service;
pub mod device_service;
pub mod openpay;
pub mod payment_service;
pub mod plan_service;
pub mod user_service;

// Re-export common types
pub use auth_service::AuthService;
pub use company_service::CompanyService;
pub use device_service::DeviceService;
pub use openpay::{GatewayError, OpenPayGateway, PaymentGateway};
pub use payment_service::PaymentService;
pub use plan_service::PlanService;
pub use user_service::UserService;

use crate::client::ApiError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

/// Log a failed call and convert it into a user-facing error.
///
/// The backend's message wins; `fallback` is shown when it sent none.
pub(crate) fn api_failure(fallback: &'static str) -> impl FnOnce(ApiError) -> anyhow::Error {
    move |e| {
        error!("{}: {}", fallback, e);
        e.into_user_error(fallback)
    }
}

/// Decode one record out of an already unwrapped payload
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).with_context(|| format!("Unexpected {} payload", what))
}

/// Decode every item of a list payload
pub(crate) fn decode_list<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| decode(item, what))
        .collect()
}

/// `body.data` (or the body) as a list; anything that is not an array
/// yields an empty list
pub(crate) fn decode_array<T: DeserializeOwned>(body: Value, what: &str) -> Result<Vec<T>> {
    match crate::utils::unwrap_data(body) {
        Value::Array(items) => decode_list(items, what),
        other => {
            tracing::debug!("Expected a {} list, got: {}", what, other);
            Ok(Vec::new())
        }
    }
}
