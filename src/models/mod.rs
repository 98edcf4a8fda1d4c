//! Data transfer objects mirrored from the backend JSON.
//!
//! These are plain records. The backend owns identity and lifecycle; the
//! client only fetches, displays and re-fetches them.

pub mod auth;
pub mod company;
pub mod device;
pub mod payment;
pub mod plan;
pub mod user;

pub use auth::{
    ActionOutcome, CompanySummary, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, SessionUser,
};
pub use company::{Company, CompanyStatus, LogoUpload, NewTeamMember, TeamMember, UpdateCompanyRequest};
pub use device::{
    ActivateDeviceRequest, ActivateDeviceResponse, ActivationData, BillingCycle, Device,
    DeviceStatus, LocationPoint, UpdateDeviceRequest,
};
pub use payment::{
    AddCardRequest, CardData, CardDetails, PaymentMethod, Transaction, TransactionPage,
    TransactionStatus,
};
pub use plan::{Plan, PlanComparison, PlanFeature, PlanInterval, PriceBreakdown};
pub use user::{
    CreateRoleRequest, CreateUserRequest, Permission, Role, UpdateRoleRequest, UpdateUserRequest,
    User,
};

use serde::{Deserialize, Deserializer};

/// Deserialize a number the backend may send as a JSON number, a numeric
/// string (Laravel decimals) or null. Anything unparsable becomes 0.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

/// Same as [`lenient_f64`] for integer counters.
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(0))
}

pub(crate) fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
