use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Suspended,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
            DeviceStatus::Suspended => "suspended",
            DeviceStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A GPS tracking unit owned by the company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub imei: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_device_status")]
    pub status: DeviceStatus,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    #[serde(default)]
    pub activation_code: Option<String>,
    #[serde(default)]
    pub activated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_device_status() -> DeviceStatus {
    DeviceStatus::Inactive
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" | "mensual" => Ok(BillingCycle::Monthly),
            "annual" | "yearly" | "year" | "anual" => Ok(BillingCycle::Annual),
            other => Err(format!(
                "unknown billing cycle '{}' (expected monthly or annual)",
                other
            )),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingCycle::Monthly => f.write_str("monthly"),
            BillingCycle::Annual => f.write_str("annual"),
        }
    }
}

/// Body for `POST /billing/devices/activate`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivateDeviceRequest {
    pub imei: String,
    pub activation_code: String,
    pub plan_id: i64,
    pub billing_cycle: BillingCycle,
    /// Id of a card already registered with the backend
    pub card_id: String,
    pub device_session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateDeviceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<ActivationData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationData {
    pub device: Device,
    #[serde(default)]
    pub subscription: serde_json::Value,
    #[serde(default)]
    pub payment: serde_json::Value,
}

/// Partial device update; unset fields are not sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateDeviceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<i64>,
}

/// One entry of a device's location history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "created_at", alias = "timestamp")]
    pub recorded_at: Option<String>,
}
