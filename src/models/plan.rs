use super::{lenient_f64, lenient_u32};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    #[default]
    Month,
    Year,
}

/// A subscription plan offered for device activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub interval: PlanInterval,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub max_vehicles: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub max_users: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub trial_days: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_currency() -> String {
    "MXN".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeature {
    pub name: String,
    pub description: String,
    pub included: bool,
}

/// Price of a plan for one billing cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: f64,
    pub discount: f64,
    pub final_price: f64,
    pub savings: f64,
}

/// Response of `POST /plans/compare`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanComparison {
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub comparison: BTreeMap<String, serde_json::Value>,
}
