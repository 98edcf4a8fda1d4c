use super::lenient_f64;
use serde::{Deserialize, Serialize};

/// A card registered with the backend, in the normalized nested shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(rename = "type", default = "default_method_type")]
    pub method_type: String,
    pub card: CardDetails,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: String,
}

fn default_method_type() -> String {
    "card".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub holder_name: String,
}

impl PaymentMethod {
    /// One-line summary such as `visa •••• 4242 (12/27)`
    pub fn summary(&self) -> String {
        format!(
            "{} •••• {} ({:02}/{:02})",
            self.card.brand,
            self.card.last4,
            self.card.exp_month,
            self.card.exp_year % 100
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub created_at: String,
}

fn default_currency() -> String {
    "MXN".to_string()
}

/// Paginated transaction listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub data: Vec<Transaction>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Body for `POST /billing/payment-methods/add-card`.
///
/// Only the provider token ever reaches the backend, never card data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddCardRequest {
    pub token_id: String,
    pub device_session_id: String,
}

/// Raw card data as typed by the user. Only sent to the payment provider.
#[derive(Clone, Default, Serialize)]
pub struct CardData {
    pub card_number: String,
    pub holder_name: String,
    pub expiration_month: String,
    pub expiration_year: String,
    pub cvv2: String,
}

impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field(
                "card_number",
                &crate::utils::card::mask_card_number(&self.card_number),
            )
            .field("holder_name", &self.holder_name)
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .field("cvv2", &"***")
            .finish()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
