//! Payment methods and billing history.
//!
//! Adding a card is a three-step contract: get a device session id from
//! the payment provider, tokenize the card with the provider, and only
//! then register the token with the backend. Raw card data never reaches
//! the backend.

use super::openpay::PaymentGateway;
use super::{api_failure, decode};
use crate::client::ApiClient;
use crate::models::{
    value_as_f64, AddCardRequest, CardData, CardDetails, PaymentMethod, Transaction,
    TransactionPage,
};
use crate::utils::card::validate_card_form;
use crate::utils::{unwrap_data, unwrap_list};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

const DEFAULT_BRAND: &str = "unknown";
const DEFAULT_LAST4: &str = "0000";
const DEFAULT_EXP_MONTH: u32 = 1;
const DEFAULT_EXP_YEAR: u32 = 2025;
const DEFAULT_HOLDER: &str = "TITULAR";

/// Service for cards on file and transactions
#[derive(Debug, Clone)]
pub struct PaymentService {
    client: ApiClient,
}

/// String or number field as text, skipping empty strings
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric field from a string or a number, first key that parses
fn number_field(map: &Map<String, Value>, keys: &[&str], default: u32) -> u32 {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(value_as_f64))
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(default)
}

fn last_four(map: &Map<String, Value>) -> String {
    let raw = text_field(map, &["last_four", "last4"]).unwrap_or_else(|| DEFAULT_LAST4.to_string());
    let chars: Vec<char> = raw.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

fn card_details(map: &Map<String, Value>) -> CardDetails {
    CardDetails {
        brand: text_field(map, &["brand"]).unwrap_or_else(|| DEFAULT_BRAND.to_string()),
        last4: last_four(map),
        exp_month: number_field(map, &["expiration_month", "exp_month"], DEFAULT_EXP_MONTH),
        exp_year: number_field(map, &["expiration_year", "exp_year"], DEFAULT_EXP_YEAR),
        holder_name: text_field(map, &["holder_name"]).unwrap_or_else(|| DEFAULT_HOLDER.to_string()),
    }
}

/// Map one card record, flat or nested, to [`PaymentMethod`].
///
/// Records that have neither an `id` nor a nested `card` are dropped.
pub fn normalize_card(item: &Value, now: &str) -> Option<PaymentMethod> {
    let map = item.as_object()?;
    let id = text_field(map, &["id"]);

    // Flat shape has the card fields on the record itself
    let card = match map.get("card").and_then(Value::as_object) {
        Some(nested) => card_details(nested),
        None => card_details(map),
    };
    if id.is_none() && !map.contains_key("card") {
        return None;
    }

    Some(PaymentMethod {
        id: id.unwrap_or_default(),
        method_type: text_field(map, &["type"]).unwrap_or_else(|| "card".to_string()),
        card,
        is_default: map.get("is_default").and_then(Value::as_bool).unwrap_or(false),
        created_at: text_field(map, &["created_at"]).unwrap_or_else(|| now.to_string()),
    })
}

/// Normalize any of the list shapes the backend uses for cards
pub fn normalize_payment_methods(body: Value, now: &str) -> Vec<PaymentMethod> {
    unwrap_list(body)
        .iter()
        .filter_map(|item| {
            let method = normalize_card(item, now);
            if method.is_none() {
                warn!("Skipping payment method without id: {}", item);
            }
            method
        })
        .collect()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl PaymentService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn single_method(body: Value) -> Result<PaymentMethod> {
        let data = unwrap_data(body);
        normalize_card(&data, &now_rfc3339())
            .ok_or_else(|| anyhow!("Unexpected payment method payload"))
    }

    /// `GET /billing/payment-methods/get-all-cards`
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let body: Value = self
            .client
            .get("/billing/payment-methods/get-all-cards")
            .await
            .map_err(api_failure("Failed to load payment methods"))?;
        let methods = normalize_payment_methods(body, &now_rfc3339());
        info!("Loaded {} payment methods", methods.len());
        Ok(methods)
    }

    /// Register a provider token with the backend
    pub async fn add_payment_method(&self, request: &AddCardRequest) -> Result<PaymentMethod> {
        let body: Value = self
            .client
            .post("/billing/payment-methods/add-card", request)
            .await
            .map_err(api_failure("Failed to add payment method"))?;
        info!("Payment method added");
        Self::single_method(body)
    }

    pub async fn delete_payment_method(&self, card_id: &str) -> Result<()> {
        self.client
            .delete::<Value>(&format!("/billing/payment-methods/{}", card_id))
            .await
            .map_err(api_failure("Failed to delete payment method"))?;
        info!("Payment method {} deleted", card_id);
        Ok(())
    }

    pub async fn set_default_payment_method(&self, card_id: &str) -> Result<PaymentMethod> {
        let body: Value = self
            .client
            .post_empty(&format!("/billing/payment-methods/{}/set-default", card_id))
            .await
            .map_err(api_failure("Failed to set default payment method"))?;
        info!("Payment method {} set as default", card_id);
        Self::single_method(body)
    }

    /// `GET /billing/transactions?page&limit`
    pub async fn transactions(&self, page: u32, limit: u32) -> Result<TransactionPage> {
        let body: Value = self
            .client
            .get_with_query("/billing/transactions", &[("page", page), ("limit", limit)])
            .await
            .map_err(api_failure("Failed to load transactions"))?;
        decode(body, "transaction page")
    }

    pub async fn transaction(&self, id: &str) -> Result<Transaction> {
        let body: Value = self
            .client
            .get(&format!("/billing/transactions/{}", id))
            .await
            .map_err(api_failure("Failed to load transaction"))?;
        decode(unwrap_data(body), "transaction")
    }

    /// Validate, fingerprint, tokenize, then register the card.
    ///
    /// Each step must succeed before the next one starts.
    pub async fn add_card<G>(&self, gateway: &G, card: &CardData) -> Result<PaymentMethod>
    where
        G: PaymentGateway + ?Sized,
    {
        validate_card_form(card, chrono::Local::now().date_naive())?;

        let device_session_id = gateway.device_session_id().await.map_err(|e| {
            error!("Device session id failed: {}", e);
            anyhow::Error::new(e)
        })?;

        let token_id = gateway.tokenize_card(card).await.map_err(|e| {
            error!("Card tokenization failed: {}", e);
            anyhow::Error::new(e)
        })?;

        self.add_payment_method(&AddCardRequest {
            token_id,
            device_session_id,
        })
        .await
    }
}
