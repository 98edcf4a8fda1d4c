//! Payment provider integration (OpenPay).
//!
//! Card data is exchanged for a one-time token directly with the provider.
//! Only that token, together with an anti-fraud device session id, is ever
//! handed to the TrackGPX backend.

use crate::config::{Config, OpenPaySettings};
use crate::models::CardData;
use crate::utils::card::mask_card_number;
use crate::utils::unwrap_data;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Provider REST API, sandbox environment
pub const SANDBOX_API_BASE: &str = "https://sandbox-api.openpay.mx";
/// Provider REST API, production environment
pub const PRODUCTION_API_BASE: &str = "https://api.openpay.mx";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider is not available")]
    NotConfigured,

    /// The provider refused the request; `message` is already translated
    #[error("{message}")]
    Rejected { code: Option<u32>, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

/// Source of device fingerprints and card tokens
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Anti-fraud id that must accompany the token
    async fn device_session_id(&self) -> Result<String, GatewayError>;

    /// Exchange raw card data for a one-time token id
    async fn tokenize_card(&self, card: &CardData) -> Result<String, GatewayError>;
}

/// Human-readable text for a provider `error_code`
pub fn error_code_message(code: u32) -> Option<&'static str> {
    let message = match code {
        1000 => "Internal server error at the payment provider",
        1001 => "Bad request format",
        1002 => "Request not authenticated",
        1003 => "Operation could not be completed",
        1004 => "Requested service does not exist",
        1005 => "Missing required parameter",
        1006 => "Invalid parameter value",
        1007 => "Empty request body",
        1008 => "Operation not allowed for this resource",
        1009 => "Request body too large",
        2004 => "Invalid card check digit",
        2005 => "Card expiration date is in the past",
        2006 => "CVV2 not provided",
        3001 => "Card declined",
        3002 => "Card expired",
        3003 => "Insufficient funds",
        3004 => "Card reported stolen",
        3005 => "Declined by anti-fraud",
        _ => return None,
    };
    Some(message)
}

fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get("data")
        .and_then(|data| data.get(key))
        .or_else(|| body.get(key))
}

/// `error_code` from the top level or from under `data`
pub fn error_code(body: &Value) -> Option<u32> {
    let code = field(body, "error_code")?;
    code.as_u64()
        .and_then(|c| u32::try_from(c).ok())
        .or_else(|| code.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Translate a provider error body: known code, then `description`, then
/// a generic message
pub fn error_message(body: &Value) -> String {
    if let Some(message) = error_code(body).and_then(error_code_message) {
        return message.to_string();
    }
    field(body, "description")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    card_number: String,
    holder_name: &'a str,
    expiration_year: &'a str,
    expiration_month: &'a str,
    cvv2: &'a str,
}

impl<'a> From<&'a CardData> for TokenRequest<'a> {
    fn from(card: &'a CardData) -> Self {
        Self {
            card_number: card
                .card_number
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
            holder_name: card.holder_name.trim(),
            expiration_year: card.expiration_year.trim(),
            expiration_month: card.expiration_month.trim(),
            cvv2: card.cvv2.trim(),
        }
    }
}

/// [`PaymentGateway`] over the provider's REST API
#[derive(Debug, Clone)]
pub struct OpenPayGateway {
    http: reqwest::Client,
    base_url: String,
    merchant_id: String,
    public_key: String,
}

impl OpenPayGateway {
    pub fn new(settings: &OpenPaySettings, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = match &settings.api_base {
            Some(base) if !base.trim().is_empty() => base.trim().to_string(),
            _ if settings.sandbox => SANDBOX_API_BASE.to_string(),
            _ => PRODUCTION_API_BASE.to_string(),
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trackgpx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            merchant_id: settings.merchant_id.trim().to_string(),
            public_key: settings.public_key.trim().to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(&config.openpay, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Both merchant id and public key are set
    pub fn is_available(&self) -> bool {
        !self.merchant_id.is_empty() && !self.public_key.is_empty()
    }

    fn ensure_available(&self) -> Result<(), GatewayError> {
        if self.is_available() {
            Ok(())
        } else {
            warn!("Payment provider used without merchant id or public key");
            Err(GatewayError::NotConfigured)
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for OpenPayGateway {
    async fn device_session_id(&self) -> Result<String, GatewayError> {
        self.ensure_available()?;

        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let url = format!("{}/oa/logo.htm", self.base_url);

        // Registering the fingerprint is best effort
        match self
            .http
            .get(&url)
            .query(&[("m", self.merchant_id.as_str()), ("s", session_id.as_str())])
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("Device session registered with payment provider");
            }
            Ok(response) => {
                warn!(
                    "Device session beacon returned {}",
                    response.status().as_u16()
                );
            }
            Err(e) => warn!("Device session beacon failed: {}", e),
        }

        info!("Device session id generated");
        Ok(session_id)
    }

    async fn tokenize_card(&self, card: &CardData) -> Result<String, GatewayError> {
        self.ensure_available()?;

        let url = format!("{}/v1/{}/tokens", self.base_url, self.merchant_id);
        debug!(
            "Tokenizing card {} with payment provider",
            mask_card_number(&card.card_number)
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.public_key, Some(""))
            .json(&TokenRequest::from(card))
            .send()
            .await
            .map_err(|e| {
                error!("Tokenization request failed: {}", e);
                GatewayError::Network(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        if !status.is_success() {
            let code = error_code(&parsed);
            let message = error_message(&parsed);
            error!(
                "Tokenization rejected ({}), code {:?}: {}",
                status.as_u16(),
                code,
                message
            );
            return Err(GatewayError::Rejected { code, message });
        }

        let token = unwrap_data(parsed)
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Decode("token response has no id".to_string()))?;

        info!("Card tokenized");
        Ok(token)
    }
}
