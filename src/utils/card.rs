//! Card number, expiry and security code checks.
//!
//! These run locally before any card data is sent to the payment provider.

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::CardData;

/// Longest formatted card number: 16 digits plus 3 separators
const MAX_FORMATTED_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Unknown,
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Result of [`validate_card`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardValidation {
    pub is_valid: bool,
    pub brand: CardBrand,
}

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Detect the brand from the leading digits
pub fn detect_brand(card_number: &str) -> CardBrand {
    let digits = digits_only(card_number);
    let bytes = digits.as_bytes();
    match bytes {
        [b'4', ..] => CardBrand::Visa,
        [b'5', b'1'..=b'5', ..] => CardBrand::Mastercard,
        [b'3', b'4' | b'7', ..] => CardBrand::Amex,
        _ => CardBrand::Unknown,
    }
}

/// Luhn checksum over the digits of `card_number` (non-digits are ignored)
pub fn luhn_check(card_number: &str) -> bool {
    let digits = digits_only(card_number);
    if digits.is_empty() {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// Luhn plus brand, as shown next to the card number field
pub fn validate_card(card_number: &str) -> CardValidation {
    CardValidation {
        is_valid: luhn_check(card_number),
        brand: detect_brand(card_number),
    }
}

/// Full number check: only digits and spaces, 13 to 19 digits, Luhn valid
pub fn validate_card_number(card_number: &str) -> bool {
    let cleaned: String = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    (13..=19).contains(&cleaned.len()) && luhn_check(&cleaned)
}

/// 3 digits, or 4 for American Express
pub fn validate_cvc(cvc: &str, brand: CardBrand) -> bool {
    let cvc = cvc.trim();
    if !cvc.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match brand {
        CardBrand::Amex => cvc.len() == 4,
        _ => cvc.len() == 3,
    }
}

/// Month 1-12, year with 2 or 4 digits; the card is good through the end
/// of its expiry month
pub fn validate_expiry(month: &str, year: &str, today: NaiveDate) -> bool {
    let (month, year) = (month.trim(), year.trim());
    let Ok(month) = month.parse::<u32>() else {
        return false;
    };
    if !(1..=12).contains(&month) {
        return false;
    }

    if !year.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let year = match year.len() {
        2 => 2000 + year.parse::<i32>().unwrap_or(0),
        4 => match year.parse::<i32>() {
            Ok(y) => y,
            Err(_) => return false,
        },
        _ => return false,
    };

    (year, month) >= (today.year(), today.month())
}

/// Group digits in fours, at most 19 characters
pub fn format_card_number(card_number: &str) -> String {
    let digits = digits_only(card_number);
    let grouped = digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    grouped.chars().take(MAX_FORMATTED_LEN).collect()
}

/// `•••• 1234` for display and logs
pub fn mask_card_number(card_number: &str) -> String {
    let digits = digits_only(card_number);
    if digits.len() < 4 {
        return "••••".to_string();
    }
    format!("•••• {}", &digits[digits.len() - 4..])
}

/// Check a whole card form before tokenization
///
/// # Rules
/// - Card number passes [`validate_card_number`]
/// - Holder name has at least 3 characters
/// - Expiry passes [`validate_expiry`] for `today`
/// - CVV passes [`validate_cvc`] for the detected brand
pub fn validate_card_form(card: &CardData, today: NaiveDate) -> Result<()> {
    if !validate_card_number(&card.card_number) {
        bail!("Invalid card number");
    }
    if card.holder_name.trim().chars().count() < 3 {
        bail!("Cardholder name must be at least 3 characters");
    }
    if !validate_expiry(&card.expiration_month, &card.expiration_year, today) {
        bail!("Invalid or past expiration date");
    }
    if !validate_cvc(&card.cvv2, detect_brand(&card.card_number)) {
        bail!("Invalid security code (CVV)");
    }
    Ok(())
}
