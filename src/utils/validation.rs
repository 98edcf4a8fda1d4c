//! Form validation rules shared by the CLI and the services.

use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;

use crate::models::RegisterRequest;

/// IMEI length for activation
pub const IMEI_LENGTH: usize = 15;
/// Activation code length printed on the device box
pub const ACTIVATION_CODE_LENGTH: usize = 9;
/// Minimum password length for registration
pub const MIN_REGISTER_PASSWORD: usize = 8;
/// Minimum password length when an admin creates a team member
pub const MIN_MEMBER_PASSWORD: usize = 6;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static RFC_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // U+FEFF is rejected like any other whitespace
        let pattern = r"^[^\s@\x{FEFF}]+@[^\s@\x{FEFF}]+\.[^\s@\x{FEFF}]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn rfc_regex() -> &'static Regex {
    RFC_RE.get_or_init(|| {
        let pattern = "^[A-ZÑ&]{3,4}[0-9]{6}[A-Z0-9]{3}$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("RFC regex failed to compile: {error}"))
    })
}

fn is_rfc_letter(c: char) -> bool {
    c.is_ascii_uppercase() || c == 'Ñ' || c == '&'
}

/// `^[^\s@]+@[^\s@]+\.[^\s@]+$`
pub fn validate_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Mexican tax id: `^[A-ZÑ&]{3,4}\d{6}[A-Z0-9]{3}$` after uppercasing.
///
/// 12 characters for companies, 13 for individuals.
pub fn validate_rfc(rfc: &str) -> bool {
    rfc_regex().is_match(&rfc.to_uppercase())
}

/// Uppercase and keep only RFC characters
pub fn format_rfc(rfc: &str) -> String {
    rfc.to_uppercase()
        .chars()
        .filter(|c| is_rfc_letter(*c) || c.is_ascii_digit())
        .collect()
}

/// Keep digits only
pub fn format_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Outcome of [`validate_password`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Password strength: 8+ chars with upper, lower and a digit.
///
/// Every failed rule is reported, not only the first.
pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("At least 8 characters".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("At least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("At least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("At least one number".to_string());
    }

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Registration form rules
pub fn validate_registration(form: &RegisterRequest) -> Result<()> {
    let required = [
        &form.name,
        &form.email,
        &form.company_name,
        &form.password,
        &form.password_confirmation,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        bail!("All fields are required");
    }
    if !form.email.contains('@') {
        bail!("Please enter a valid email");
    }
    if form.password.chars().count() < MIN_REGISTER_PASSWORD {
        bail!(
            "Password must be at least {} characters",
            MIN_REGISTER_PASSWORD
        );
    }
    if form.password != form.password_confirmation {
        bail!("Passwords do not match");
    }
    Ok(())
}

/// Rules for an admin adding a team member
pub fn validate_new_member(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Name is required");
    }
    if email.trim().is_empty() || !email.contains('@') {
        bail!("Invalid email");
    }
    if password.chars().count() < MIN_MEMBER_PASSWORD {
        bail!(
            "Password must be at least {} characters",
            MIN_MEMBER_PASSWORD
        );
    }
    Ok(())
}

/// 15 digits
pub fn validate_imei(imei: &str) -> bool {
    imei.len() == IMEI_LENGTH && imei.chars().all(|c| c.is_ascii_digit())
}

/// IMEI and activation code as typed on the activation form
pub fn validate_activation_input(imei: &str, activation_code: &str) -> Result<()> {
    if !validate_imei(imei) {
        bail!("IMEI must be {} digits", IMEI_LENGTH);
    }
    if activation_code.chars().count() != ACTIVATION_CODE_LENGTH {
        bail!(
            "Activation code must be {} characters",
            ACTIVATION_CODE_LENGTH
        );
    }
    Ok(())
}
