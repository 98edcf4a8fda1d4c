//! Display formatting for money.

/// Group the integer part of an already-rounded amount with commas
fn group_thousands(integer: u64) -> String {
    let digits = integer.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Format an amount the way the es-MX locale does.
///
/// Pesos print as `$1,234.50`; any other currency is prefixed with its
/// code, e.g. `USD 1,234.50`. Negative amounts keep a leading minus.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    let number = format!("{}.{:02}", group_thousands(cents / 100), cents % 100);

    let currency = currency.trim().to_uppercase();
    if currency.is_empty() || currency == "MXN" {
        format!("{}${}", sign, number)
    } else {
        format!("{}{} {}", sign, currency, number)
    }
}
