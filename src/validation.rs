use chrono::NaiveDate;

use crate::dates;
use crate::error::{MarketDashError, Result};
use crate::money;
use crate::schema::AdSpendPayload;

fn invalid(field: &str, reason: impl Into<String>) -> MarketDashError {
    MarketDashError::Validation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Form-level amount check: accepts anything the money policy parses, but
/// requires a strictly positive result.
pub fn validate_amount(raw: &str) -> Result<f64> {
    let value = money::parse_amount_str(raw);
    if value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(
            "amount",
            format!("'{}' is not a positive amount", raw.trim()),
        ))
    }
}

/// Form-level date check: ISO or dd/mm/yyyy.
pub fn validate_date(raw: &str) -> Result<NaiveDate> {
    dates::parse_flexible(raw)
        .ok_or_else(|| invalid("date", format!("'{}' is not a valid date", raw.trim())))
}

/// Checks a payload before it goes anywhere near the network.
pub fn validate_payload(payload: &AdSpendPayload) -> Result<()> {
    if !(payload.amount > 0.0 && payload.amount.is_finite()) {
        return Err(invalid("amount", "must be a positive amount"));
    }
    Ok(())
}

fn digits_of(raw: &str) -> Vec<u32> {
    raw.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let start_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (start_weight - i as u32))
        .sum();
    (sum * 10) % 11 % 10
}

/// CPF check digits (mod-11 over the first nine, then ten, digits).
/// Punctuation is ignored; repeated-digit sequences are rejected even
/// though their check digits verify.
pub fn validate_cpf(raw: &str) -> Result<()> {
    let digits = digits_of(raw);
    if digits.len() != 11 {
        return Err(invalid("cpf", "must contain 11 digits"));
    }
    if all_equal(&digits) {
        return Err(invalid("cpf", "repeated-digit sequence"));
    }
    if cpf_check_digit(&digits[..9]) != digits[9] || cpf_check_digit(&digits[..10]) != digits[10] {
        return Err(invalid("cpf", "check digits do not match"));
    }
    Ok(())
}

fn cnpj_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// CNPJ check digits (mod-11 with the cyclic weight tables).
pub fn validate_cnpj(raw: &str) -> Result<()> {
    let digits = digits_of(raw);
    if digits.len() != 14 {
        return Err(invalid("cnpj", "must contain 14 digits"));
    }
    if all_equal(&digits) {
        return Err(invalid("cnpj", "repeated-digit sequence"));
    }
    if cnpj_check_digit(&digits[..12], &CNPJ_WEIGHTS_FIRST) != digits[12]
        || cnpj_check_digit(&digits[..13], &CNPJ_WEIGHTS_SECOND) != digits[13]
    {
        return Err(invalid("cnpj", "check digits do not match"));
    }
    Ok(())
}

/// Accepts either document kind, deciding by digit count.
pub fn validate_tax_id(raw: &str) -> Result<()> {
    match digits_of(raw).len() {
        11 => validate_cpf(raw),
        14 => validate_cnpj(raw),
        n => Err(invalid(
            "tax_id",
            format!("expected 11 (CPF) or 14 (CNPJ) digits, got {}", n),
        )),
    }
}
