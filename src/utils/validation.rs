//! Validation rules enforced at the payment flow boundary.
//!
//! Formatting never validates; callers check these before converting or
//! submitting anything.

use crate::errors::{IrisError, IrisResult};
use crate::utils::conversion::{MAX_SUPPLY_SATOSHI, SATOSHI_PER_BTC};

pub const MAX_FIAT_AMOUNT: f64 = 1_000_000.0;
pub const MIN_BITCOIN_ADDRESS_LENGTH: usize = 26;
pub const MAX_BITCOIN_ADDRESS_LENGTH: usize = 62;
pub const MAX_INVOICE_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_BUSINESS_NAME_LENGTH: usize = 100;
pub const MAX_CASHOUT_SATOSHI: u64 = 1_000 * SATOSHI_PER_BTC;

pub fn is_valid_fiat_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0 && amount <= MAX_FIAT_AMOUNT
}

pub fn is_valid_satoshi_amount(satoshi: u64) -> bool {
    satoshi > 0 && satoshi <= MAX_SUPPLY_SATOSHI
}

/// Shallow heuristic: length and prefix only, no checksum.
pub fn is_plausible_bitcoin_address(address: &str) -> bool {
    let len = address.chars().count();
    (MIN_BITCOIN_ADDRESS_LENGTH..=MAX_BITCOIN_ADDRESS_LENGTH).contains(&len)
        && (address.starts_with('1') || address.starts_with('3') || address.starts_with("bc1"))
}

pub fn validate_fiat_amount(amount: f64) -> IrisResult<()> {
    if is_valid_fiat_amount(amount) {
        Ok(())
    } else {
        Err(IrisError::validation(
            "Please enter a valid amount between 0 and 1,000,000",
        ))
    }
}

pub fn validate_satoshi_amount(satoshi: u64) -> IrisResult<()> {
    if is_valid_satoshi_amount(satoshi) {
        Ok(())
    } else {
        Err(IrisError::validation(
            "Please enter a valid Bitcoin amount (at most 21,000,000 BTC)",
        ))
    }
}

pub fn validate_bitcoin_address(address: &str) -> IrisResult<()> {
    if is_plausible_bitcoin_address(address) {
        Ok(())
    } else {
        Err(IrisError::validation(format!("Invalid Bitcoin address: {}", address)))
    }
}

pub fn validate_description(description: Option<&str>) -> IrisResult<()> {
    match description {
        Some(d) if d.chars().count() > MAX_INVOICE_DESCRIPTION_LENGTH => Err(IrisError::validation(
            format!("Description must be at most {} characters", MAX_INVOICE_DESCRIPTION_LENGTH),
        )),
        _ => Ok(()),
    }
}

pub fn validate_business_name(name: &str) -> IrisResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(IrisError::validation("Business name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_BUSINESS_NAME_LENGTH {
        return Err(IrisError::validation(format!(
            "Business name must be at most {} characters",
            MAX_BUSINESS_NAME_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_cashout_amount(satoshi: u64) -> IrisResult<()> {
    validate_satoshi_amount(satoshi)?;
    if satoshi > MAX_CASHOUT_SATOSHI {
        return Err(IrisError::validation("Cashout amount exceeds the 1,000 BTC limit"));
    }
    Ok(())
}

/// Parse an amount typed by the user ("1,250.50" → 1250.5)
pub fn parse_amount_input(input: &str) -> Option<f64> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiat_amount_bounds() {
        assert!(is_valid_fiat_amount(0.01));
        assert!(is_valid_fiat_amount(MAX_FIAT_AMOUNT));
        assert!(!is_valid_fiat_amount(0.0));
        assert!(!is_valid_fiat_amount(-5.0));
        assert!(!is_valid_fiat_amount(1_000_000.01));
        assert!(!is_valid_fiat_amount(f64::INFINITY));
        assert!(!is_valid_fiat_amount(f64::NAN));
    }

    #[test]
    fn test_satoshi_amount_bounds() {
        assert!(!is_valid_satoshi_amount(0));
        assert!(is_valid_satoshi_amount(1));
        assert!(is_valid_satoshi_amount(MAX_SUPPLY_SATOSHI));
        assert!(!is_valid_satoshi_amount(MAX_SUPPLY_SATOSHI + 1));
    }

    #[test]
    fn test_address_heuristic() {
        assert!(is_plausible_bitcoin_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(is_plausible_bitcoin_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
        assert!(is_plausible_bitcoin_address("bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh"));
        // Heuristic accepts anything with the right prefix and length
        assert!(is_plausible_bitcoin_address("1111111111111111111111111111"));
        assert!(!is_plausible_bitcoin_address("2A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!is_plausible_bitcoin_address("1short"));
    }

    #[test]
    fn test_cashout_limit() {
        assert!(validate_cashout_amount(MAX_CASHOUT_SATOSHI).is_ok());
        assert!(validate_cashout_amount(MAX_CASHOUT_SATOSHI + 1).is_err());
        assert!(validate_cashout_amount(0).unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_amount_input() {
        assert_eq!(parse_amount_input(" 1,250.50 "), Some(1250.5));
        assert_eq!(parse_amount_input("abc"), None);
        assert_eq!(parse_amount_input(""), None);
    }

    #[test]
    fn test_business_name() {
        assert!(validate_business_name("Warung Padang").is_ok());
        assert!(validate_business_name("   ").is_err());
        assert!(validate_business_name(&"x".repeat(101)).is_err());
    }
}
