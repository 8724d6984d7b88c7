use crate::types::Currency;
use crate::utils::conversion::satoshi_to_btc;

/// Insert `separator` between groups of three digits
fn group_digits(digits: &str, separator: char) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (count, c) in digits.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(separator);
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format satoshi amount with thousands separator (e.g., 1,234,567)
pub fn format_sats_with_separator(sats: u64) -> String {
    group_digits(&sats.to_string(), ',')
}

/// Satoshi as a fixed 8-decimal BTC string (e.g., "0.00026316")
pub fn format_btc(satoshi: u64) -> String {
    format_btc_amount(satoshi_to_btc(satoshi))
}

pub fn format_btc_amount(btc: f64) -> String {
    format!("{:.8}", btc)
}

/// Format a fiat amount with its currency symbol.
///
/// IDR renders with no decimals and `.` grouping ("Rp 1.235"); every other
/// currency renders with two decimals and `,` grouping ("$1,234.50").
/// Unknown codes use the code itself as the symbol.
pub fn format_fiat(amount: f64, code: &str) -> String {
    let currency = Currency::from_code(code);
    let sign = if amount < 0.0 { "-" } else { "" };
    let amount = amount.abs();

    match currency {
        Some(Currency::Idr) => {
            let whole = format!("{:.0}", amount.round());
            format!("Rp {}{}", sign, group_digits(&whole, '.'))
        }
        Some(Currency::Btc) => format!("{}{} BTC", sign, format_btc_amount(amount)),
        _ => {
            let symbol = currency.map(|c| c.symbol()).unwrap_or(code);
            let fixed = format!("{:.2}", amount);
            let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
            format!("{}{}{}.{}", sign, symbol, group_digits(whole, ','), fraction)
        }
    }
}

/// Shorten to `max_len` characters, ending in "..."
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let head: String = s.chars().take(keep).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_btc() {
        assert_eq!(format_btc(100_000_000), "1.00000000");
        assert_eq!(format_btc(26_316), "0.00026316");
        assert_eq!(format_btc(0), "0.00000000");
    }

    #[test]
    fn test_format_fiat_idr_has_no_decimals() {
        let formatted = format_fiat(1234.5, "IDR");
        assert!(formatted.starts_with("Rp "));
        assert!(!formatted.contains(','));
        assert_eq!(formatted, "Rp 1.235");
        assert_eq!(format_fiat(25_000.0, "idr"), "Rp 25.000");
    }

    #[test]
    fn test_format_fiat_two_decimals() {
        assert_eq!(format_fiat(1234.5, "USD"), "$1,234.50");
        assert_eq!(format_fiat(0.5, "GBP"), "£0.50");
        assert_eq!(format_fiat(1_000_000.0, "SGD"), "S$1,000,000.00");
        assert_eq!(format_fiat(12.0, "EUR"), "EUR12.00");
    }

    #[test]
    fn test_format_sats_with_separator() {
        assert_eq!(format_sats_with_separator(0), "0");
        assert_eq!(format_sats_with_separator(999), "999");
        assert_eq!(format_sats_with_separator(1_234_567), "1,234,567");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh", 10), "bc1qxy2...");
    }
}
