//! QR payload classification
//!
//! Turns a raw scanned string into a [`ScannedPayload`]. Rules are tried in
//! order and the first match wins:
//!
//! 1. `bitcoin:` URI
//! 2. bare legacy or bech32 address
//! 3. invoice id (`IRIS-` prefix or a plain `[A-Za-z0-9-]+` token)
//! 4. JSON object with `invoice_id` or `bitcoin_address`
//! 5. anything else is unrecognized
//!
//! A bare legacy address is also a valid plain token, so rule 2 shadows
//! rule 3 for those strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::ScannedPayload;
use crate::utils::conversion::satoshi_to_btc;

const BITCOIN_SCHEME: &str = "bitcoin:";
const IRIS_INVOICE_PREFIX: &str = "IRIS-";

static LEGACY_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").expect("Failed to compile legacy address regex")
});

static BECH32_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^bc1[a-z0-9]{39,59}$").expect("Failed to compile bech32 address regex"));

static INVOICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Failed to compile invoice id regex"));

/// Classify a scanned string. Never fails.
pub fn classify(raw: &str) -> ScannedPayload {
    let input = raw.trim();

    if let Some(payload) = parse_bitcoin_uri(input) {
        return payload;
    }

    if LEGACY_ADDRESS.is_match(input) || BECH32_ADDRESS.is_match(input) {
        return ScannedPayload::bitcoin_address(input);
    }

    if input.starts_with(IRIS_INVOICE_PREFIX) || INVOICE_TOKEN.is_match(input) {
        return ScannedPayload::InvoiceReference { id: input.to_string() };
    }

    if let Some(payload) = parse_json_payload(input) {
        return payload;
    }

    log::debug!("Unrecognized QR payload ({} chars)", raw.len());
    ScannedPayload::Unrecognized { raw: raw.to_string() }
}

fn parse_bitcoin_uri(input: &str) -> Option<ScannedPayload> {
    let scheme = input.get(..BITCOIN_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BITCOIN_SCHEME) {
        return None;
    }

    let url = url::Url::parse(input).ok()?;

    // "bitcoin://addr" parses the address as a host
    let address = match url.host_str() {
        Some(host) if url.path().is_empty() || url.path() == "/" => host.to_string(),
        _ => url.path().trim_start_matches('/').to_string(),
    };
    if address.is_empty() {
        return None;
    }

    let mut amount = None;
    let mut label = None;
    let mut message = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "amount" => amount = Some(value.into_owned()),
            "label" => label = Some(value.into_owned()),
            "message" => message = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(ScannedPayload::BitcoinUri { address, amount, label, message })
}

fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_json_payload(input: &str) -> Option<ScannedPayload> {
    let value: Value = serde_json::from_str(input).ok()?;
    let object = value.as_object()?;

    if let Some(id) = json_text(object.get("invoice_id")) {
        return Some(ScannedPayload::InvoiceReference { id });
    }

    let address = json_text(object.get("bitcoin_address"))?;
    Some(ScannedPayload::BitcoinUri {
        address,
        amount: json_text(object.get("amount")),
        label: json_text(object.get("label")),
        message: json_text(object.get("message")),
    })
}

/// Build a payment URI: `bitcoin:<addr>?amount=<btc>&label=..&message=..`
pub fn build_bitcoin_uri(
    address: &str,
    amount_satoshi: u64,
    label: Option<&str>,
    message: Option<&str>,
) -> String {
    let mut uri = format!("{}{}?amount={}", BITCOIN_SCHEME, address, satoshi_to_btc(amount_satoshi));

    if let Some(label) = label {
        uri.push_str(&format!("&label={}", urlencoding::encode(label)));
    }
    if let Some(message) = message {
        uri.push_str(&format!("&message={}", urlencoding::encode(message)));
    }

    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    const BECH32: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";
    const LEGACY: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[test]
    fn test_bitcoin_uri_with_params() {
        let payload = classify("bitcoin:bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh?amount=0.001&label=Warung%20Kopi&message=Thanks");
        assert_eq!(
            payload,
            ScannedPayload::BitcoinUri {
                address: BECH32.to_string(),
                amount: Some("0.001".to_string()),
                label: Some("Warung Kopi".to_string()),
                message: Some("Thanks".to_string()),
            }
        );
        assert_eq!(payload.embedded_btc_amount(), Some(0.001));
    }

    #[test]
    fn test_legacy_uri_with_amount_and_label() {
        let payload = classify("bitcoin:1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa?amount=0.001&label=Shop");
        match payload {
            ScannedPayload::BitcoinUri { address, amount, label, message } => {
                assert_eq!(address, LEGACY);
                assert_eq!(amount.as_deref(), Some("0.001"));
                assert_eq!(label.as_deref(), Some("Shop"));
                assert_eq!(message, None);
            }
            other => panic!("expected a bitcoin URI, got {:?}", other),
        }
    }

    #[test]
    fn test_bitcoin_uri_without_params() {
        let payload = classify(&format!("bitcoin:{}", LEGACY));
        assert_eq!(payload, ScannedPayload::bitcoin_address(LEGACY));
        assert_eq!(payload.embedded_btc_amount(), None);
    }

    #[test]
    fn test_bare_addresses() {
        assert_eq!(classify(BECH32), ScannedPayload::bitcoin_address(BECH32));
        assert_eq!(classify(LEGACY), ScannedPayload::bitcoin_address(LEGACY));
        assert_eq!(
            classify("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"),
            ScannedPayload::bitcoin_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy")
        );
    }

    #[test]
    fn test_address_shadows_invoice_token() {
        // Also a valid [A-Za-z0-9-]+ token; the address rule runs first
        let ambiguous = "1111111111111111111111111111";
        assert!(INVOICE_TOKEN.is_match(ambiguous));
        assert_eq!(classify(ambiguous), ScannedPayload::bitcoin_address(ambiguous));
    }

    #[test]
    fn test_invoice_references() {
        assert_eq!(
            classify("IRIS-1753194600-42"),
            ScannedPayload::InvoiceReference { id: "IRIS-1753194600-42".to_string() }
        );
        assert_eq!(
            classify("IRIS-ABC123"),
            ScannedPayload::InvoiceReference { id: "IRIS-ABC123".to_string() }
        );
        assert_eq!(classify("INV-123").invoice_id(), Some("INV-123"));
        assert_eq!(classify("  abc123  ").invoice_id(), Some("abc123"));
    }

    #[test]
    fn test_json_payloads() {
        assert_eq!(classify(r#"{"invoice_id": "INV-9", "bitcoin_address": "x"}"#).invoice_id(), Some("INV-9"));

        let payload = classify(&format!(r#"{{"bitcoin_address": "{}", "amount": 0.5}}"#, BECH32));
        assert_eq!(payload.address(), Some(BECH32));
        assert_eq!(payload.embedded_btc_amount(), Some(0.5));
    }

    #[test]
    fn test_unrecognized_keeps_raw() {
        assert_eq!(
            classify("not a valid payload!!"),
            ScannedPayload::Unrecognized { raw: "not a valid payload!!".to_string() }
        );
        let raw = "https://example.com/pay?x=1";
        assert_eq!(classify(raw), ScannedPayload::Unrecognized { raw: raw.to_string() });
        assert_eq!(classify(""), ScannedPayload::Unrecognized { raw: String::new() });
        assert!(!classify(r#"{"foo": 1}"#).is_recognized());
        assert!(!classify("bitcoin:").is_recognized());
    }

    #[test]
    fn test_build_bitcoin_uri() {
        assert_eq!(
            build_bitcoin_uri(BECH32, 26_316, Some("Kopi Kenangan"), None),
            format!("bitcoin:{}?amount=0.00026316&label=Kopi%20Kenangan", BECH32)
        );
        let uri = build_bitcoin_uri(LEGACY, 100_000_000, None, Some("thanks!"));
        assert_eq!(classify(&uri).address(), Some(LEGACY));
    }
}
