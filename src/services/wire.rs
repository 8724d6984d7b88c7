//! Backend record shapes
//!
//! Candid records arrive as JSON with variants as single-key objects, `opt`
//! values as `[]`/`[x]` (or plain null/value from newer gateways) and
//! `nat64` values as either numbers or decimal strings. These DTOs accept
//! all of those and convert into the core value types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::{IrisError, IrisResult};
use crate::services::normalizer::TaggedVariant;
use crate::types::{
    CashoutRequest, Currency, Invoice, MerchantBalance, MerchantProfile, PaymentStatus, Role,
    StaticQr, UserProfile,
};

// =============================================================================
// Field decoders
// =============================================================================

/// `nat64` as a number or a decimal string
fn nat64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected nat64, got {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid nat64 {:?}: {}", s, e))),
        other => Err(D::Error::custom(format!("expected nat64, got {}", other))),
    }
}

/// Candid `opt text`: `[]`, `["x"]`, null or a plain string
fn opt_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

/// Encode an `opt text` the way [`opt_text`] reads it: `[]` or `["x"]`
fn candid_opt<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.as_slice().serialize(serializer)
}

/// Principals are carried in text form
fn principal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("__principal__")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireUserProfile {
    pub user_principal: Value,
    #[serde(default)]
    pub role: Value,
    #[serde(deserialize_with = "nat64")]
    pub created_at: u64,
}

impl From<WireUserProfile> for UserProfile {
    fn from(wire: WireUserProfile) -> Self {
        let role = Role::decode_variant_lenient(&wire.role);
        if role.is_none() {
            log::warn!("User profile has an unreadable role: {}", wire.role);
        }
        UserProfile {
            principal: principal_text(&wire.user_principal),
            role,
            created_at: wire.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireInvoice {
    pub id: String,
    pub merchant_id: String,
    #[serde(deserialize_with = "nat64")]
    pub amount_satoshi: u64,
    pub bitcoin_address: String,
    pub status: Value,
    #[serde(deserialize_with = "nat64")]
    pub created_at: u64,
    #[serde(deserialize_with = "nat64")]
    pub updated_at: u64,
    #[serde(default)]
    pub description: Value,
    pub currency: Value,
    pub fiat_amount: f64,
}

impl TryFrom<WireInvoice> for Invoice {
    type Error = IrisError;

    fn try_from(wire: WireInvoice) -> IrisResult<Self> {
        Ok(Invoice {
            status: PaymentStatus::decode_variant(&wire.status)?,
            currency: Currency::decode_variant(&wire.currency)?,
            description: opt_text(&wire.description),
            id: wire.id,
            merchant_id: wire.merchant_id,
            bitcoin_address: wire.bitcoin_address,
            fiat_amount: wire.fiat_amount,
            amount_satoshi: wire.amount_satoshi,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMerchantProfile {
    pub merchant_principal: Value,
    pub business_name: String,
    #[serde(deserialize_with = "nat64")]
    pub created_at: u64,
    #[serde(deserialize_with = "nat64")]
    pub total_invoices: u64,
    pub static_bitcoin_address: String,
}

impl From<WireMerchantProfile> for MerchantProfile {
    fn from(wire: WireMerchantProfile) -> Self {
        MerchantProfile {
            principal: principal_text(&wire.merchant_principal),
            business_name: wire.business_name,
            created_at: wire.created_at,
            total_invoices: wire.total_invoices,
            static_bitcoin_address: wire.static_bitcoin_address,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMerchantBalance {
    pub merchant_principal: Value,
    #[serde(deserialize_with = "nat64")]
    pub total_satoshi: u64,
    #[serde(deserialize_with = "nat64")]
    pub pending_satoshi: u64,
    #[serde(deserialize_with = "nat64")]
    pub confirmed_satoshi: u64,
    pub preferred_currency: Value,
    #[serde(deserialize_with = "nat64")]
    pub last_updated: u64,
}

impl TryFrom<WireMerchantBalance> for MerchantBalance {
    type Error = IrisError;

    fn try_from(wire: WireMerchantBalance) -> IrisResult<Self> {
        Ok(MerchantBalance {
            principal: principal_text(&wire.merchant_principal),
            total_satoshi: wire.total_satoshi,
            pending_satoshi: wire.pending_satoshi,
            confirmed_satoshi: wire.confirmed_satoshi,
            preferred_currency: Currency::decode_variant(&wire.preferred_currency)?,
            last_updated: wire.last_updated,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireQrCodeData {
    pub bitcoin_address: String,
    #[serde(deserialize_with = "nat64")]
    pub amount_satoshi: u64,
    pub invoice_id: String,
    pub bitcoin_uri: String,
}

impl From<WireQrCodeData> for StaticQr {
    fn from(wire: WireQrCodeData) -> Self {
        StaticQr {
            bitcoin_address: wire.bitcoin_address,
            bitcoin_uri: wire.bitcoin_uri,
            invoice_id: wire.invoice_id,
            amount_satoshi: wire.amount_satoshi,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCashoutRequest {
    pub id: String,
    pub merchant_principal: Value,
    #[serde(deserialize_with = "nat64")]
    pub amount_satoshi: u64,
    pub target_currency: Value,
    pub fiat_amount: f64,
    pub status: Value,
    #[serde(deserialize_with = "nat64")]
    pub created_at: u64,
    #[serde(default)]
    pub bank_details: Value,
}

impl TryFrom<WireCashoutRequest> for CashoutRequest {
    type Error = IrisError;

    fn try_from(wire: WireCashoutRequest) -> IrisResult<Self> {
        Ok(CashoutRequest {
            principal: principal_text(&wire.merchant_principal),
            target_currency: Currency::decode_variant(&wire.target_currency)?,
            status: crate::types::CashoutStatus::decode_variant(&wire.status)?,
            bank_details: opt_text(&wire.bank_details),
            id: wire.id,
            amount_satoshi: wire.amount_satoshi,
            fiat_amount: wire.fiat_amount,
            created_at: wire.created_at,
        })
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoiceRequest {
    pub merchant_id: String,
    pub fiat_amount: f64,
    pub currency: Value,
    #[serde(serialize_with = "candid_opt")]
    pub description: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn new(
        merchant_id: impl Into<String>,
        fiat_amount: f64,
        currency: Currency,
        description: Option<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            fiat_amount,
            currency: currency.encode_variant(),
            description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MockUsdPaymentRequest {
    pub invoice_id: String,
    pub usd_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCashoutRequest {
    pub amount_satoshi: u64,
    pub target_currency: Value,
    #[serde(serialize_with = "candid_opt")]
    pub bank_details: Option<String>,
}

// =============================================================================
// Submission results
// =============================================================================

/// What a payment submission's `Ok` payload told us
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionReceipt {
    pub status: Option<PaymentStatus>,
    /// Free-form reference string, when the backend sent one
    pub reference: Option<String>,
}

impl SubmissionReceipt {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => match PaymentStatus::from_tag(s) {
                Some(status) => Self { status: Some(status), reference: None },
                None => Self { status: None, reference: Some(s.clone()) },
            },
            other => Self {
                status: PaymentStatus::decode_variant_lenient(other),
                reference: None,
            },
        }
    }
}

/// The transaction reference if it looks like an identifier
pub fn usable_transaction_id(reference: Option<&str>) -> Option<&str> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty() && r.len() <= 64 && !r.chars().any(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_json() -> Value {
        json!({
            "id": "INV-1",
            "merchant_id": "static-merchant",
            "amount_satoshi": "26316",
            "bitcoin_address": "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
            "status": {"Pending": null},
            "created_at": 1_753_194_600_000_000_000u64,
            "updated_at": 1_753_194_600_000_000_000u64,
            "description": ["Coffee"],
            "currency": {"USD": null},
            "fiat_amount": 25.0
        })
    }

    #[test]
    fn test_invoice_from_candid_json() {
        let wire: WireInvoice = serde_json::from_value(invoice_json()).unwrap();
        let invoice = Invoice::try_from(wire).unwrap();
        assert_eq!(invoice.amount_satoshi, 26316);
        assert_eq!(invoice.currency, Currency::Usd);
        assert_eq!(invoice.status, PaymentStatus::Pending);
        assert_eq!(invoice.description.as_deref(), Some("Coffee"));
    }

    #[test]
    fn test_invoice_with_unknown_status_fails() {
        let mut json = invoice_json();
        json["status"] = json!({"Refunded": null});
        let wire: WireInvoice = serde_json::from_value(json).unwrap();
        assert!(matches!(
            Invoice::try_from(wire),
            Err(IrisError::UnknownVariant { type_name: "PaymentStatus", .. })
        ));
    }

    #[test]
    fn test_profile_with_malformed_role_is_roleless() {
        let wire: WireUserProfile = serde_json::from_value(json!({
            "user_principal": "2vxsx-fae",
            "role": {},
            "created_at": 1
        }))
        .unwrap();
        let profile = UserProfile::from(wire);
        assert_eq!(profile.role, None);
        assert_eq!(profile.principal, "2vxsx-fae");
    }

    #[test]
    fn test_opt_text_shapes() {
        assert_eq!(opt_text(&json!([])), None);
        assert_eq!(opt_text(&json!(null)), None);
        assert_eq!(opt_text(&json!("x")), Some("x".to_string()));
    }

    #[test]
    fn test_request_opt_fields_encode_as_candid_opt() {
        let request = CreateInvoiceRequest::new("m-1", 25.0, Currency::Usd, Some("Coffee".to_string()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["description"], json!(["Coffee"]));
        assert_eq!(opt_text(&json["description"]).as_deref(), Some("Coffee"));

        let request = CreateInvoiceRequest::new("m-1", 25.0, Currency::Usd, None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["description"], json!([]));

        let cashout = CreateCashoutRequest {
            amount_satoshi: 10_000,
            target_currency: Currency::Gbp.encode_variant(),
            bank_details: None,
        };
        assert_eq!(serde_json::to_value(&cashout).unwrap()["bank_details"], json!([]));
    }

    #[test]
    fn test_submission_receipt() {
        let receipt = SubmissionReceipt::from_value(&json!({"Confirmed": null}));
        assert_eq!(receipt.status, Some(PaymentStatus::Confirmed));

        let receipt = SubmissionReceipt::from_value(&json!("tx-7f3a"));
        assert_eq!(receipt.reference.as_deref(), Some("tx-7f3a"));
        assert_eq!(receipt.status, None);

        assert_eq!(usable_transaction_id(Some("tx-7f3a")), Some("tx-7f3a"));
        assert_eq!(usable_transaction_id(Some("Payment recorded")), None);
        assert_eq!(usable_transaction_id(Some("")), None);
    }
}
