//! Backend result normalization
//!
//! The Iris actor answers with Candid-style JSON: fallible operations return
//! `{"Ok": value}` or `{"Err": "message"}`, and closed enumerations are
//! single-key objects such as `{"Merchant": null}`. These helpers turn both
//! shapes into plain Rust values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

use crate::errors::{IrisError, IrisResult};
use crate::types::{CashoutStatus, Currency, PaymentMethod, PaymentStatus, Role};

// =============================================================================
// Ok / Err results
// =============================================================================

/// Backend `Result<T, String>` as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireResult<T> {
    Ok(T),
    Err(String),
}

impl<T> WireResult<T> {
    pub fn into_result(self) -> IrisResult<T> {
        match self {
            WireResult::Ok(value) => Ok(value),
            WireResult::Err(message) => Err(IrisError::Backend(message)),
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("an object with keys [{}]", keys.join(", "))
        }
    }
}

/// Unwrap an `Ok`/`Err` tagged result.
///
/// `Err` carries the backend message verbatim. Anything that is neither
/// shape, or an `Ok` payload of the wrong type, is a decode error.
pub fn unwrap_result<T: DeserializeOwned>(value: Value) -> IrisResult<T> {
    let shape = describe(&value);
    let mut map = match value {
        Value::Object(map) if map.len() == 1 => map,
        _ => {
            return Err(IrisError::Decode(format!(
                "expected an Ok/Err result, got {}",
                shape
            )))
        }
    };

    if let Some(ok) = map.remove("Ok") {
        return serde_json::from_value(ok).map_err(IrisError::from);
    }
    match map.remove("Err") {
        Some(Value::String(message)) => Err(IrisError::Backend(message)),
        Some(other) => Err(IrisError::Backend(other.to_string())),
        None => Err(IrisError::Decode(format!(
            "expected an Ok/Err result, got {}",
            shape
        ))),
    }
}

/// Decode a plain (non-result) payload
pub fn decode_value<T: DeserializeOwned>(value: Value) -> IrisResult<T> {
    serde_json::from_value(value).map_err(IrisError::from)
}

// =============================================================================
// Tagged variants
// =============================================================================

/// The single key of a variant object, or a description of why there is none
fn variant_key(value: &Value) -> Result<&str, String> {
    match value {
        Value::String(tag) => Ok(tag),
        Value::Object(map) if map.len() == 1 => map
            .keys()
            .next()
            .map(String::as_str)
            .ok_or_else(|| "{}".to_string()),
        Value::Object(map) if map.is_empty() => Err("{}".to_string()),
        Value::Object(map) => Err(format!(
            "multiple keys [{}]",
            map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        )),
        other => Err(other.to_string()),
    }
}

/// A closed enumeration encoded as a single-key object
pub trait TaggedVariant: Sized + Copy + 'static {
    const TYPE_NAME: &'static str;

    /// Every variant that has a wire form
    fn variants() -> &'static [Self];

    fn tag(&self) -> &'static str;

    fn from_tag(tag: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.tag() == tag)
    }

    /// Strict decode: exactly one recognized key
    fn decode_variant(value: &Value) -> IrisResult<Self> {
        let key = variant_key(value).map_err(|found| IrisError::UnknownVariant {
            type_name: Self::TYPE_NAME,
            found,
        })?;
        Self::from_tag(key).ok_or_else(|| IrisError::UnknownVariant {
            type_name: Self::TYPE_NAME,
            found: key.to_string(),
        })
    }

    /// Lenient decode for fields with a documented default
    fn decode_variant_lenient(value: &Value) -> Option<Self> {
        Self::decode_variant(value).ok()
    }

    fn encode_variant(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.tag().to_string(), Value::Null);
        Value::Object(map)
    }
}

impl TaggedVariant for Role {
    const TYPE_NAME: &'static str = "UserRole";

    fn variants() -> &'static [Self] {
        &[Role::Customer, Role::Merchant]
    }

    fn tag(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Merchant => "Merchant",
        }
    }
}

impl TaggedVariant for Currency {
    const TYPE_NAME: &'static str = "Currency";

    // BTC has no wire form
    fn variants() -> &'static [Self] {
        &Currency::FIAT
    }

    fn tag(&self) -> &'static str {
        self.code()
    }
}

impl TaggedVariant for PaymentStatus {
    const TYPE_NAME: &'static str = "PaymentStatus";

    fn variants() -> &'static [Self] {
        &[
            PaymentStatus::Pending,
            PaymentStatus::Confirmed,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ]
    }

    fn tag(&self) -> &'static str {
        self.label()
    }
}

impl TaggedVariant for PaymentMethod {
    const TYPE_NAME: &'static str = "PaymentMethod";

    fn variants() -> &'static [Self] {
        &PaymentMethod::ALL
    }

    fn tag(&self) -> &'static str {
        match self {
            PaymentMethod::FiatMock => "MockUSD",
            PaymentMethod::PlugWallet => "PlugWallet",
            PaymentMethod::ExternalWallet => "ExternalWallet",
            PaymentMethod::VirtualWallet => "VirtualWallet",
        }
    }
}

impl TaggedVariant for CashoutStatus {
    const TYPE_NAME: &'static str = "CashoutStatus";

    fn variants() -> &'static [Self] {
        &[
            CashoutStatus::Pending,
            CashoutStatus::Processing,
            CashoutStatus::Completed,
            CashoutStatus::Failed,
        ]
    }

    fn tag(&self) -> &'static str {
        match self {
            CashoutStatus::Pending => "Pending",
            CashoutStatus::Processing => "Processing",
            CashoutStatus::Completed => "Completed",
            CashoutStatus::Failed => "Failed",
        }
    }
}

// =============================================================================
// Safe calls
// =============================================================================

/// Await a fallible read and substitute `fallback` on error.
///
/// Only for non-critical reads. Payment submission must surface its errors.
pub async fn safe_call<T, F>(fut: F, fallback: T, context: &str) -> T
where
    F: Future<Output = IrisResult<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            log::error!("{} failed, using fallback: {}", context, e);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_ok() {
        let amount: u64 = unwrap_result(json!({"Ok": 26316})).unwrap();
        assert_eq!(amount, 26316);
        let unit: () = unwrap_result(json!({"Ok": null})).unwrap();
        assert_eq!(unit, ());
    }

    #[test]
    fn test_unwrap_err_is_verbatim() {
        let err = unwrap_result::<u64>(json!({"Err": "Invoice not found"})).unwrap_err();
        assert_eq!(err, IrisError::Backend("Invoice not found".to_string()));
    }

    #[test]
    fn test_profile_role_through_result() {
        let profile: Value = unwrap_result(json!({"Ok": {"role": {"Merchant": null}}})).unwrap();
        assert_eq!(Role::decode_variant(&profile["role"]).unwrap(), Role::Merchant);

        let err = unwrap_result::<Value>(json!({"Err": "boom"})).unwrap_err();
        assert_eq!(err, IrisError::Backend("boom".to_string()));
    }

    #[test]
    fn test_unwrap_rejects_other_shapes() {
        assert!(matches!(unwrap_result::<u64>(json!(5)), Err(IrisError::Decode(_))));
        assert!(matches!(
            unwrap_result::<u64>(json!({"Ok": 1, "Err": "x"})),
            Err(IrisError::Decode(_))
        ));
        assert!(matches!(
            unwrap_result::<u64>(json!({"Ok": "not a number"})),
            Err(IrisError::Decode(_))
        ));
    }

    #[test]
    fn test_wire_result_serde_shape() {
        let ok: WireResult<String> = serde_json::from_value(json!({"Ok": "abc"})).unwrap();
        assert_eq!(ok.into_result().unwrap(), "abc");
        let err: WireResult<String> = serde_json::from_value(json!({"Err": "nope"})).unwrap();
        assert!(err.into_result().unwrap_err().is_retryable());
    }

    #[test]
    fn test_strict_variant_decode() {
        assert_eq!(Role::decode_variant(&json!({"Merchant": null})).unwrap(), Role::Merchant);
        assert_eq!(Role::decode_variant(&json!("Customer")).unwrap(), Role::Customer);
        assert_eq!(
            PaymentMethod::decode_variant(&json!({"MockUSD": null})).unwrap(),
            PaymentMethod::FiatMock
        );
        assert!(matches!(
            Role::decode_variant(&json!({"Admin": null})),
            Err(IrisError::UnknownVariant { type_name: "UserRole", .. })
        ));
        assert!(Currency::decode_variant(&json!({"BTC": null})).is_err());
    }

    #[test]
    fn test_lenient_variant_decode() {
        assert_eq!(Role::decode_variant_lenient(&json!({})), None);
        assert_eq!(
            Role::decode_variant_lenient(&json!({"Customer": null, "Merchant": null})),
            None
        );
        assert_eq!(Role::decode_variant_lenient(&json!(42)), None);
        assert_eq!(
            Role::decode_variant_lenient(&json!({"Merchant": null})),
            Some(Role::Merchant)
        );
    }

    #[test]
    fn test_encode_variant() {
        assert_eq!(Currency::Gbp.encode_variant(), json!({"GBP": null}));
        assert_eq!(PaymentStatus::Completed.encode_variant(), json!({"Completed": null}));
        for status in PaymentStatus::variants() {
            assert_eq!(PaymentStatus::decode_variant(&status.encode_variant()).unwrap(), *status);
        }
    }

    #[tokio::test]
    async fn test_safe_call_falls_back() {
        let fallback = safe_call(
            async { Err::<u32, _>(IrisError::Transport("offline".to_string())) },
            7,
            "get_merchant_balance",
        )
        .await;
        assert_eq!(fallback, 7);

        let value = safe_call(async { Ok::<u32, IrisError>(3) }, 7, "get_merchant_balance").await;
        assert_eq!(value, 3);
    }
}
