//! Typed client for the Iris backend actor

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::rc::Rc;
use std::time::Duration;

use crate::config::IrisConfig;
use crate::errors::{IrisError, IrisResult};
use crate::services::actor::{with_timeout, ActorHandle};
use crate::services::normalizer::{decode_value, unwrap_result, TaggedVariant};
use crate::services::wire::{
    CreateCashoutRequest, CreateInvoiceRequest, MockUsdPaymentRequest, SubmissionReceipt,
    WireCashoutRequest, WireInvoice, WireMerchantBalance, WireMerchantProfile, WireQrCodeData,
    WireUserProfile,
};
use crate::types::{
    CashoutRequest, Currency, Invoice, MerchantBalance, MerchantProfile, PaymentMethod,
    PaymentStatus, Role, StaticQr, UserProfile,
};
use crate::utils::validation;

/// Shared handle to the backend. Cheap to clone.
#[derive(Clone)]
pub struct IrisBackend {
    actor: Rc<ActorHandle>,
    submission_timeout: Duration,
}

impl IrisBackend {
    pub fn new(actor: Rc<ActorHandle>, submission_timeout: Duration) -> Self {
        Self { actor, submission_timeout }
    }

    pub fn from_config(config: &IrisConfig) -> Self {
        Self::new(
            Rc::new(ActorHandle::gateway(config.clone())),
            config.submission_timeout(),
        )
    }

    pub fn submission_timeout(&self) -> Duration {
        self.submission_timeout
    }

    async fn call_result<T: DeserializeOwned>(&self, method: &str, args: Value) -> IrisResult<T> {
        let value = self.actor.call(method, args).await?;
        unwrap_result(value)
    }

    async fn call_plain<T: DeserializeOwned>(&self, method: &str, args: Value) -> IrisResult<T> {
        let value = self.actor.call(method, args).await?;
        decode_value(value)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn get_user_profile(&self) -> IrisResult<UserProfile> {
        let wire: WireUserProfile = self.call_result("get_user_profile", json!([])).await?;
        Ok(wire.into())
    }

    pub async fn register_user(&self, role: Role) -> IrisResult<UserProfile> {
        let args = json!([{ "role": role.encode_variant() }]);
        let wire: WireUserProfile = self.call_result("register_user", args).await?;
        log::info!("Registered user as {:?}", role);
        Ok(wire.into())
    }

    // =========================================================================
    // Merchants
    // =========================================================================

    pub async fn get_merchant_profile(&self) -> IrisResult<MerchantProfile> {
        let wire: WireMerchantProfile = self.call_result("get_merchant_profile", json!([])).await?;
        Ok(wire.into())
    }

    pub async fn register_merchant(&self, business_name: &str) -> IrisResult<MerchantProfile> {
        validation::validate_business_name(business_name)?;
        let args = json!([{ "business_name": business_name.trim() }]);
        let wire: WireMerchantProfile = self.call_result("register_merchant", args).await?;
        Ok(wire.into())
    }

    pub async fn get_merchant_balance(&self) -> IrisResult<MerchantBalance> {
        let wire: WireMerchantBalance = self.call_result("get_merchant_balance", json!([])).await?;
        wire.try_into()
    }

    pub async fn get_merchant_static_qr(&self) -> IrisResult<StaticQr> {
        let wire: WireQrCodeData = self.call_result("get_merchant_static_qr", json!([])).await?;
        Ok(wire.into())
    }

    pub async fn set_preferred_currency(&self, currency: Currency) -> IrisResult<()> {
        if !currency.is_fiat() {
            return Err(IrisError::validation("Preferred currency must be a fiat currency"));
        }
        self.call_result("set_preferred_currency", json!([currency.encode_variant()]))
            .await
    }

    pub async fn create_cashout_request(
        &self,
        amount_satoshi: u64,
        target_currency: Currency,
        bank_details: Option<String>,
    ) -> IrisResult<CashoutRequest> {
        validation::validate_cashout_amount(amount_satoshi)?;
        if !target_currency.is_fiat() {
            return Err(IrisError::validation("Cashout currency must be a fiat currency"));
        }
        let request = CreateCashoutRequest {
            amount_satoshi,
            target_currency: target_currency.encode_variant(),
            bank_details,
        };
        let wire: WireCashoutRequest = self
            .call_result("create_cashout_request", json!([request]))
            .await?;
        wire.try_into()
    }

    pub async fn get_my_cashout_requests(&self) -> IrisResult<Vec<CashoutRequest>> {
        let wire: Vec<WireCashoutRequest> =
            self.call_result("get_my_cashout_requests", json!([])).await?;
        wire.into_iter().map(CashoutRequest::try_from).collect()
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    pub async fn get_my_invoices(&self) -> IrisResult<Vec<Invoice>> {
        let wire: Vec<WireInvoice> = self.call_result("get_my_invoices", json!([])).await?;
        wire.into_iter().map(Invoice::try_from).collect()
    }

    pub async fn get_invoice_by_qr_scan(&self, invoice_id: &str) -> IrisResult<Invoice> {
        let wire: WireInvoice = self
            .call_result("get_invoice_by_qr_scan", json!([invoice_id]))
            .await?;
        wire.try_into()
    }

    pub async fn create_invoice(&self, request: CreateInvoiceRequest) -> IrisResult<Invoice> {
        validation::validate_fiat_amount(request.fiat_amount)?;
        validation::validate_description(request.description.as_deref())?;
        let wire: WireInvoice = self.call_result("create_invoice", json!([request])).await?;
        let invoice = Invoice::try_from(wire)?;
        log::info!("Created invoice {}", invoice.id);
        Ok(invoice)
    }

    pub async fn check_invoice_status(&self, invoice_id: &str) -> IrisResult<PaymentStatus> {
        let value: Value = self
            .call_result("check_invoice_status", json!([invoice_id]))
            .await?;
        PaymentStatus::decode_variant(&value)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    async fn submit(&self, method: &str, args: Value) -> IrisResult<SubmissionReceipt> {
        let value: Value =
            with_timeout(self.call_result(method, args), self.submission_timeout, method).await?;
        Ok(SubmissionReceipt::from_value(&value))
    }

    pub async fn simulate_usd_payment(
        &self,
        invoice_id: &str,
        usd_amount: f64,
    ) -> IrisResult<SubmissionReceipt> {
        let request = MockUsdPaymentRequest {
            invoice_id: invoice_id.to_string(),
            usd_amount,
        };
        self.submit("simulate_usd_payment", json!([request])).await
    }

    pub async fn simulate_plug_wallet_payment(&self, invoice_id: &str) -> IrisResult<SubmissionReceipt> {
        self.submit("simulate_plug_wallet_payment", json!([invoice_id]))
            .await
    }

    pub async fn simulate_external_wallet_payment(
        &self,
        invoice_id: &str,
    ) -> IrisResult<SubmissionReceipt> {
        self.submit("simulate_external_wallet_payment", json!([invoice_id]))
            .await
    }

    // =========================================================================
    // Rates and catalog
    // =========================================================================

    /// Live USD per BTC rate
    pub async fn get_usd_to_btc_rate(&self) -> IrisResult<f64> {
        let rate: f64 = self.call_plain("get_usd_to_btc_rate", json!([])).await?;
        if rate.is_finite() && rate > 0.0 {
            Ok(rate)
        } else {
            Err(IrisError::Decode(format!("invalid USD rate {}", rate)))
        }
    }

    /// Methods the backend accepts. Unknown tags are skipped.
    pub async fn get_payment_methods(&self) -> IrisResult<Vec<PaymentMethod>> {
        let values: Vec<Value> = self.call_plain("get_payment_methods", json!([])).await?;
        Ok(values
            .iter()
            .filter_map(|value| match PaymentMethod::decode_variant(value) {
                Ok(method) => Some(method),
                Err(e) => {
                    log::warn!("Skipping payment method: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::actor::mock::mock_actor;

    fn backend() -> (Rc<crate::services::actor::mock::MockTransport>, IrisBackend) {
        let (mock, actor) = mock_actor();
        (mock, IrisBackend::new(actor, Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn test_backend_err_is_verbatim() {
        let (mock, backend) = backend();
        mock.respond("get_invoice_by_qr_scan", json!({"Err": "Invoice not found"}));
        let err = backend.get_invoice_by_qr_scan("INV-404").await.unwrap_err();
        assert_eq!(err, IrisError::Backend("Invoice not found".to_string()));
        assert_eq!(mock.last_args("get_invoice_by_qr_scan"), Some(json!(["INV-404"])));
    }

    #[tokio::test]
    async fn test_transport_error_is_generic_for_users() {
        let (mock, backend) = backend();
        mock.fail("get_user_profile", "connection refused");
        let err = backend.get_user_profile().await.unwrap_err();
        assert!(matches!(err, IrisError::Transport(_)));
        assert_eq!(err.user_message(), crate::errors::TRANSPORT_USER_MESSAGE);
    }

    #[tokio::test]
    async fn test_submission_times_out() {
        let (mock, backend) = backend();
        mock.respond_slowly(
            "simulate_plug_wallet_payment",
            json!({"Ok": {"Confirmed": null}}),
            Duration::from_millis(300),
        );
        let err = backend.simulate_plug_wallet_payment("INV-1").await.unwrap_err();
        assert!(matches!(err, IrisError::Backend(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_payment_methods_skip_unknown_tags() {
        let (mock, backend) = backend();
        mock.respond(
            "get_payment_methods",
            json!([{"MockUSD": null}, {"Lightning": null}, {"PlugWallet": null}]),
        );
        let methods = backend.get_payment_methods().await.unwrap();
        assert_eq!(methods, vec![PaymentMethod::FiatMock, PaymentMethod::PlugWallet]);
    }

    #[tokio::test]
    async fn test_validation_runs_before_any_call() {
        let (mock, backend) = backend();
        assert!(backend.register_merchant("  ").await.unwrap_err().is_validation());
        assert!(backend
            .create_cashout_request(0, Currency::Usd, None)
            .await
            .unwrap_err()
            .is_validation());
        assert!(backend.set_preferred_currency(Currency::Btc).await.is_err());
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_must_be_positive() {
        let (mock, backend) = backend();
        mock.respond("get_usd_to_btc_rate", json!(0.0));
        assert!(matches!(backend.get_usd_to_btc_rate().await, Err(IrisError::Decode(_))));
    }
}
