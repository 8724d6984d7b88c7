//! Payment orchestration
//!
//! A [`PaymentFlow`] owns one payment attempt: the scanned payload, the
//! amount and currency the customer typed, the chosen method, and the
//! submission result.
//!
//! Two counters guard against late async results. `attempt` changes on
//! `begin`/`cancel`/`reset` and protects invoice resolution and submission.
//! `generation` also changes on every amount or currency edit and protects
//! rate conversions, so only the most recent edit is ever applied.

use std::cell::{Cell, RefCell};

use crate::errors::{IrisError, IrisResult};
use crate::services::backend::IrisBackend;
use crate::services::normalizer::safe_call;
use crate::services::payment_methods::{method_for_currency_change, PaymentMethodCatalog};
use crate::services::wire::{usable_transaction_id, CreateInvoiceRequest};
use crate::types::{
    Currency, Invoice, PaymentMethod, PaymentOutcome, PaymentStatus, ScannedPayload,
};
use crate::utils::conversion::{btc_to_satoshi, rate_table, RateTable};
use crate::utils::time::now_millis;
use crate::utils::validation;

/// Merchant id used for invoices created from a bare address scan
pub const STATIC_MERCHANT_ID: &str = "static-merchant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowPhase {
    #[default]
    Idle,
    ScannedAwaitingAmount,
    AwaitingMethodSelection,
    Converting,
    Submitting,
    Succeeded,
    Failed,
}

/// Amount expressed in BTC at a given rate
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub currency: Currency,
    /// Units of `currency` per 1 BTC
    pub rate: f64,
    pub btc_amount: f64,
    pub amount_satoshi: u64,
}

impl Conversion {
    /// A resolved invoice for the same amount and currency fixes the satoshi
    /// value; otherwise it is derived from the rate.
    pub fn compute(amount: f64, currency: Currency, rate: f64, invoice: Option<&Invoice>) -> Self {
        let invoice = invoice.filter(|i| {
            i.amount_satoshi > 0 && i.currency == currency && i.fiat_amount == amount
        });

        let (btc_amount, amount_satoshi) = match invoice {
            Some(invoice) => (invoice.amount_btc(), invoice.amount_satoshi),
            None if currency == Currency::Btc => (amount, btc_to_satoshi(amount)),
            None => {
                let btc = amount / rate;
                (btc, btc_to_satoshi(btc))
            }
        };

        Self { amount, currency, rate, btc_amount, amount_satoshi }
    }
}

/// Everything the presentation layer needs to render the flow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowState {
    pub phase: FlowPhase,
    pub payload: Option<ScannedPayload>,
    pub invoice: Option<Invoice>,
    pub amount: Option<f64>,
    pub currency: Currency,
    pub method: Option<PaymentMethod>,
    pub conversion: Option<Conversion>,
    pub outcome: Option<PaymentOutcome>,
    /// User-facing message of the last failure
    pub last_error: Option<String>,
    pub generation: u64,
}

pub type FlowListener = Box<dyn Fn(&FlowState)>;

pub struct PaymentFlow {
    backend: IrisBackend,
    catalog: RefCell<PaymentMethodCatalog>,
    rates: RateTable,
    state: RefCell<FlowState>,
    attempt: Cell<u64>,
    generation: Cell<u64>,
    listener: RefCell<Option<FlowListener>>,
}

impl PaymentFlow {
    pub fn new(backend: IrisBackend, catalog: PaymentMethodCatalog, rates: RateTable) -> Self {
        Self {
            backend,
            catalog: RefCell::new(catalog),
            rates,
            state: RefCell::new(FlowState::default()),
            attempt: Cell::new(0),
            generation: Cell::new(0),
            listener: RefCell::new(None),
        }
    }

    /// Flow using the built-in catalog and the process-wide rate table
    pub fn with_backend(backend: IrisBackend) -> Self {
        Self::new(backend, PaymentMethodCatalog::default(), rate_table().clone())
    }

    pub fn on_change(&self, listener: FlowListener) {
        *self.listener.borrow_mut() = Some(listener);
    }

    pub fn set_catalog(&self, catalog: PaymentMethodCatalog) {
        *self.catalog.borrow_mut() = catalog;
    }

    /// Reload the catalog from the backend
    pub async fn refresh_catalog(&self) {
        let catalog = PaymentMethodCatalog::load(&self.backend).await;
        self.set_catalog(catalog);
    }

    pub fn catalog(&self) -> PaymentMethodCatalog {
        self.catalog.borrow().clone()
    }

    pub fn snapshot(&self) -> FlowState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> FlowPhase {
        self.state.borrow().phase
    }

    // =========================================================================
    // State plumbing
    // =========================================================================

    fn notify(&self) {
        if let Some(listener) = self.listener.borrow().as_ref() {
            let snapshot = self.snapshot();
            listener(&snapshot);
        }
    }

    fn update(&self, f: impl FnOnce(&mut FlowState)) {
        {
            let mut state = self.state.borrow_mut();
            f(&mut state);
            state.generation = self.generation.get();
        }
        self.notify();
    }

    fn replace_state(&self, state: FlowState) {
        *self.state.borrow_mut() = state;
        self.notify();
    }

    fn bump_generation(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    fn bump_attempt(&self) -> u64 {
        let next = self.attempt.get() + 1;
        self.attempt.set(next);
        self.bump_generation();
        next
    }

    fn ensure_editable(&self) -> IrisResult<()> {
        if self.phase() == FlowPhase::Idle {
            return Err(IrisError::validation("Scan a QR code first"));
        }
        self.ensure_unlocked()
    }

    fn ensure_unlocked(&self) -> IrisResult<()> {
        match self.phase() {
            FlowPhase::Submitting => Err(IrisError::validation("A payment is already being submitted")),
            FlowPhase::Succeeded => Err(IrisError::validation("This payment has already been completed")),
            _ => Ok(()),
        }
    }

    /// Submitting and Succeeded flows only change through submit, cancel or reset
    fn is_locked(&self) -> bool {
        matches!(self.phase(), FlowPhase::Submitting | FlowPhase::Succeeded)
    }

    /// Invoices created for a bare address are bound to the amount and
    /// currency they were created with.
    fn drop_static_invoice(state: &mut FlowState) {
        if state.payload.as_ref().and_then(ScannedPayload::invoice_id).is_none() {
            state.invoice = None;
        }
    }

    /// Rate for `currency`, live when the backend answers
    async fn rate_for(&self, currency: Currency) -> f64 {
        if currency == Currency::Btc {
            return 1.0;
        }
        let fallback = self
            .rates
            .per_btc(currency)
            .unwrap_or_else(|| self.rates.unknown_code_rate());
        let rates = &self.rates;
        safe_call(
            async {
                self.backend
                    .get_usd_to_btc_rate()
                    .await
                    .map(|usd_per_btc| rates.live_rate(usd_per_btc, currency))
            },
            fallback,
            "get_usd_to_btc_rate",
        )
        .await
    }

    fn validate_amount(amount: Option<f64>, currency: Currency) -> IrisResult<f64> {
        let amount = amount.ok_or_else(|| IrisError::validation("Please enter an amount"))?;
        if currency == Currency::Btc {
            if !(amount.is_finite() && amount > 0.0) {
                return Err(IrisError::validation("Please enter a valid Bitcoin amount"));
            }
            validation::validate_satoshi_amount(btc_to_satoshi(amount))?;
        } else {
            validation::validate_fiat_amount(amount)?;
        }
        Ok(amount)
    }

    fn check_payload(payload: &ScannedPayload) -> IrisResult<()> {
        match payload {
            ScannedPayload::Unrecognized { .. } => Err(IrisError::validation(
                "This QR code is not a Bitcoin address or Iris invoice",
            )),
            ScannedPayload::BitcoinUri { address, .. } => validation::validate_bitcoin_address(address),
            ScannedPayload::InvoiceReference { id } if id.trim().is_empty() => {
                Err(IrisError::validation("Invoice id cannot be empty"))
            }
            ScannedPayload::InvoiceReference { .. } => Ok(()),
        }
    }

    // =========================================================================
    // Scan and edit
    // =========================================================================

    /// Start a new attempt from a classified scan
    pub fn begin(&self, payload: ScannedPayload) -> IrisResult<FlowPhase> {
        self.bump_attempt();

        if let Err(e) = Self::check_payload(&payload) {
            log::warn!("Rejected scanned payload: {}", e);
            self.replace_state(FlowState {
                generation: self.generation.get(),
                ..FlowState::default()
            });
            return Err(e);
        }

        let mut state = FlowState {
            generation: self.generation.get(),
            payload: Some(payload.clone()),
            ..FlowState::default()
        };

        let embedded = payload
            .embedded_btc_amount()
            .filter(|btc| validation::is_valid_satoshi_amount(btc_to_satoshi(*btc)));
        match embedded {
            Some(btc) => {
                state.currency = Currency::Btc;
                state.amount = Some(btc);
                state.conversion = Some(Conversion::compute(btc, Currency::Btc, 1.0, None));
                state.phase = FlowPhase::AwaitingMethodSelection;
            }
            None => state.phase = FlowPhase::ScannedAwaitingAmount,
        }

        log::info!("Payment flow started ({:?})", state.phase);
        let phase = state.phase;
        self.replace_state(state);
        Ok(phase)
    }

    /// Fetch the invoice behind an invoice reference and prefill from it
    pub async fn resolve_invoice(&self) -> IrisResult<Option<Invoice>> {
        self.ensure_unlocked()?;
        let id = {
            let state = self.state.borrow();
            state
                .payload
                .as_ref()
                .and_then(ScannedPayload::invoice_id)
                .map(str::to_string)
        };
        let Some(id) = id else {
            return Ok(None);
        };

        let attempt = self.attempt.get();
        let result = self.backend.get_invoice_by_qr_scan(&id).await;
        if self.attempt.get() != attempt {
            return Err(IrisError::Cancelled);
        }

        let invoice = match result {
            Ok(invoice) => invoice,
            Err(e) => {
                log::error!("Failed to resolve invoice {}: {}", id, e);
                self.update(|state| state.last_error = Some(e.user_message()));
                return Err(e);
            }
        };

        if invoice.status.is_terminal() {
            log::warn!("Invoice {} is already {}", invoice.id, invoice.status.label());
        }

        let rate = if invoice.amount_satoshi > 0 {
            invoice.fiat_amount / invoice.amount_btc()
        } else if invoice.fiat_amount > 0.0 {
            log::warn!("Invoice {} has no satoshi amount, using the current rate", invoice.id);
            let rate = self.rate_for(invoice.currency).await;
            if self.attempt.get() != attempt {
                return Err(IrisError::Cancelled);
            }
            rate
        } else {
            0.0
        };

        if self.is_locked() {
            log::debug!("Invoice {} resolved after submission started, not applied", invoice.id);
            return Ok(Some(invoice));
        }

        let resolved = invoice.clone();
        self.bump_generation();
        self.update(move |state| {
            if invoice.fiat_amount > 0.0 {
                state.amount = Some(invoice.fiat_amount);
                state.currency = invoice.currency;
                state.method = method_for_currency_change(state.method, invoice.currency);
                state.conversion = Some(Conversion::compute(
                    invoice.fiat_amount,
                    invoice.currency,
                    rate,
                    Some(&invoice),
                ));
                state.phase = FlowPhase::AwaitingMethodSelection;
            }
            state.last_error = None;
            state.invoice = Some(invoice);
        });
        Ok(Some(resolved))
    }

    /// Record a new amount and convert it. `None` means no conversion was
    /// applied: the amount was invalid or a newer edit superseded this one.
    pub async fn set_amount(&self, amount: f64) -> IrisResult<Option<Conversion>> {
        self.ensure_editable()?;
        let token = self.bump_generation();
        self.update(|state| {
            state.amount = Some(amount);
            Self::drop_static_invoice(state);
        });
        self.refresh_conversion(token).await
    }

    /// Switch currency, applying the fiat-method coupling rule
    pub async fn set_currency(&self, currency: Currency) -> IrisResult<Option<Conversion>> {
        self.ensure_editable()?;
        let token = self.bump_generation();
        self.update(|state| {
            state.currency = currency;
            state.method = method_for_currency_change(state.method, currency);
            Self::drop_static_invoice(state);
        });
        self.refresh_conversion(token).await
    }

    async fn refresh_conversion(&self, token: u64) -> IrisResult<Option<Conversion>> {
        let (amount, currency) = {
            let state = self.state.borrow();
            (state.amount, state.currency)
        };

        let amount = match Self::validate_amount(amount, currency) {
            Ok(amount) => amount,
            Err(_) => {
                self.update(|state| {
                    state.conversion = None;
                    state.phase = FlowPhase::ScannedAwaitingAmount;
                });
                return Ok(None);
            }
        };

        self.update(|state| state.phase = FlowPhase::Converting);
        let rate = self.rate_for(currency).await;

        if self.generation.get() != token || self.is_locked() {
            log::debug!("Discarding stale {} conversion", currency);
            return Ok(None);
        }

        let conversion = {
            let state = self.state.borrow();
            Conversion::compute(amount, currency, rate, state.invoice.as_ref())
        };
        let applied = conversion.clone();
        self.update(move |state| {
            state.conversion = Some(conversion);
            state.phase = FlowPhase::AwaitingMethodSelection;
        });
        Ok(Some(applied))
    }

    pub fn select_method(&self, method: PaymentMethod) -> IrisResult<()> {
        self.ensure_editable()?;
        let currency = self.state.borrow().currency;
        if !self.catalog.borrow().is_selectable(method) {
            return Err(IrisError::UnsupportedMethod { method, currency });
        }
        self.update(|state| state.method = Some(method));
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the payment.
    ///
    /// Validation problems are returned without touching the flow. Backend
    /// problems move it to `Failed`, keeping everything needed to retry.
    pub async fn submit(&self) -> IrisResult<PaymentOutcome> {
        self.ensure_editable()?;
        if self.phase() == FlowPhase::Converting {
            return Err(IrisError::validation("Please wait for the conversion to finish"));
        }
        let state = self.snapshot();

        let method = state
            .method
            .ok_or_else(|| IrisError::validation("Please select a payment method"))?;
        let amount = Self::validate_amount(state.amount, state.currency)?;
        if !self.catalog.borrow().supports(method, state.currency) {
            return Err(IrisError::UnsupportedMethod { method, currency: state.currency });
        }
        let payload = state
            .payload
            .clone()
            .ok_or_else(|| IrisError::validation("Scan a QR code first"))?;
        if payload.invoice_id().is_some() && state.invoice.is_none() {
            return Err(IrisError::validation("The invoice has not been loaded yet"));
        }
        if let Some(conversion) = Self::reusable_conversion(&state, amount) {
            validation::validate_satoshi_amount(conversion.amount_satoshi)?;
        }

        let attempt = self.attempt.get();
        // Conversions still in flight are stale from here on
        self.bump_generation();
        self.update(|s| {
            s.phase = FlowPhase::Submitting;
            s.last_error = None;
        });

        let result = self.run_submission(attempt, &state, &payload, method, amount).await;

        if self.attempt.get() != attempt {
            log::info!("Ignoring payment result for a cancelled flow");
            return Err(IrisError::Cancelled);
        }

        match result {
            Ok(outcome) => {
                log::info!(
                    "Payment {} succeeded for invoice {} ({})",
                    outcome.transaction_id,
                    outcome.invoice_id,
                    outcome.status.label()
                );
                let stored = outcome.clone();
                self.update(move |s| {
                    s.outcome = Some(stored);
                    s.phase = FlowPhase::Succeeded;
                });
                Ok(outcome)
            }
            Err(IrisError::Cancelled) => Err(IrisError::Cancelled),
            Err(e) => {
                log::error!("Payment via {} failed: {}", method.display_name(), e);
                let message = e.user_message();
                self.update(move |s| {
                    s.phase = FlowPhase::Failed;
                    s.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    async fn run_submission(
        &self,
        attempt: u64,
        state: &FlowState,
        payload: &ScannedPayload,
        method: PaymentMethod,
        amount: f64,
    ) -> IrisResult<PaymentOutcome> {
        let currency = state.currency;
        let conversion = match Self::reusable_conversion(state, amount) {
            Some(c) => c.clone(),
            None => {
                let rate = self.rate_for(currency).await;
                Conversion::compute(amount, currency, rate, state.invoice.as_ref())
            }
        };
        validation::validate_satoshi_amount(conversion.amount_satoshi)?;

        let invoice_id = match &state.invoice {
            Some(invoice) => invoice.id.clone(),
            None => {
                let invoice = self.create_static_invoice(&conversion).await?;
                if self.attempt.get() != attempt {
                    return Err(IrisError::Cancelled);
                }
                let id = invoice.id.clone();
                self.update(|s| s.invoice = Some(invoice));
                id
            }
        };

        log::info!("Submitting {} payment for invoice {}", method.display_name(), invoice_id);
        let receipt = match method {
            PaymentMethod::FiatMock => {
                let usd_amount = self.rates.to_usd(amount, currency);
                self.backend.simulate_usd_payment(&invoice_id, usd_amount).await?
            }
            PaymentMethod::PlugWallet => self.backend.simulate_plug_wallet_payment(&invoice_id).await?,
            PaymentMethod::ExternalWallet => {
                self.backend.simulate_external_wallet_payment(&invoice_id).await?
            }
            PaymentMethod::VirtualWallet => {
                return Err(IrisError::UnsupportedMethod { method, currency })
            }
        };
        if self.attempt.get() != attempt {
            return Err(IrisError::Cancelled);
        }

        let status = safe_call(
            async {
                self.backend
                    .get_invoice_by_qr_scan(&invoice_id)
                    .await
                    .map(|invoice| invoice.status)
            },
            receipt.status.unwrap_or(PaymentStatus::Completed),
            "get_invoice_by_qr_scan",
        )
        .await;

        // Compatibility shim for backends that return no usable reference
        let transaction_id = match usable_transaction_id(receipt.reference.as_deref()) {
            Some(id) => id.to_string(),
            None => format!("TXN-{}", now_millis()),
        };

        Ok(PaymentOutcome {
            transaction_id,
            status,
            amount,
            currency,
            btc_amount: conversion.btc_amount,
            amount_satoshi: conversion.amount_satoshi,
            payment_method: method,
            invoice_id,
            merchant_name: payload.label().map(str::to_string),
            timestamp: now_millis(),
        })
    }

    fn reusable_conversion(state: &FlowState, amount: f64) -> Option<&Conversion> {
        state
            .conversion
            .as_ref()
            .filter(|c| c.amount == amount && c.currency == state.currency)
    }

    /// Invoice for a bare address scan. BTC amounts are invoiced in USD.
    async fn create_static_invoice(&self, conversion: &Conversion) -> IrisResult<Invoice> {
        let (fiat_amount, fiat_currency) = if conversion.currency.is_fiat() {
            (conversion.amount, conversion.currency)
        } else {
            let usd_rate = self.rate_for(Currency::Usd).await;
            (conversion.btc_amount * usd_rate, Currency::Usd)
        };

        let description = format!(
            "Static QR Payment - {} {}",
            conversion.amount,
            conversion.currency.code()
        );
        let request =
            CreateInvoiceRequest::new(STATIC_MERCHANT_ID, fiat_amount, fiat_currency, Some(description));
        self.backend.create_invoice(request).await
    }

    // =========================================================================
    // Cancel / reset
    // =========================================================================

    /// Abandon the current attempt. Late results for it are ignored.
    ///
    /// Returns false when there is nothing to cancel.
    pub fn cancel(&self) -> bool {
        match self.phase() {
            FlowPhase::Idle | FlowPhase::Succeeded => false,
            phase => {
                log::info!("Payment flow cancelled from {:?}", phase);
                self.bump_attempt();
                self.replace_state(FlowState {
                    generation: self.generation.get(),
                    ..FlowState::default()
                });
                true
            }
        }
    }

    /// Return to idle after a completed payment
    pub fn reset(&self) {
        self.bump_attempt();
        self.replace_state(FlowState {
            generation: self.generation.get(),
            ..FlowState::default()
        });
    }
}
