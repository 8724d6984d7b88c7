//! Payment method catalog

use crate::services::backend::IrisBackend;
use crate::services::normalizer::safe_call;
use crate::types::{Currency, PaymentMethod, PaymentMethodOption};

/// Canonical option for a method
pub fn option_for(method: PaymentMethod) -> PaymentMethodOption {
    let (description, icon, currencies): (&str, &str, Vec<Currency>) = match method {
        PaymentMethod::FiatMock => (
            "Pay with USD, GBP, SGD, or IDR",
            "credit-card",
            Currency::FIAT.to_vec(),
        ),
        PaymentMethod::PlugWallet => ("Connect your Plug wallet", "plug", vec![Currency::Btc]),
        PaymentMethod::ExternalWallet => {
            ("Use external Bitcoin wallet", "bitcoin", vec![Currency::Btc])
        }
        PaymentMethod::VirtualWallet => ("Pay from your Iris balance", "wallet", vec![Currency::Btc]),
    };

    PaymentMethodOption {
        method,
        name: method.display_name().to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        // No submission operation exists for the virtual wallet
        available: method != PaymentMethod::VirtualWallet,
        currencies,
    }
}

/// Fallback list used when the backend catalog cannot be read
pub fn static_methods() -> Vec<PaymentMethodOption> {
    [
        PaymentMethod::FiatMock,
        PaymentMethod::PlugWallet,
        PaymentMethod::ExternalWallet,
    ]
    .into_iter()
    .map(option_for)
    .collect()
}

/// Method to select after the customer changes currency.
///
/// Any fiat currency forces the fiat method; BTC keeps the current choice.
pub fn method_for_currency_change(
    current: Option<PaymentMethod>,
    new_currency: Currency,
) -> Option<PaymentMethod> {
    if new_currency.is_fiat() {
        Some(PaymentMethod::FiatMock)
    } else {
        current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethodCatalog {
    options: Vec<PaymentMethodOption>,
}

impl Default for PaymentMethodCatalog {
    fn default() -> Self {
        Self::new(static_methods())
    }
}

impl PaymentMethodCatalog {
    pub fn new(options: Vec<PaymentMethodOption>) -> Self {
        Self { options }
    }

    /// Options offered by the backend, or the static list if it cannot be read
    pub async fn list_methods(backend: &IrisBackend) -> Vec<PaymentMethodOption> {
        let methods = safe_call(backend.get_payment_methods(), Vec::new(), "get_payment_methods").await;
        if methods.is_empty() {
            log::warn!("Backend offered no payment methods, using the built-in list");
            return static_methods();
        }
        methods.into_iter().map(option_for).collect()
    }

    pub async fn load(backend: &IrisBackend) -> Self {
        Self::new(Self::list_methods(backend).await)
    }

    pub fn options(&self) -> &[PaymentMethodOption] {
        &self.options
    }

    pub fn find(&self, method: PaymentMethod) -> Option<&PaymentMethodOption> {
        self.options.iter().find(|o| o.method == method)
    }

    /// Present in the catalog and available
    pub fn is_selectable(&self, method: PaymentMethod) -> bool {
        self.find(method).is_some_and(|o| o.available)
    }

    pub fn supports(&self, method: PaymentMethod, currency: Currency) -> bool {
        self.find(method)
            .is_some_and(|o| o.available && o.accepts(currency))
    }

    /// Selectable methods that accept `currency`
    pub fn methods_for(&self, currency: Currency) -> Vec<&PaymentMethodOption> {
        self.options
            .iter()
            .filter(|o| o.available && o.accepts(currency))
            .collect()
    }
}
