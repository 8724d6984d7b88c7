//! Payment method, status and outcome types

use serde::{Deserialize, Serialize};

use super::Currency;

// =============================================================================
// Payment Methods
// =============================================================================

/// Ways a customer can settle an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Simulated fiat card payment, settled in USD on the backend
    FiatMock,
    PlugWallet,
    ExternalWallet,
    /// Listed by the backend but has no submission operation
    VirtualWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::FiatMock,
        PaymentMethod::PlugWallet,
        PaymentMethod::ExternalWallet,
        PaymentMethod::VirtualWallet,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FiatMock => "Fiat Payment",
            Self::PlugWallet => "Plug Wallet",
            Self::ExternalWallet => "External Bitcoin Wallet",
            Self::VirtualWallet => "Virtual Wallet",
        }
    }
}

/// A method as offered to the customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodOption {
    pub method: PaymentMethod,
    pub name: String,
    pub description: String,
    /// Icon token resolved by the UI shell
    pub icon: String,
    /// Unavailable methods must never be selectable
    pub available: bool,
    pub currencies: Vec<Currency>,
}

impl PaymentMethodOption {
    pub fn accepts(&self, currency: Currency) -> bool {
        self.currencies.contains(&currency)
    }
}

// =============================================================================
// Status
// =============================================================================

/// Backend-owned invoice payment status. Monotonic on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of a successful payment, handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub currency: Currency,
    pub btc_amount: f64,
    pub amount_satoshi: u64,
    pub payment_method: PaymentMethod,
    pub invoice_id: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}
