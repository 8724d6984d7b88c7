//! Invoice and scanned payload types

use serde::{Deserialize, Serialize};

use super::{Currency, PaymentStatus};
use crate::utils::conversion::satoshi_to_btc;

/// Backend-tracked request for payment. The core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub merchant_id: String,
    pub bitcoin_address: String,
    pub fiat_amount: f64,
    pub currency: Currency,
    pub amount_satoshi: u64,
    pub description: Option<String>,
    pub status: PaymentStatus,
    /// Nanoseconds since the Unix epoch
    pub created_at: u64,
    pub updated_at: u64,
}

impl Invoice {
    pub fn amount_btc(&self) -> f64 {
        satoshi_to_btc(self.amount_satoshi)
    }
}

/// Classified QR scan. Created on scan, consumed once by the payment flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScannedPayload {
    BitcoinUri {
        address: String,
        /// BTC-denominated amount exactly as written in the URI
        #[serde(default)]
        amount: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    InvoiceReference {
        id: String,
    },
    Unrecognized {
        raw: String,
    },
}

impl ScannedPayload {
    pub fn bitcoin_address(address: impl Into<String>) -> Self {
        Self::BitcoinUri {
            address: address.into(),
            amount: None,
            label: None,
            message: None,
        }
    }

    pub fn invoice_id(&self) -> Option<&str> {
        match self {
            Self::InvoiceReference { id } => Some(id),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::BitcoinUri { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Merchant label, used as the merchant name on the outcome
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::BitcoinUri { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Embedded BTC amount, if present and numeric
    pub fn embedded_btc_amount(&self) -> Option<f64> {
        match self {
            Self::BitcoinUri { amount: Some(amount), .. } => {
                amount.trim().parse::<f64>().ok().filter(|a| a.is_finite() && *a > 0.0)
            }
            _ => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }
}
