//! Currencies the payment core can price in
//!
//! Fiat currencies have a backend wire shape and a rate in the
//! [`RateTable`](crate::utils::conversion::RateTable). `Btc` is the implicit
//! on-chain unit and never appears on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "SGD")]
    Sgd,
    #[serde(rename = "IDR")]
    Idr,
    #[serde(rename = "BTC")]
    Btc,
}

impl Currency {
    /// Fiat currencies in display order
    pub const FIAT: [Currency; 4] = [Currency::Usd, Currency::Gbp, Currency::Sgd, Currency::Idr];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Sgd => "SGD",
            Self::Idr => "IDR",
            Self::Btc => "BTC",
        }
    }

    /// Parse a currency code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "GBP" => Some(Self::Gbp),
            "SGD" => Some(Self::Sgd),
            "IDR" => Some(Self::Idr),
            "BTC" => Some(Self::Btc),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Gbp => "£",
            Self::Sgd => "S$",
            Self::Idr => "Rp",
            Self::Btc => "₿",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Usd => "US Dollar",
            Self::Gbp => "British Pound",
            Self::Sgd => "Singapore Dollar",
            Self::Idr => "Indonesian Rupiah",
            Self::Btc => "Bitcoin",
        }
    }

    pub fn is_fiat(&self) -> bool {
        !matches!(self, Self::Btc)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
