//! Satoshi, BTC and fiat conversions
//!
//! Satoshi amounts are always exact integers. BTC and fiat values are
//! derived for display and never converted back into satoshi except through
//! [`btc_to_satoshi`].

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Currency;

pub const SATOSHI_PER_BTC: u64 = 100_000_000;

/// Total Bitcoin supply cap in satoshi
pub const MAX_SUPPLY_SATOSHI: u64 = 21_000_000 * SATOSHI_PER_BTC;

pub fn satoshi_to_btc(satoshi: u64) -> f64 {
    satoshi as f64 / SATOSHI_PER_BTC as f64
}

/// Convert BTC to satoshi, rounding half away from zero.
///
/// Negative and NaN inputs coerce to 0; oversized inputs saturate.
pub fn btc_to_satoshi(btc: f64) -> u64 {
    if btc.is_nan() || btc <= 0.0 {
        return 0;
    }
    (btc * SATOSHI_PER_BTC as f64).round() as u64
}

// =============================================================================
// Rate Table
// =============================================================================

/// Exchange rates for one fiat currency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiatRate {
    /// Fiat units per 1 BTC
    pub per_btc: f64,
    /// Fiat units per 1 USD
    pub per_usd: f64,
}

/// Process-wide exchange rate configuration. Read-only once installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<Currency, FiatRate>,
}

impl Default for RateTable {
    fn default() -> Self {
        let rates = [
            (Currency::Usd, FiatRate { per_btc: 95_000.0, per_usd: 1.0 }),
            (Currency::Gbp, FiatRate { per_btc: 75_000.0, per_usd: 0.79 }),
            (Currency::Sgd, FiatRate { per_btc: 128_000.0, per_usd: 1.35 }),
            (Currency::Idr, FiatRate { per_btc: 1_500_000_000.0, per_usd: 15_700.0 }),
        ]
        .into_iter()
        .collect();
        Self { rates }
    }
}

impl RateTable {
    pub fn with_rate(mut self, currency: Currency, rate: FiatRate) -> Self {
        if currency.is_fiat() {
            self.rates.insert(currency, rate);
        }
        self
    }

    /// Units of `currency` per 1 BTC. BTC itself is 1.
    pub fn per_btc(&self, currency: Currency) -> Option<f64> {
        if currency == Currency::Btc {
            return Some(1.0);
        }
        self.rates.get(&currency).map(|r| r.per_btc)
    }

    /// Units of `currency` per 1 USD
    pub fn per_usd(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).map(|r| r.per_usd)
    }

    /// Rate lookup by currency code.
    ///
    /// Unrecognized codes resolve through [`RateTable::unknown_code_rate`].
    pub fn rate_for_code(&self, code: &str) -> f64 {
        Currency::from_code(code)
            .and_then(|currency| self.per_btc(currency))
            .unwrap_or_else(|| self.unknown_code_rate())
    }

    /// Rate used for a currency code the table does not know: the USD rate.
    pub fn unknown_code_rate(&self) -> f64 {
        self.per_btc(Currency::Usd)
            .unwrap_or(FALLBACK_USD_PER_BTC)
    }

    /// Derive a per-BTC rate from the backend's live USD rate
    pub fn live_rate(&self, usd_per_btc: f64, currency: Currency) -> f64 {
        match currency {
            Currency::Btc => 1.0,
            Currency::Usd => usd_per_btc,
            other => usd_per_btc * self.per_usd(other).unwrap_or(1.0),
        }
    }

    /// Express a fiat amount in USD using the cross rates
    pub fn to_usd(&self, amount: f64, currency: Currency) -> f64 {
        match self.per_usd(currency) {
            Some(per_usd) if per_usd > 0.0 => amount / per_usd,
            _ => amount,
        }
    }

    pub fn fiat_to_satoshi(&self, amount: f64, code: &str) -> u64 {
        btc_to_satoshi(amount / self.rate_for_code(code))
    }

    pub fn satoshi_to_fiat(&self, satoshi: u64, code: &str) -> f64 {
        satoshi_to_btc(satoshi) * self.rate_for_code(code)
    }

    /// All rates must be positive and finite
    pub fn validate(&self) -> Result<(), String> {
        for currency in Currency::FIAT {
            let rate = self
                .rates
                .get(&currency)
                .ok_or_else(|| format!("Missing rate for {}", currency))?;
            if !(rate.per_btc.is_finite() && rate.per_btc > 0.0) {
                return Err(format!("Invalid BTC rate for {}: {}", currency, rate.per_btc));
            }
            if !(rate.per_usd.is_finite() && rate.per_usd > 0.0) {
                return Err(format!("Invalid USD cross rate for {}: {}", currency, rate.per_usd));
            }
        }
        Ok(())
    }
}

/// Used only if a custom table was installed without a USD entry
const FALLBACK_USD_PER_BTC: f64 = 95_000.0;

static RATE_TABLE: OnceCell<RateTable> = OnceCell::new();

/// Install the process-wide rate table. The first install wins.
pub fn install_rate_table(table: RateTable) -> bool {
    let installed = RATE_TABLE.set(table).is_ok();
    if !installed {
        log::warn!("Rate table already installed, keeping the existing one");
    }
    installed
}

/// The installed rate table, or the defaults
pub fn rate_table() -> &'static RateTable {
    RATE_TABLE.get_or_init(RateTable::default)
}

pub fn fiat_to_satoshi(amount: f64, code: &str) -> u64 {
    rate_table().fiat_to_satoshi(amount, code)
}

pub fn satoshi_to_fiat(satoshi: u64, code: &str) -> f64 {
    rate_table().satoshi_to_fiat(satoshi, code)
}

/// Typed variant of [`fiat_to_satoshi`]
pub fn fiat_to_satoshi_in(amount: f64, currency: Currency) -> u64 {
    if currency == Currency::Btc {
        return btc_to_satoshi(amount);
    }
    fiat_to_satoshi(amount, currency.code())
}
