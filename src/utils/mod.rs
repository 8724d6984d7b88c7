// Conversion, formatting and validation helpers shared by the services

pub mod conversion;
pub mod format;
pub mod time;
pub mod validation;

pub use conversion::{
    btc_to_satoshi, fiat_to_satoshi, fiat_to_satoshi_in, rate_table, satoshi_to_btc,
    satoshi_to_fiat, FiatRate, RateTable, SATOSHI_PER_BTC,
};
pub use format::{format_btc, format_fiat, format_sats_with_separator, truncate_string};
