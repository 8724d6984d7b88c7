//! Iris data types
//!
//! Value objects shared across the payment core. None of them know about
//! the backend wire shape; see `services::wire` for that.

pub mod currency;
pub mod invoice;
pub mod payment;
pub mod profile;

pub use currency::Currency;
pub use invoice::{Invoice, ScannedPayload};
pub use payment::{PaymentMethod, PaymentMethodOption, PaymentOutcome, PaymentStatus};
pub use profile::{
    CashoutRequest, CashoutStatus, MerchantBalance, MerchantProfile, Role, StaticQr, UserProfile,
};
