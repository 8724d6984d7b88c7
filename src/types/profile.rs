//! User, merchant and cashout records

use serde::{Deserialize, Serialize};

use super::Currency;

/// Role assigned once at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Merchant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Merchant => "merchant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub principal: String,
    /// `None` when the backend role value was malformed
    pub role: Option<Role>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub principal: String,
    pub business_name: String,
    pub created_at: u64,
    pub total_invoices: u64,
    pub static_bitcoin_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantBalance {
    pub principal: String,
    pub total_satoshi: u64,
    pub pending_satoshi: u64,
    pub confirmed_satoshi: u64,
    pub preferred_currency: Currency,
    pub last_updated: u64,
}

/// Merchant's reusable receiving address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticQr {
    pub bitcoin_address: String,
    pub bitcoin_uri: String,
    pub invoice_id: String,
    pub amount_satoshi: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CashoutStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashoutRequest {
    pub id: String,
    pub principal: String,
    pub amount_satoshi: u64,
    pub target_currency: Currency,
    pub fiat_amount: f64,
    pub status: CashoutStatus,
    pub created_at: u64,
    pub bank_details: Option<String>,
}
