//! Merchant dashboard reads and merchant actions
//!
//! Dashboard reads are best effort and never fail; actions that change
//! backend state return their errors.

use crate::errors::{IrisError, IrisResult};
use crate::services::backend::IrisBackend;
use crate::services::normalizer::safe_call;
use crate::services::wire::CreateInvoiceRequest;
use crate::types::{
    CashoutRequest, Currency, Invoice, MerchantBalance, MerchantProfile, PaymentStatus, StaticQr,
};
use crate::utils::conversion::{satoshi_to_btc, RateTable};
use crate::utils::format::{format_btc, format_fiat};
use crate::utils::time::{format_transaction_date, format_transaction_time};

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSummary {
    pub btc_balance: f64,
    pub usd_balance: f64,
    pub fiat_balance: f64,
    pub currency: Currency,
}

impl Default for BalanceSummary {
    fn default() -> Self {
        Self {
            btc_balance: 0.0,
            usd_balance: 0.0,
            fiat_balance: 0.0,
            currency: Currency::Usd,
        }
    }
}

/// One row of the merchant's transaction history
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSummary {
    pub id: String,
    pub description: String,
    /// Fiat amount with currency symbol
    pub amount: String,
    pub currency: Currency,
    pub btc_amount: String,
    pub status: PaymentStatus,
    pub date: String,
    pub time: String,
}

impl TransactionSummary {
    pub fn from_invoice(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.clone(),
            description: invoice
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Payment".to_string()),
            amount: format_fiat(invoice.fiat_amount, invoice.currency.code()),
            currency: invoice.currency,
            btc_amount: format_btc(invoice.amount_satoshi),
            status: invoice.status,
            date: format_transaction_date(invoice.created_at),
            time: format_transaction_time(invoice.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardData {
    pub balance: BalanceSummary,
    pub transactions: Vec<TransactionSummary>,
    pub profile: Option<MerchantProfile>,
}

impl DashboardData {
    pub fn pending_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.status == PaymentStatus::Completed)
            .count()
    }
}

pub struct MerchantService {
    backend: IrisBackend,
    rates: RateTable,
}

impl MerchantService {
    pub fn new(backend: IrisBackend, rates: RateTable) -> Self {
        Self { backend, rates }
    }

    pub fn summarize_balance(&self, balance: &MerchantBalance) -> BalanceSummary {
        let currency = balance.preferred_currency;
        BalanceSummary {
            btc_balance: satoshi_to_btc(balance.total_satoshi),
            usd_balance: self.rates.satoshi_to_fiat(balance.total_satoshi, Currency::Usd.code()),
            fiat_balance: self.rates.satoshi_to_fiat(balance.total_satoshi, currency.code()),
            currency,
        }
    }

    pub async fn balance_summary(&self) -> BalanceSummary {
        safe_call(
            async {
                let balance = self.backend.get_merchant_balance().await?;
                Ok(self.summarize_balance(&balance))
            },
            BalanceSummary::default(),
            "Error fetching balance",
        )
        .await
    }

    /// Transaction history, newest first
    pub async fn transactions(&self) -> Vec<TransactionSummary> {
        safe_call(
            async {
                let invoices = self.backend.get_my_invoices().await?;
                Ok(invoices
                    .iter()
                    .rev()
                    .map(TransactionSummary::from_invoice)
                    .collect())
            },
            Vec::new(),
            "Error fetching transactions",
        )
        .await
    }

    pub async fn profile(&self) -> Option<MerchantProfile> {
        safe_call(
            async { self.backend.get_merchant_profile().await.map(Some) },
            None,
            "Error fetching merchant profile",
        )
        .await
    }

    pub async fn exists(&self) -> bool {
        self.profile().await.is_some()
    }

    /// Load every dashboard section concurrently
    pub async fn dashboard(&self) -> DashboardData {
        let (balance, transactions, profile) =
            futures::join!(self.balance_summary(), self.transactions(), self.profile());
        DashboardData { balance, transactions, profile }
    }

    pub async fn cashout_history(&self) -> Vec<CashoutRequest> {
        safe_call(
            self.backend.get_my_cashout_requests(),
            Vec::new(),
            "Error fetching cashout requests",
        )
        .await
    }

    pub async fn static_qr(&self) -> IrisResult<StaticQr> {
        self.backend.get_merchant_static_qr().await
    }

    pub async fn register(&self, business_name: &str) -> IrisResult<MerchantProfile> {
        let profile = self.backend.register_merchant(business_name).await?;
        log::info!("Registered merchant {}", profile.business_name);
        Ok(profile)
    }

    pub async fn set_preferred_currency(&self, currency: Currency) -> IrisResult<()> {
        self.backend.set_preferred_currency(currency).await
    }

    /// Create an invoice for the signed-in merchant
    pub async fn create_invoice(
        &self,
        fiat_amount: f64,
        currency: Currency,
        description: Option<String>,
    ) -> IrisResult<Invoice> {
        if !currency.is_fiat() {
            return Err(IrisError::validation("Invoices must be priced in a fiat currency"));
        }
        let profile = self.backend.get_merchant_profile().await?;
        let request = CreateInvoiceRequest::new(profile.principal, fiat_amount, currency, description);
        self.backend.create_invoice(request).await
    }

    /// Request a cashout, rejecting amounts above the known balance
    pub async fn request_cashout(
        &self,
        amount_satoshi: u64,
        target_currency: Currency,
        bank_details: Option<String>,
    ) -> IrisResult<CashoutRequest> {
        let balance = safe_call(
            async { self.backend.get_merchant_balance().await.map(Some) },
            None,
            "Error fetching balance",
        )
        .await;
        if let Some(balance) = balance {
            if amount_satoshi > balance.total_satoshi {
                return Err(IrisError::validation("Insufficient balance for this cashout"));
            }
        }

        let request = self
            .backend
            .create_cashout_request(amount_satoshi, target_currency, bank_details)
            .await?;
        log::info!("Created cashout request {}", request.id);
        Ok(request)
    }
}
