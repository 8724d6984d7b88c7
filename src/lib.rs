//! Iris payment core
//!
//! QR classification, satoshi/fiat conversion and payment orchestration for
//! the Iris Bitcoin payment frontend. The UI shell constructs an [`Iris`]
//! at startup and hands its services to the pages.

pub mod config;
pub mod errors;
pub mod services;
pub mod stores;
pub mod types;
pub mod utils;

use std::rc::Rc;

pub use config::IrisConfig;
pub use errors::{IrisError, IrisResult};

use services::backend::IrisBackend;
use services::merchant::MerchantService;
use services::payment_flow::PaymentFlow;
use services::payment_methods::PaymentMethodCatalog;
use stores::session::{IdentityProvider, SessionGate};

/// Initialize panic reporting and logging for the browser console
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    }
}

/// Composition root: one backend shared by every service
pub struct Iris {
    config: IrisConfig,
    backend: IrisBackend,
}

impl Iris {
    pub fn new(config: IrisConfig) -> Self {
        if !utils::conversion::install_rate_table(config.rates.clone()) {
            log::debug!("Keeping previously installed rate table");
        }
        let backend = IrisBackend::from_config(&config);
        log::info!(
            "Iris initialized for canister {} on {:?}",
            config.canister_id,
            config.network
        );
        Self { config, backend }
    }

    /// Load the stored configuration and build the services from it
    pub fn from_storage() -> Self {
        Self::new(IrisConfig::load())
    }

    pub fn config(&self) -> &IrisConfig {
        &self.config
    }

    pub fn backend(&self) -> &IrisBackend {
        &self.backend
    }

    /// Fresh payment flow with the backend's current catalog
    pub async fn payment_flow(&self) -> PaymentFlow {
        let catalog = PaymentMethodCatalog::load(&self.backend).await;
        PaymentFlow::new(self.backend.clone(), catalog, self.config.rates.clone())
    }

    pub fn merchant(&self) -> MerchantService {
        MerchantService::new(self.backend.clone(), self.config.rates.clone())
    }

    pub fn session(&self, identity: Rc<dyn IdentityProvider>) -> SessionGate {
        SessionGate::new(identity, self.backend.clone())
    }
}
