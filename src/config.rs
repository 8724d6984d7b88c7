//! Runtime configuration for the payment core
//!
//! Defaults are compiled in. A JSON override blob can be stored in browser
//! local storage under [`CONFIG_STORAGE_KEY`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{IrisError, IrisResult};
use crate::utils::conversion::RateTable;

pub const CONFIG_STORAGE_KEY: &str = "iris_config";

/// Backend canister used when none is baked in at build time
const DEFAULT_CANISTER_ID: &str = "uxrrr-q7777-77774-qaaaq-cai";

const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Local,
    Ic,
}

impl Network {
    pub fn host(&self) -> &'static str {
        match self {
            Self::Local => "http://localhost:4943",
            Self::Ic => "https://ic0.app",
        }
    }

    /// Local replicas serve an unverified root key
    pub fn should_fetch_root_key(&self) -> bool {
        matches!(self, Self::Local)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrisConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default = "default_canister_id")]
    pub canister_id: String,
    /// Overrides the gateway derived from the network host
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default = "default_submission_timeout")]
    pub submission_timeout_secs: u64,
    #[serde(default)]
    pub rates: RateTable,
}

fn default_canister_id() -> String {
    option_env!("CANISTER_ID_IRIS_BACKEND")
        .unwrap_or(DEFAULT_CANISTER_ID)
        .to_string()
}

fn default_submission_timeout() -> u64 {
    DEFAULT_SUBMISSION_TIMEOUT_SECS
}

impl Default for IrisConfig {
    fn default() -> Self {
        let network = match option_env!("DFX_NETWORK") {
            Some("ic") => Network::Ic,
            _ => Network::Local,
        };
        Self {
            network,
            canister_id: default_canister_id(),
            gateway_url: None,
            submission_timeout_secs: DEFAULT_SUBMISSION_TIMEOUT_SECS,
            rates: RateTable::default(),
        }
    }
}

impl IrisConfig {
    /// Endpoint the gateway transport posts actor calls to
    pub fn gateway_endpoint(&self) -> String {
        match &self.gateway_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "{}/api/v2/canister/{}/call",
                self.network.host(),
                self.canister_id
            ),
        }
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    pub fn validate(&self) -> IrisResult<()> {
        if self.canister_id.trim().is_empty() {
            return Err(IrisError::validation("Canister id cannot be empty"));
        }
        if self.submission_timeout_secs == 0 {
            return Err(IrisError::validation("Submission timeout must be positive"));
        }
        if let Some(url) = &self.gateway_url {
            url::Url::parse(url)
                .map_err(|e| IrisError::validation(format!("Invalid gateway URL: {}", e)))?;
        }
        self.rates.validate().map_err(IrisError::Validation)
    }

    /// Parse an override blob and validate it
    pub fn from_json(json: &str) -> IrisResult<Self> {
        let config: IrisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the stored override, falling back to defaults
    pub fn load() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            use gloo_storage::{LocalStorage, Storage};

            if let Ok(json) = LocalStorage::get::<String>(CONFIG_STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded Iris config override ({:?})", config.network);
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored Iris config: {}", e),
                }
            }
        }
        Self::default()
    }

    /// Persist the override to LocalStorage. Outside the browser there is
    /// nowhere to write it, so this fails with a storage error.
    pub fn save(&self) -> IrisResult<()> {
        self.validate()?;
        let json = serde_json::to_string(self)?;
        #[cfg(target_arch = "wasm32")]
        {
            use gloo_storage::{LocalStorage, Storage};

            LocalStorage::set(CONFIG_STORAGE_KEY, json)
                .map_err(|e| IrisError::Storage(format!("Failed to save config: {}", e)))
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            log::warn!("Not saving Iris config ({} bytes): no browser storage", json.len());
            Err(IrisError::Storage(
                "Config storage is only available in the browser".to_string(),
            ))
        }
    }
}
