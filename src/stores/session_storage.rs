//! Session-scoped payment blobs
//!
//! The scan page stores the classified payload and the payment page stores
//! the outcome, so that a reload or route change does not lose them.

use gloo_storage::errors::StorageError;
use gloo_storage::{SessionStorage, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::errors::{IrisError, IrisResult};
use crate::types::{PaymentOutcome, ScannedPayload};

pub const SCANNED_QR_KEY: &str = "scannedQRData";
pub const PAYMENT_RESULT_KEY: &str = "paymentResult";

pub trait BlobStore {
    fn get(&self, key: &str) -> IrisResult<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> IrisResult<()>;
    fn remove(&self, key: &str);
}

/// Browser `sessionStorage`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSessionStore;

impl BlobStore for BrowserSessionStore {
    fn get(&self, key: &str) -> IrisResult<Option<Value>> {
        match SessionStorage::get::<Value>(key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(IrisError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: Value) -> IrisResult<()> {
        SessionStorage::set(key, value).map_err(|e| IrisError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) {
        SessionStorage::delete(key);
    }
}

/// In-memory store for tests and non-browser hosts
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RefCell<HashMap<String, Value>>,
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> IrisResult<Option<Value>> {
        Ok(self.blobs.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> IrisResult<()> {
        self.blobs.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.blobs.borrow_mut().remove(key);
    }
}

pub struct PaymentSession<S: BlobStore> {
    store: S,
}

impl PaymentSession<BrowserSessionStore> {
    pub fn browser() -> Self {
        Self::new(BrowserSessionStore)
    }
}

impl<S: BlobStore> PaymentSession<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> IrisResult<()> {
        let json = serde_json::to_value(value)?;
        self.store.set(key, json)
    }

    /// Unreadable blobs are dropped rather than reported
    fn load<T: DeserializeOwned>(&self, key: &str) -> IrisResult<Option<T>> {
        let Some(json) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Discarding unreadable session blob {}: {}", key, e);
                self.store.remove(key);
                Ok(None)
            }
        }
    }

    pub fn save_scanned(&self, payload: &ScannedPayload) -> IrisResult<()> {
        self.save(SCANNED_QR_KEY, payload)
    }

    pub fn load_scanned(&self) -> IrisResult<Option<ScannedPayload>> {
        self.load(SCANNED_QR_KEY)
    }

    pub fn save_payment_result(&self, outcome: &PaymentOutcome) -> IrisResult<()> {
        self.save(PAYMENT_RESULT_KEY, outcome)
    }

    pub fn peek_payment_result(&self) -> IrisResult<Option<PaymentOutcome>> {
        self.load(PAYMENT_RESULT_KEY)
    }

    /// Read the outcome once, clearing it together with the scan
    pub fn take_payment_result(&self) -> IrisResult<Option<PaymentOutcome>> {
        let outcome = self.load(PAYMENT_RESULT_KEY)?;
        self.clear();
        Ok(outcome)
    }

    pub fn clear(&self) {
        self.store.remove(PAYMENT_RESULT_KEY);
        self.store.remove(SCANNED_QR_KEY);
    }
}
