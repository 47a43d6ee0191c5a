//! Persistence boundaries for fingerprints and remembered devices.
//!
//! Stores are deliberately simple: the fingerprint store is a keyed map, the
//! device store loads and saves the whole device list at once.

use thiserror::Error;

use crate::{
    fingerprint::{Fingerprint, FingerprintKey},
    remembered::RememberedDevice,
};

#[cfg(feature = "json-store")]
pub mod json;
pub mod memory;

#[cfg(feature = "json-store")]
pub use json::{JsonDeviceStore, JsonFingerprintStore};
pub use memory::{MemoryDeviceStore, MemoryFingerprintStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}.")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "json-store")]
    #[error("Store contents are not valid JSON: {0}.")]
    Json(#[from] serde_json::Error),
}

pub trait FingerprintStore {
    fn load(&self, key: &FingerprintKey) -> Result<Option<Fingerprint>, StoreError>;
    fn save(&mut self, key: FingerprintKey, fingerprint: Fingerprint) -> Result<(), StoreError>;
    /// Returns whether an entry was removed.
    fn remove(&mut self, key: &FingerprintKey) -> Result<bool, StoreError>;
    fn list(&self) -> Result<Vec<(FingerprintKey, Fingerprint)>, StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

impl<S: FingerprintStore + ?Sized> FingerprintStore for Box<S> {
    fn load(&self, key: &FingerprintKey) -> Result<Option<Fingerprint>, StoreError> {
        (**self).load(key)
    }

    fn save(&mut self, key: FingerprintKey, fingerprint: Fingerprint) -> Result<(), StoreError> {
        (**self).save(key, fingerprint)
    }

    fn remove(&mut self, key: &FingerprintKey) -> Result<bool, StoreError> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<(FingerprintKey, Fingerprint)>, StoreError> {
        (**self).list()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

pub trait DeviceStore {
    fn load(&self) -> Result<Vec<RememberedDevice>, StoreError>;
    fn save(&mut self, devices: &[RememberedDevice]) -> Result<(), StoreError>;
}
