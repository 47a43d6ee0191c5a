//! In-memory stores, for tests and ephemeral sessions.

use std::collections::BTreeMap;

use crate::{
    fingerprint::{Fingerprint, FingerprintKey},
    remembered::RememberedDevice,
};

use super::{DeviceStore, FingerprintStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryFingerprintStore {
    entries: BTreeMap<FingerprintKey, Fingerprint>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn load(&self, key: &FingerprintKey) -> Result<Option<Fingerprint>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: FingerprintKey, fingerprint: Fingerprint) -> Result<(), StoreError> {
        self.entries.insert(key, fingerprint);
        Ok(())
    }

    fn remove(&mut self, key: &FingerprintKey) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<(FingerprintKey, Fingerprint)>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|(k, f)| (k.clone(), f.clone()))
            .collect())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDeviceStore {
    devices: Vec<RememberedDevice>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn load(&self) -> Result<Vec<RememberedDevice>, StoreError> {
        Ok(self.devices.clone())
    }

    fn save(&mut self, devices: &[RememberedDevice]) -> Result<(), StoreError> {
        self.devices = devices.to_vec();
        Ok(())
    }
}
