//! Incremental downloads: remember the newest dive fetched from each device.
//!
//! A fingerprint is opaque: bytes the device (or its file metadata) reports
//! for its newest dive. When a later download reaches a dive with the same
//! fingerprint, everything from there on is already known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    descriptor::DeviceDescriptor,
    store::{FingerprintStore, StoreError},
};

/// Byte-exact comparison, including length.
pub fn compare_fingerprints(a: &[u8], b: &[u8]) -> bool {
    a == b
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub data: Vec<u8>,
    pub serial: u32,
    /// Device clock value reported alongside the fingerprint, if any.
    pub device_time: i64,
    pub captured_at: DateTime<Utc>,
}

impl Fingerprint {
    /// Whether two fingerprints mark the same dive of the same physical unit.
    ///
    /// Fingerprints of different serial numbers never match.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        self.serial == other.serial && compare_fingerprints(&self.data, &other.data)
    }
}

/// Identity of one physical device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FingerprintKey {
    pub vendor: String,
    pub product: String,
    pub serial: u32,
}

impl FingerprintKey {
    pub fn new(descriptor: &DeviceDescriptor, serial: u32) -> Self {
        Self {
            vendor: descriptor.vendor.to_string(),
            product: descriptor.product.to_string(),
            serial,
        }
    }
}

/// Looks up and records fingerprints in a pluggable store.
#[derive(Debug, Clone, Default)]
pub struct FingerprintManager<S> {
    store: S,
}

impl<S: FingerprintStore> FingerprintManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn get_fingerprint(
        &self,
        descriptor: &DeviceDescriptor,
        serial: u32,
    ) -> Result<Option<Fingerprint>, StoreError> {
        self.store.load(&FingerprintKey::new(descriptor, serial))
    }

    /// Record `data` as the newest fingerprint of a device, stamped now.
    pub fn save_fingerprint(
        &mut self,
        descriptor: &DeviceDescriptor,
        serial: u32,
        data: &[u8],
        device_time: i64,
    ) -> Result<Fingerprint, StoreError> {
        self.save_fingerprint_at(descriptor, serial, data, device_time, Utc::now())
    }

    pub fn save_fingerprint_at(
        &mut self,
        descriptor: &DeviceDescriptor,
        serial: u32,
        data: &[u8],
        device_time: i64,
        captured_at: DateTime<Utc>,
    ) -> Result<Fingerprint, StoreError> {
        let fingerprint = Fingerprint {
            data: data.to_vec(),
            serial,
            device_time,
            captured_at,
        };
        self.store
            .save(FingerprintKey::new(descriptor, serial), fingerprint.clone())?;
        Ok(fingerprint)
    }

    pub fn remove_fingerprint(
        &mut self,
        descriptor: &DeviceDescriptor,
        serial: u32,
    ) -> Result<bool, StoreError> {
        self.store.remove(&FingerprintKey::new(descriptor, serial))
    }

    pub fn list(&self) -> Result<Vec<(FingerprintKey, Fingerprint)>, StoreError> {
        self.store.list()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }
}
