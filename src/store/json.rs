//! File-backed stores holding one JSON document each.
//!
//! _Requires Cargo feature `json-store`._

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    fingerprint::{Fingerprint, FingerprintKey},
    remembered::RememberedDevice,
};

use super::{DeviceStore, FingerprintStore, StoreError};

/// Read a JSON document, treating a missing file as the default value.
fn read<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

/// Write a JSON document through a temporary sibling file.
fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    key: FingerprintKey,
    fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
pub struct JsonFingerprintStore {
    path: PathBuf,
}

impl JsonFingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<Vec<Entry>, StoreError> {
        read(&self.path)
    }
}

impl FingerprintStore for JsonFingerprintStore {
    fn load(&self, key: &FingerprintKey) -> Result<Option<Fingerprint>, StoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|e| e.key == *key)
            .map(|e| e.fingerprint))
    }

    fn save(&mut self, key: FingerprintKey, fingerprint: Fingerprint) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        match entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.fingerprint = fingerprint,
            None => entries.push(Entry { key, fingerprint }),
        }
        write(&self.path, &entries)
    }

    fn remove(&mut self, key: &FingerprintKey) -> Result<bool, StoreError> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|e| e.key != *key);
        if entries.len() == before {
            return Ok(false);
        }
        write(&self.path, &entries)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<(FingerprintKey, Fingerprint)>, StoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|e| (e.key, e.fingerprint))
            .collect())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        write::<[Entry]>(&self.path, &[])
    }
}

#[derive(Debug, Clone)]
pub struct JsonDeviceStore {
    path: PathBuf,
}

impl JsonDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceStore for JsonDeviceStore {
    fn load(&self) -> Result<Vec<RememberedDevice>, StoreError> {
        read(&self.path)
    }

    fn save(&mut self, devices: &[RememberedDevice]) -> Result<(), StoreError> {
        write(&self.path, devices)
    }
}
