//! Devices the user has connected before, and how they were reached.
//!
//! The registry reads the whole device list from its store, mutates it in
//! memory, and writes it back. Entries are only removed by [`forget`].
//!
//! [`forget`]: RememberedDevices::forget

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    descriptor::DeviceDescriptor,
    store::{DeviceStore, StoreError},
    transport::TransportKind,
};

/// How a remembered device was last reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportBinding {
    Bluetooth { address: String, name: Option<String> },
    Usb { vendor_id: u16, product_id: u16 },
    Serial { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedDevice {
    pub id: Uuid,
    pub vendor: String,
    pub product: String,
    pub model: u32,
    /// `0` when the serial number is not known.
    pub serial: u32,
    pub firmware: Option<String>,
    pub nickname: Option<String>,
    pub binding: Option<TransportBinding>,
    pub transport: TransportKind,
    pub last_used: DateTime<Utc>,
    pub use_count: u32,
}

impl RememberedDevice {
    fn is(&self, descriptor: &DeviceDescriptor, serial: u32) -> bool {
        self.vendor == descriptor.vendor
            && self.product == descriptor.product
            && (self.serial == serial || self.serial == 0 || serial == 0)
    }
}

/// Identity details learned while connecting to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: u32,
    pub firmware: Option<String>,
    pub nickname: Option<String>,
    pub binding: Option<TransportBinding>,
    pub transport: TransportKind,
}

impl DeviceInfo {
    pub fn new(transport: TransportKind) -> Self {
        Self {
            serial: 0,
            firmware: None,
            nickname: None,
            binding: None,
            transport,
        }
    }
}

pub struct RememberedDevices<S> {
    store: S,
}

impl<S: DeviceStore> RememberedDevices<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Record a successful connection.
    pub fn remember(
        &mut self,
        descriptor: &DeviceDescriptor,
        info: DeviceInfo,
    ) -> Result<RememberedDevice, StoreError> {
        self.remember_at(descriptor, info, Utc::now())
    }

    /// Record a successful connection at a given time.
    ///
    /// An entry for the same vendor and product whose serial matches (or on
    /// either side is unknown) is updated; otherwise a new entry is added.
    pub fn remember_at(
        &mut self,
        descriptor: &DeviceDescriptor,
        info: DeviceInfo,
        at: DateTime<Utc>,
    ) -> Result<RememberedDevice, StoreError> {
        let mut devices = self.store.load()?;

        let device = match devices.iter_mut().find(|d| d.is(descriptor, info.serial)) {
            Some(device) => {
                device.use_count += 1;
                device.last_used = at;
                device.transport = info.transport;
                if info.serial != 0 {
                    device.serial = info.serial;
                }
                if info.firmware.is_some() {
                    device.firmware = info.firmware;
                }
                if info.nickname.is_some() {
                    device.nickname = info.nickname;
                }
                if info.binding.is_some() {
                    device.binding = info.binding;
                }
                device.clone()
            }
            None => {
                let device = RememberedDevice {
                    id: Uuid::new_v4(),
                    vendor: descriptor.vendor.to_string(),
                    product: descriptor.product.to_string(),
                    model: descriptor.model,
                    serial: info.serial,
                    firmware: info.firmware,
                    nickname: info.nickname,
                    binding: info.binding,
                    transport: info.transport,
                    last_used: at,
                    use_count: 1,
                };
                debug!("remembering new device {} {}", device.vendor, device.product);
                devices.push(device.clone());
                device
            }
        };

        self.store.save(&devices)?;
        Ok(device)
    }

    pub fn all(&self) -> Result<Vec<RememberedDevice>, StoreError> {
        self.store.load()
    }

    /// Most recently used first.
    pub fn get_recent(&self) -> Result<Vec<RememberedDevice>, StoreError> {
        let mut devices = self.store.load()?;
        devices.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(devices)
    }

    /// Most often used first.
    pub fn get_frequent(&self) -> Result<Vec<RememberedDevice>, StoreError> {
        let mut devices = self.store.load()?;
        devices.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        Ok(devices)
    }

    pub fn find(
        &self,
        descriptor: &DeviceDescriptor,
        serial: u32,
    ) -> Result<Option<RememberedDevice>, StoreError> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .find(|d| d.is(descriptor, serial)))
    }

    pub fn find_by_bluetooth_address(
        &self,
        address: &str,
    ) -> Result<Option<RememberedDevice>, StoreError> {
        Ok(self.store.load()?.into_iter().find(|d| {
            matches!(
                &d.binding,
                Some(TransportBinding::Bluetooth { address: a, .. }) if a.eq_ignore_ascii_case(address)
            )
        }))
    }

    pub fn find_by_usb_ids(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<RememberedDevice>, StoreError> {
        let ids = TransportBinding::Usb {
            vendor_id,
            product_id,
        };
        Ok(self
            .store
            .load()?
            .into_iter()
            .find(|d| d.binding.as_ref() == Some(&ids)))
    }

    /// Remove a device. Returns whether it was present.
    pub fn forget(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let mut devices = self.store.load()?;
        let before = devices.len();
        devices.retain(|d| d.id != id);
        if devices.len() == before {
            return Ok(false);
        }
        self.store.save(&devices)?;
        Ok(true)
    }

    /// Set or clear a device's nickname. Returns whether it was present.
    pub fn set_nickname(&mut self, id: Uuid, nickname: Option<String>) -> Result<bool, StoreError> {
        let mut devices = self.store.load()?;
        let Some(device) = devices.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        device.nickname = nickname;
        self.store.save(&devices)?;
        Ok(true)
    }
}
