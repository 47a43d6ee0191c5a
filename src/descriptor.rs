//! Static catalog of known dive computers.
//!
//! A [`DeviceDescriptor`] identifies a model, not a physical unit. Physical
//! units are tracked by serial number in [`crate::fingerprint`] and
//! [`crate::remembered`].

use core::fmt;
use core::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Set of transports a device model can be reached over.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transports(u32);

impl Transports {
    pub const NONE: Self = Self(0);
    pub const BLE: Self = Self(1 << 0);
    pub const BLUETOOTH: Self = Self(1 << 1);
    pub const SERIAL: Self = Self(1 << 2);
    pub const USB: Self = Self(1 << 3);
    pub const USB_HID: Self = Self(1 << 4);
    pub const USB_STORAGE: Self = Self(1 << 5);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::BLE, "BLE"),
        (Self::BLUETOOTH, "Bluetooth"),
        (Self::SERIAL, "Serial"),
        (Self::USB, "USB"),
        (Self::USB_HID, "USBHID"),
        (Self::USB_STORAGE, "USBStorage"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every transport in `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Transports {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// A dive computer model and the transports it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    pub vendor: &'static str,
    pub product: &'static str,
    /// Vendor-assigned model number.
    pub model: u32,
    pub transports: Transports,
}

impl DeviceDescriptor {
    pub const fn new(
        vendor: &'static str,
        product: &'static str,
        model: u32,
        transports: Transports,
    ) -> Self {
        Self {
            vendor,
            product,
            model,
            transports,
        }
    }

    pub fn supports(&self, transport: Transports) -> bool {
        self.transports.contains(transport)
    }
}

const SUUNTO_EON: Transports = Transports::USB_HID.union(Transports::BLE);
const GARMIN_DESCENT: Transports = Transports::USB_STORAGE.union(Transports::BLE);
const SHEARWATER: Transports = Transports::BLUETOOTH.union(Transports::BLE);
const SERIAL_CABLE: Transports = Transports::SERIAL;

static CATALOG: &[DeviceDescriptor] = &[
    DeviceDescriptor::new("Suunto", "EON Steel", 0, SUUNTO_EON),
    DeviceDescriptor::new("Suunto", "EON Core", 1, SUUNTO_EON),
    DeviceDescriptor::new("Suunto", "D5", 2, SUUNTO_EON),
    DeviceDescriptor::new("Suunto", "EON Steel Black", 3, SUUNTO_EON),
    DeviceDescriptor::new("Suunto", "Vyper", 0x0A, SERIAL_CABLE),
    DeviceDescriptor::new("Suunto", "Vyper Air", 0x0C, SERIAL_CABLE),
    DeviceDescriptor::new("Garmin", "Descent Mk1", 2859, GARMIN_DESCENT),
    DeviceDescriptor::new("Garmin", "Descent Mk2", 3258, GARMIN_DESCENT),
    DeviceDescriptor::new("Garmin", "Descent Mk2i", 3542, GARMIN_DESCENT),
    DeviceDescriptor::new("Garmin", "Descent G1", 3702, GARMIN_DESCENT),
    DeviceDescriptor::new("Garmin", "Descent Mk3", 4223, GARMIN_DESCENT),
    DeviceDescriptor::new("Garmin", "Descent Mk3i", 4222, GARMIN_DESCENT),
    DeviceDescriptor::new("Shearwater", "Perdix", 5, SHEARWATER),
    DeviceDescriptor::new("Shearwater", "Perdix AI", 6, SHEARWATER),
    DeviceDescriptor::new("Shearwater", "Teric", 8, Transports::BLE),
    DeviceDescriptor::new("Shearwater", "Peregrine", 9, Transports::BLE),
    DeviceDescriptor::new("Mares", "Puck Pro", 0x18, SERIAL_CABLE),
    DeviceDescriptor::new("Oceanic", "Geo 4.0", 0x4653, Transports::BLE),
];

/// Every known descriptor, in catalog order.
pub fn all() -> &'static [DeviceDescriptor] {
    CATALOG
}

/// Distinct vendor names, in catalog order.
pub fn vendors() -> Vec<&'static str> {
    let mut vendors: Vec<&'static str> = Vec::new();
    for d in CATALOG {
        if !vendors.contains(&d.vendor) {
            vendors.push(d.vendor);
        }
    }
    vendors
}

/// Descriptors of one vendor (case-insensitive).
pub fn products(vendor: &str) -> impl Iterator<Item = &'static DeviceDescriptor> {
    CATALOG
        .iter()
        .filter(move |d| d.vendor.eq_ignore_ascii_case(vendor))
}

/// Find a descriptor by vendor and product name (case-insensitive).
pub fn lookup(vendor: &str, product: &str) -> Option<&'static DeviceDescriptor> {
    products(vendor).find(|d| d.product.eq_ignore_ascii_case(product))
}

/// Find a descriptor by vendor name and model number.
pub fn by_model(vendor: &str, model: u32) -> Option<&'static DeviceDescriptor> {
    products(vendor).find(|d| d.model == model)
}
