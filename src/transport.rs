//! The transport capability consumed by the download manager.
//!
//! Concrete transports (BLE GATT, RFCOMM, serial ports, USB HID, mounted
//! mass-storage volumes) live in the surrounding application. The core only
//! needs to open, close, and pull bytes through this trait.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::Transports;

pub mod mock;

/// Outcome of a transport operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportStatus {
    #[error("Success.")]
    Success,
    #[error("I/O error.")]
    Io,
    #[error("Timed out.")]
    Timeout,
    #[error("Cancelled.")]
    Cancelled,
    #[error("Unsupported operation.")]
    Unsupported,
}

impl TransportStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// The physical link a transport runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Ble,
    Bluetooth,
    Serial,
    Usb,
    UsbHid,
    UsbStorage,
}

impl TransportKind {
    /// The single-member capability set for this kind.
    pub fn as_transports(self) -> Transports {
        match self {
            Self::Ble => Transports::BLE,
            Self::Bluetooth => Transports::BLUETOOTH,
            Self::Serial => Transports::SERIAL,
            Self::Usb => Transports::USB,
            Self::UsbHid => Transports::USB_HID,
            Self::UsbStorage => Transports::USB_STORAGE,
        }
    }
}

/// A dive file exposed by a file-oriented transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFile {
    pub name: String,
    /// Modification time, in seconds since the Unix epoch.
    pub modified: i64,
    pub size: u64,
}

impl DeviceFile {
    /// Opaque fingerprint derived from file metadata: the modification time
    /// then the size, both as 8-byte little-endian integers.
    pub fn fingerprint(&self) -> Vec<u8> {
        let mut fingerprint = Vec::with_capacity(16);
        fingerprint.extend_from_slice(&self.modified.to_le_bytes());
        fingerprint.extend_from_slice(&self.size.to_le_bytes());
        fingerprint
    }
}

/// A byte-level link to one dive computer.
///
/// A transport is owned exclusively by one download session between `open`
/// and `close`. Blocking calls should honour [`Transport::read_timeout`]; the
/// session only observes cancellation when a call returns, so that timeout is
/// the upper bound on cancellation latency.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    fn open(&mut self) -> TransportStatus;

    /// Release the link. Called exactly once per session, even when `open`
    /// failed.
    fn close(&mut self);

    /// Read up to `buf.len()` bytes. `Ok(0)` marks the end of the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportStatus>;

    fn write(&mut self, _data: &[u8]) -> Result<usize, TransportStatus> {
        Err(TransportStatus::Unsupported)
    }

    /// Total stream length, when the device reports one up front.
    fn size_hint(&self) -> Option<u64> {
        None
    }

    /// Whether dives are fetched as whole files rather than one byte stream.
    fn is_file_oriented(&self) -> bool {
        self.kind() == TransportKind::UsbStorage
    }

    /// Enumerate dive files in the device's native order.
    fn list_files(&mut self) -> Result<Vec<DeviceFile>, TransportStatus> {
        Err(TransportStatus::Unsupported)
    }

    fn read_file(&mut self, _file: &DeviceFile) -> Result<Vec<u8>, TransportStatus> {
        Err(TransportStatus::Unsupported)
    }

    /// Longest time a single blocking call may take before returning.
    fn read_timeout(&self) -> Option<Duration> {
        None
    }
}
