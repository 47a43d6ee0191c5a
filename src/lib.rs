//! Download and decode dive logs from dive computers.
//!
//! Divesync drives a download session over a caller-supplied [`Transport`],
//! decodes the device's native log format, and yields [`NormalizedDive`]
//! records in fixed units. Two formats are decoded: Garmin's FIT (the
//! [`fit`] module) and Suunto's SBEM (the [`sbem`] module).
//!
//! Most users should begin with [`DownloadManager`]: look up a device in the
//! [`descriptor`] catalog, hand the manager a transport, and either collect
//! the returned [`DownloadResult`] or subscribe to [`DownloadEvent`]s as dives
//! arrive. Incremental downloads are supported through fingerprints (see
//! [`fingerprint`]); devices seen before can be recalled through
//! [`remembered`].
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `json-store`: enable file-backed JSON stores for fingerprints and
//!   remembered devices (default).

pub mod binary;
pub mod checksum;
pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod dive;
pub mod download;
pub mod fingerprint;
pub mod fit;
pub mod remembered;
pub mod sbem;
pub mod store;
pub mod transport;

pub use config::Config;
pub use decoder::{DecodeError, DecodeOutput, Decoder};
pub use descriptor::{DeviceDescriptor, Transports};
pub use dive::NormalizedDive;
pub use download::{
    CancelHandle, DownloadError, DownloadEvent, DownloadManager, DownloadOptions, DownloadResult,
    DownloadState, Progress,
};
pub use fingerprint::{Fingerprint, FingerprintManager, compare_fingerprints};
pub use remembered::{DeviceInfo, RememberedDevice, RememberedDevices, TransportBinding};
pub use transport::{DeviceFile, Transport, TransportKind, TransportStatus};
