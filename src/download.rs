//! The download session state machine.
//!
//! A [`DownloadManager`] drives one session at a time:
//!
//! ```text
//! Idle -> Connecting -> Downloading -> Parsing -> Complete | Error | Cancelled
//! ```
//!
//! The caller supplies the transport and stays its owner; the manager borrows
//! it for the session and always closes it before returning. Events are
//! delivered synchronously from the thread calling [`DownloadManager::download`],
//! both to channel receivers from [`subscribe`](DownloadManager::subscribe) and
//! to closures registered with [`observe`](DownloadManager::observe).
//!
//! Cancellation is cooperative: [`CancelHandle::cancel`] may be called from any
//! thread and is observed between transport reads and between decoded units.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::Receiver,
};

use log::warn;
use thiserror::Error;

use crate::{
    config::Config,
    descriptor::DeviceDescriptor,
    dive::NormalizedDive,
    fingerprint::FingerprintManager,
    store::FingerprintStore,
    transport::{Transport, TransportStatus},
};

pub mod events;
mod session;

pub use events::{DownloadEvent, DownloadState, ObserverId, Progress};

use events::Subscribers;
use session::Session;

/// Reasons a session ends in [`DownloadState::Error`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Could not open transport: {0}")]
    Open(TransportStatus),
    #[error("Transport read failed: {0}")]
    Read(TransportStatus),
    #[error("No decoder for vendor {0:?}.")]
    UnsupportedVendor(String),
}

impl DownloadError {
    /// The transport status to report alongside this error.
    pub fn status(&self) -> TransportStatus {
        match self {
            Self::Open(status) | Self::Read(status) => *status,
            Self::UnsupportedVendor(_) => TransportStatus::Unsupported,
        }
    }
}

/// A shareable request to stop the running session.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What to download, and from where.
pub struct DownloadOptions<'a> {
    pub descriptor: &'a DeviceDescriptor,
    pub transport: &'a mut dyn Transport,
    /// Serial number of the device, or `0` when unknown.
    pub serial: u32,
    /// Stop at this fingerprint. When unset, the manager's fingerprint store
    /// is consulted.
    pub fingerprint: Option<Vec<u8>>,
}

impl<'a> DownloadOptions<'a> {
    pub fn new(descriptor: &'a DeviceDescriptor, transport: &'a mut dyn Transport) -> Self {
        Self {
            descriptor,
            transport,
            serial: 0,
            fingerprint: None,
        }
    }

    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    pub fn fingerprint(mut self, fingerprint: impl Into<Vec<u8>>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}

/// The outcome of one session. Returned in every case, including failures.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    /// Whether the session reached [`DownloadState::Complete`].
    pub success: bool,
    pub state: DownloadState,
    pub status: TransportStatus,
    /// Dives decoded before the session ended, in device order.
    pub dives: Vec<NormalizedDive>,
    pub error: Option<DownloadError>,
    /// Fingerprint of the newest dive seen in this session.
    pub fingerprint: Option<Vec<u8>>,
    pub device_time: Option<i64>,
    /// Serial number reported by the data itself.
    pub serial: Option<u32>,
    pub warnings: Vec<String>,
}

type Fingerprints = FingerprintManager<Box<dyn FingerprintStore + Send>>;

#[derive(Default)]
pub struct DownloadManager {
    config: Config,
    state: DownloadState,
    cancel: CancelHandle,
    subscribers: Subscribers,
    fingerprints: Option<Fingerprints>,
}

impl DownloadManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Look up and record fingerprints in `store`.
    pub fn with_fingerprints(mut self, store: impl FingerprintStore + Send + 'static) -> Self {
        self.fingerprints = Some(FingerprintManager::new(Box::new(store)));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// State the most recent session ended in, or [`DownloadState::Idle`].
    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn fingerprints(&self) -> Option<&Fingerprints> {
        self.fingerprints.as_ref()
    }

    /// Request that the running session stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this manager's sessions from another thread or
    /// from inside an observer.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn subscribe(&mut self) -> Receiver<DownloadEvent> {
        self.subscribers.subscribe()
    }

    pub fn observe(&mut self, observer: impl FnMut(&DownloadEvent) + Send + 'static) -> ObserverId {
        self.subscribers.observe(Box::new(observer))
    }

    /// Returns whether the observer was registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.subscribers.unobserve(id)
    }

    /// Run one session to a terminal state.
    ///
    /// A cancellation requested before this call is discarded; the session
    /// starts fresh.
    pub fn download(&mut self, options: DownloadOptions<'_>) -> DownloadResult {
        let DownloadOptions {
            descriptor,
            transport,
            serial,
            fingerprint,
        } = options;

        self.cancel.reset();

        let mut warnings = Vec::new();
        let prior = fingerprint.or_else(|| self.stored_fingerprint(descriptor, serial, &mut warnings));

        let mut session = Session::new(&self.config, &self.cancel, &mut self.subscribers);
        let outcome = session.run(descriptor, transport, prior.as_deref());
        let mut result = session.finish(outcome);
        self.state = result.state;

        warnings.append(&mut result.warnings);
        result.warnings = warnings;

        if result.success && self.config.save_fingerprints {
            self.save_fingerprint(descriptor, serial, &mut result);
        }

        result
    }

    fn stored_fingerprint(
        &self,
        descriptor: &DeviceDescriptor,
        serial: u32,
        warnings: &mut Vec<String>,
    ) -> Option<Vec<u8>> {
        let fingerprints = self.fingerprints.as_ref()?;
        match fingerprints.get_fingerprint(descriptor, serial) {
            Ok(stored) => stored.map(|f| f.data),
            Err(err) => {
                warn!("fingerprint lookup failed: {err}");
                warnings.push(format!("fingerprint lookup failed: {err}"));
                None
            }
        }
    }

    fn save_fingerprint(
        &mut self,
        descriptor: &DeviceDescriptor,
        serial: u32,
        result: &mut DownloadResult,
    ) {
        let (Some(fingerprints), Some(data)) = (&mut self.fingerprints, &result.fingerprint) else {
            return;
        };
        let device_time = result.device_time.unwrap_or(0);

        if let Err(err) = fingerprints.save_fingerprint(descriptor, serial, data, device_time) {
            warn!("fingerprint save failed: {err}");
            result.warnings.push(format!("fingerprint save failed: {err}"));
        }
    }
}
