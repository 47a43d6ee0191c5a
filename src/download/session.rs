//! One download session, from connection to a terminal state.

use log::{debug, error, info, warn};

use crate::{
    checksum::crc32,
    config::Config,
    decoder::Decoder,
    descriptor::DeviceDescriptor,
    dive::NormalizedDive,
    fingerprint::compare_fingerprints,
    transport::{Transport, TransportStatus},
};

use super::{
    CancelHandle, DownloadError, DownloadResult,
    events::{DownloadEvent, DownloadState, Progress, Subscribers},
};

/// Why a session stopped before completing.
pub(super) enum Stop {
    Cancelled,
    Failed(DownloadError),
}

impl From<DownloadError> for Stop {
    fn from(err: DownloadError) -> Self {
        Self::Failed(err)
    }
}

/// Bytes fetched from the device, awaiting decoding.
struct Unit {
    name: String,
    data: Vec<u8>,
    /// Fingerprint known before decoding (from file metadata).
    fingerprint: Option<Vec<u8>>,
    device_time: i64,
}

/// An opened transport, closed when dropped.
struct Link<'t> {
    transport: &'t mut dyn Transport,
}

impl Drop for Link<'_> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Mutable state of one session, owned by it alone.
pub(super) struct Session<'m> {
    config: &'m Config,
    cancel: &'m CancelHandle,
    subscribers: &'m mut Subscribers,
    state: DownloadState,
    dives: Vec<NormalizedDive>,
    progress: u64,
    warnings: Vec<String>,
    newest: Option<(Vec<u8>, i64)>,
    serial: Option<u32>,
}

impl<'m> Session<'m> {
    pub(super) fn new(
        config: &'m Config,
        cancel: &'m CancelHandle,
        subscribers: &'m mut Subscribers,
    ) -> Self {
        Self {
            config,
            cancel,
            subscribers,
            state: DownloadState::Idle,
            dives: Vec::new(),
            progress: 0,
            warnings: Vec::new(),
            newest: None,
            serial: None,
        }
    }

    /// Drive the session up to (not including) its terminal state.
    ///
    /// The transport is closed before this returns, on every path.
    pub(super) fn run(
        &mut self,
        descriptor: &DeviceDescriptor,
        transport: &mut dyn Transport,
        prior: Option<&[u8]>,
    ) -> Result<(), Stop> {
        self.transition(DownloadState::Connecting);

        let mut link = Link { transport };
        let status = link.transport.open();
        if !status.is_success() {
            return Err(DownloadError::Open(status).into());
        }

        self.transition(DownloadState::Downloading);

        let decoder = Decoder::for_descriptor(descriptor)
            .ok_or_else(|| DownloadError::UnsupportedVendor(descriptor.vendor.to_string()))?;

        let units = if link.transport.is_file_oriented() {
            self.fetch_files(&mut link, prior)?
        } else {
            self.fetch_stream(&mut link)?
        };
        drop(link);

        self.transition(DownloadState::Parsing);
        self.parse(decoder, descriptor, units, prior)
    }

    /// Fetch each file newer than the prior fingerprint, one per work unit.
    fn fetch_files(
        &mut self,
        link: &mut Link<'_>,
        prior: Option<&[u8]>,
    ) -> Result<Vec<Unit>, Stop> {
        let files = link.transport.list_files().map_err(read_failure)?;

        let stop_at = self.config.stop_at_fingerprint.then_some(prior).flatten();
        let new: Vec<_> = files
            .into_iter()
            .take_while(|f| !stop_at.is_some_and(|p| compare_fingerprints(p, &f.fingerprint())))
            .collect();
        debug!("{} new files on device", new.len());

        let maximum = new.len() as u64;
        let mut units = Vec::with_capacity(new.len());

        for (i, file) in new.into_iter().enumerate() {
            self.check_cancel()?;

            let data = link.transport.read_file(&file).map_err(read_failure)?;
            units.push(Unit {
                fingerprint: Some(file.fingerprint()),
                device_time: file.modified,
                name: file.name,
                data,
            });

            self.progress(i as u64 + 1, maximum);
        }

        Ok(units)
    }

    /// Read the whole stream, checking for cancellation between reads.
    fn fetch_stream(&mut self, link: &mut Link<'_>) -> Result<Vec<Unit>, Stop> {
        let total = link.transport.size_hint().unwrap_or(0);
        let interval = self.config.progress_interval.max(1);

        let mut buf = vec![0; self.config.read_chunk_size.max(1)];
        let mut data = Vec::new();
        let mut since_progress = 0;

        loop {
            self.check_cancel()?;

            let n = link.transport.read(&mut buf).map_err(read_failure)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            since_progress += n;
            if since_progress >= interval {
                since_progress = 0;
                self.progress(data.len() as u64, total);
            }
        }

        self.progress(data.len() as u64, total);

        Ok(vec![Unit {
            name: "stream".to_string(),
            data,
            fingerprint: None,
            device_time: 0,
        }])
    }

    /// Decode fetched units in order, emitting each dive as it is decoded.
    fn parse(
        &mut self,
        decoder: Decoder,
        descriptor: &DeviceDescriptor,
        units: Vec<Unit>,
        prior: Option<&[u8]>,
    ) -> Result<(), Stop> {
        let stop_at = self.config.stop_at_fingerprint.then_some(prior).flatten();

        for unit in units {
            self.check_cancel()?;

            let out = match decoder.decode(descriptor, &unit.data, self.config.verify_checksums) {
                Ok(out) => out,
                Err(err) => {
                    // One unreadable file must not abort the batch.
                    warn!("skipping {}: {err}", unit.name);
                    self.warnings.push(format!("{}: {err}", unit.name));
                    continue;
                }
            };

            self.warnings.extend(out.warnings);
            self.serial = self.serial.or(out.serial);

            let fingerprint = unit
                .fingerprint
                .or(out.fingerprint)
                .unwrap_or_else(|| crc32(&unit.data).to_le_bytes().to_vec());

            if self.newest.is_none() {
                self.newest = Some((fingerprint.clone(), unit.device_time));
            }

            if stop_at.is_some_and(|p| compare_fingerprints(p, &fingerprint)) {
                debug!("{} was already downloaded", unit.name);
                break;
            }

            for dive in out.dives {
                self.add_dive(dive);
            }
        }

        Ok(())
    }

    fn add_dive(&mut self, dive: NormalizedDive) {
        self.subscribers.emit(DownloadEvent::Dive(Box::new(dive.clone())));
        self.dives.push(dive);
    }

    fn check_cancel(&self) -> Result<(), Stop> {
        if self.cancel.is_cancelled() {
            Err(Stop::Cancelled)
        } else {
            Ok(())
        }
    }

    fn progress(&mut self, current: u64, maximum: u64) {
        self.progress = self.progress.max(current);
        self.subscribers.emit(DownloadEvent::Progress(Progress {
            current: self.progress,
            maximum: maximum.max(self.progress),
        }));
    }

    fn transition(&mut self, next: DownloadState) {
        info!("download {:?} -> {:?}", self.state, next);
        self.state = next;
        self.subscribers.emit(DownloadEvent::State(next));
    }

    /// Enter the terminal state for an outcome and build the caller's result.
    pub(super) fn finish(mut self, outcome: Result<(), Stop>) -> DownloadResult {
        let (error, status) = match outcome {
            Ok(()) => {
                self.transition(DownloadState::Complete);
                self.subscribers
                    .emit(DownloadEvent::Complete(self.dives.clone()));
                info!("downloaded {} dives", self.dives.len());
                (None, TransportStatus::Success)
            }
            Err(Stop::Cancelled) => {
                self.transition(DownloadState::Cancelled);
                info!("download cancelled after {} dives", self.dives.len());
                (None, TransportStatus::Cancelled)
            }
            Err(Stop::Failed(err)) => {
                error!("download failed: {err}");
                self.transition(DownloadState::Error);
                self.subscribers.emit(DownloadEvent::Error(err.to_string()));
                let status = err.status();
                (Some(err), status)
            }
        };

        let (fingerprint, device_time) = self.newest.unzip();

        DownloadResult {
            success: self.state == DownloadState::Complete,
            state: self.state,
            status,
            dives: self.dives,
            error,
            fingerprint,
            device_time,
            serial: self.serial,
            warnings: self.warnings,
        }
    }
}

/// Map a failed transport call, treating the transport's own cancellation
/// as a cancelled session rather than an error.
fn read_failure(status: TransportStatus) -> Stop {
    match status {
        TransportStatus::Cancelled => Stop::Cancelled,
        status => Stop::Failed(DownloadError::Read(status)),
    }
}
