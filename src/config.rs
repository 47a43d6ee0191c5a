//! Download session settings.

use serde::Deserialize;

/// Settings for a [`DownloadManager`](crate::download::DownloadManager).
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bytes requested from a stream transport per read.
    pub read_chunk_size: usize,
    /// Bytes between progress events on stream transports.
    pub progress_interval: usize,
    /// Report FIT CRC mismatches as warnings.
    pub verify_checksums: bool,
    /// End the walk at the previously stored fingerprint.
    pub stop_at_fingerprint: bool,
    /// Store the newest fingerprint after a complete session.
    pub save_fingerprints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_chunk_size: 4096,
            progress_interval: 16 * 1024,
            verify_checksums: true,
            stop_at_fingerprint: true,
            save_fingerprints: true,
        }
    }
}
