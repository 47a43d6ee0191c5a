//! Selection of a protocol decoder by vendor.

use log::{debug, warn};
use thiserror::Error;

use crate::{checksum::crc32, descriptor::DeviceDescriptor, dive::NormalizedDive, fit, sbem};

/// The closed set of supported dive log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decoder {
    Fit,
    Sbem,
}

/// Vendors whose devices write each format.
const VENDORS: &[(&str, Decoder)] = &[("Garmin", Decoder::Fit), ("Suunto", Decoder::Sbem)];

/// Errors that abort decoding of one buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("FIT: {0}")]
    Fit(#[from] fit::Error),
}

/// Dives decoded from one buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodeOutput {
    pub dives: Vec<NormalizedDive>,
    /// Fingerprint reported by the data itself, if the format has one.
    pub fingerprint: Option<Vec<u8>>,
    pub serial: Option<u32>,
    /// Data-quality problems that did not stop decoding.
    pub warnings: Vec<String>,
}

impl Decoder {
    pub fn for_vendor(vendor: &str) -> Option<Self> {
        VENDORS
            .iter()
            .find(|(v, _)| v.eq_ignore_ascii_case(vendor))
            .map(|(_, d)| *d)
    }

    pub fn for_descriptor(descriptor: &DeviceDescriptor) -> Option<Self> {
        Self::for_vendor(descriptor.vendor)
    }

    /// Decode one buffer (a file, or a whole stream) from a device.
    ///
    /// The dive id is derived from the buffer's contents, so decoding the same
    /// bytes always yields the same dives.
    pub fn decode(
        self,
        descriptor: &DeviceDescriptor,
        r: &[u8],
        verify_checksums: bool,
    ) -> Result<DecodeOutput, DecodeError> {
        let id = format!("{:08x}", crc32(r));
        let model = format!("{} {}", descriptor.vendor, descriptor.product);

        match self {
            Self::Fit => {
                let dive = fit::dive::decode(r)?;
                let mut out = DecodeOutput {
                    fingerprint: dive.fingerprint(),
                    serial: dive.file_id.serial_number,
                    ..Default::default()
                };

                if verify_checksums && dive.crc_valid == Some(false) {
                    out.warnings.push(format!("{id}: FIT CRC mismatch"));
                }
                if let Some(err) = &dive.truncated {
                    warn!("FIT file {id} is truncated: {err}");
                    out.warnings.push(format!("{id}: {err}"));
                }

                if dive.is_dive() {
                    out.dives.push(dive.normalize(id, &model));
                } else {
                    debug!("FIT file {id} holds no dive data");
                }
                Ok(out)
            }
            Self::Sbem => {
                let (dive, err) = sbem::decode_or_placeholder(r, id.as_str(), &model);
                let mut out = DecodeOutput::default();
                if let Some(err) = err {
                    out.warnings.push(format!("{id}: {err}"));
                }
                out.dives.push(dive);
                Ok(out)
            }
        }
    }
}
