//! Document and record headers.

use either::Either::{self, Left, Right};
use tartan_bitfield::bitfield;
use zerocopy::FromBytes;

use super::Error;

/// A decoded document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Either 12 or 14 bytes.
    pub header_size: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
    /// Number of record bytes following the header.
    pub data_size: u32,
}

impl FileHeader {
    /// Decode the first twelve bytes of a document.
    ///
    /// A 14-byte header carries two further bytes (a header CRC), which the
    /// caller must skip.
    pub fn parse(r: [u8; 12]) -> Result<Self, Error> {
        #[repr(C)]
        #[derive(FromBytes)]
        struct Raw {
            header_size: u8,
            protocol_version: u8,
            profile_version: [u8; 2],
            data_size: [u8; 4],
            data_type: [u8; 4],
        }

        let Raw {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            data_type,
        } = zerocopy::transmute!(r);

        if &data_type != b".FIT" {
            Err(Error::NotFitData)?;
        }

        if header_size != 12 && header_size != 14 {
            Err(Error::UnknownHeaderLength(header_size))?;
        }

        Ok(Self {
            header_size,
            protocol_version,
            profile_version: u16::from_le_bytes(profile_version),
            data_size: u32::from_le_bytes(data_size),
        })
    }

    pub fn has_crc(&self) -> bool {
        self.header_size == 14
    }
}

/// Header of a definition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionHeader {
    pub local: u8,
    /// The definition is followed by developer field definitions.
    pub developer: bool,
}

/// Header of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub local: u8,
    /// Time offset from a compressed timestamp header, in seconds (0-31).
    pub time_offset: Option<u8>,
}

/// Decode a record header byte.
pub fn record_header(r: u8) -> Either<DefinitionHeader, DataHeader> {
    bitfield! {
        struct RecordHeader(u8) {
            [7] is_compressed,
        }
    }

    if RecordHeader(r).is_compressed() {
        bitfield! {
            struct CompressedHeader(u8) {
                [0..5] time_offset: u8,
                [5..7] local_message: u8,
            }
        }

        let header = CompressedHeader(r);

        Right(DataHeader {
            local: header.local_message(),
            time_offset: Some(header.time_offset()),
        })
    } else {
        bitfield! {
            struct NormalHeader(u8) {
                [0..4] local_message: u8,
                [5] is_developer,
                [6] is_definition,
            }
        }

        let header = NormalHeader(r);
        let local = header.local_message();

        if header.is_definition() {
            Left(DefinitionHeader {
                local,
                developer: header.is_developer(),
            })
        } else {
            Right(DataHeader {
                local,
                time_offset: None,
            })
        }
    }
}

/// Resolve a compressed time offset against the last full timestamp.
///
/// The offset holds the low five bits of the record's timestamp; a value
/// below the last timestamp's low bits means the counter rolled over.
/// Returns `None` when the rolled-over time does not fit in 32 bits.
pub fn resolve_time_offset(last: u32, offset: u8) -> Option<u32> {
    let offset = (offset & 0x1F) as u32;
    let base = last & !0x1F;
    if offset >= last & 0x1F {
        Some(base + offset)
    } else {
        base.checked_add(offset + 0x20)
    }
}
