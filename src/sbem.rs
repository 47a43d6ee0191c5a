//! Decoder for Suunto's SBEM dive logs (EON Steel, EON Core, D5).
//!
//! An SBEM file is the signature `SBEM` and four zero bytes, followed by
//! *descriptor* entries and *data* entries. A descriptor (leading byte zero)
//! names a type id and describes it in text:
//!
//! ```text
//! <PTH>sml.DeviceLog.Samples.Sample.Depth
//! <FRM>uint16
//! <MOD>...
//! ```
//!
//! A descriptor may instead declare a group, `<GRP>id,id,...`, whose data
//! entries pack the listed members' values back to back. Data entries carry
//! a one-byte type id and a length-prefixed payload.
//!
//! Decoding makes two passes over the entries: [`schema::Schema::build`]
//! collects descriptors, then [`dive::decode`] interprets data entries.

use thiserror::Error;

pub mod dive;
pub mod schema;
pub mod walk;

pub use dive::{decode, decode_or_placeholder};

/// File signature: `SBEM` then four reserved zero bytes.
pub const SIGNATURE: [u8; 8] = *b"SBEM\0\0\0\0";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Missing SBEM file signature.")]
    MissingSignature,
    #[error("Malformed entry at offset {0}.")]
    Malformed(usize),
    #[error("No group carries dive samples.")]
    NoSampleGroup,
}
