//! Decoder for Garmin's Flexible and Interoperable Data Transfer protocol.
//!
//! A FIT document is a file header, a stream of records, and a trailing CRC.
//! Each record is either a *definition*, declaring the byte layout of a local
//! message type (0-15), or *data*, holding field bytes laid out by the most
//! recent definition for its local type.
//!
//! [`decode::decode`] walks the records once and publishes every data message
//! to a [`decode::MessageSink`]. [`dive::decode`] is the sink used for dive
//! activities, collecting samples, gas mixes, and summaries.

use thiserror::Error;

pub mod data;
pub mod decode;
pub mod definition;
pub mod dive;
pub mod header;

pub use decode::{Message, MessageSink, decode};

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Field number holding a message's timestamp, shared by all messages.
pub const TIMESTAMP_FIELD: u8 = 253;

/// Field number holding a message's index, shared by all messages.
pub const MESSAGE_INDEX_FIELD: u8 = 254;

/// Global message numbers this crate interprets.
pub mod global {
    pub const FILE_ID: u16 = 0;
    pub const SESSION: u16 = 18;
    pub const RECORD: u16 = 20;
    pub const EVENT: u16 = 21;
    pub const DEVICE_INFO: u16 = 23;
    pub const DIVE_GAS: u16 = 259;
    pub const DIVE_SUMMARY: u16 = 268;
    pub const TANK_UPDATE: u16 = 319;
}

/// Errors occurring while decoding a FIT document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unexpectedly reached the end of the data.
    #[error("Unexpectedly reached the end of the data at offset {0}.")]
    EndOfSlice(usize),
    /// Incorrect file type marker.
    #[error("Incorrect file type marker.")]
    NotFitData,
    /// Unknown header length.
    #[error("Unknown header length ({0}).")]
    UnknownHeaderLength(u8),
    /// A data record referenced a local message with no definition.
    #[error("Data record for undefined local message {0}.")]
    UndefinedLocalMessage(u8),
}

impl Error {
    /// Whether the document header itself is invalid, as opposed to a fault
    /// part-way through its records.
    pub fn is_header(&self) -> bool {
        matches!(self, Self::NotFitData | Self::UnknownHeaderLength(_))
    }
}

/// Convert a FIT timestamp to seconds since the Unix epoch.
pub fn to_unix_time(timestamp: u32) -> i64 {
    timestamp as i64 + FIT_EPOCH_OFFSET
}

/// Convert a position in semicircles to degrees.
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    semicircles as f64 * 180.0 / 2f64.powi(31)
}
