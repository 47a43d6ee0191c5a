//! Single-pass record walker.

use std::collections::HashMap;

use either::Either::{Left, Right};
use log::{debug, warn};

use crate::{binary::Cursor, checksum::fit_crc};

use super::{
    Error, TIMESTAMP_FIELD,
    data::{Value, decode_field},
    definition::Definition,
    header::{FileHeader, record_header, resolve_time_offset},
};

/// A decoded data message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub global: u16,
    pub local: u8,
    /// Timestamp from the message's own field, or resolved from a compressed
    /// header.
    pub timestamp: Option<u32>,
    pub fields: Vec<(u8, Value)>,
}

impl Message {
    pub fn get(&self, field: u8) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == field).map(|(_, v)| v)
    }

    pub fn u64(&self, field: u8) -> Option<u64> {
        self.get(field).and_then(Value::as_u64)
    }

    pub fn u32(&self, field: u8) -> Option<u32> {
        self.u64(field).and_then(|x| u32::try_from(x).ok())
    }

    pub fn u16(&self, field: u8) -> Option<u16> {
        self.u64(field).and_then(|x| u16::try_from(x).ok())
    }

    pub fn u8(&self, field: u8) -> Option<u8> {
        self.u64(field).and_then(|x| u8::try_from(x).ok())
    }

    pub fn i64(&self, field: u8) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn i32(&self, field: u8) -> Option<i32> {
        self.i64(field).and_then(|x| i32::try_from(x).ok())
    }

    pub fn f64(&self, field: u8) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }
}

/// Receive decoded data messages.
pub trait MessageSink {
    /// Whether fields of messages with this global number should be decoded.
    ///
    /// Rejected messages are skipped without decoding their fields.
    fn accepts(&self, _global: u16) -> bool {
        true
    }

    fn message(&mut self, message: Message);
}

/// Summary of a completed walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub header: FileHeader,
    /// Outcome of the trailing CRC check, if the document has one.
    pub crc_valid: Option<bool>,
    /// Number of definition and data records walked.
    pub records: usize,
}

/// Decode the records of a document, publishing data messages to a sink.
///
/// Messages published before an error are not retracted; the sink holds
/// everything decoded up to the faulty record.
pub fn decode(r: &[u8], o: &mut impl MessageSink) -> Result<Report, Error> {
    let mut c = Cursor::new(r);

    let header = FileHeader::parse(take(&mut c)?)?;
    if header.has_crc() {
        take::<2>(&mut c)?;
    }

    let end = c.position() + header.data_size as usize; // Offset to the end of the record section.

    let crc_valid = r.get(end..end + 2).map(|found| {
        let found = u16::from_le_bytes([found[0], found[1]]);
        let calculated = fit_crc(0, &r[..end]);
        if found != calculated {
            warn!("FIT CRC mismatch: found {found:#06x}, calculated {calculated:#06x}");
        }
        found == calculated
    });

    // Active definition for each local message type.
    let mut definitions: HashMap<u8, Definition> = HashMap::new();
    let mut last_timestamp: Option<u32> = None;
    let mut records = 0;

    while c.position() < end {
        let [b] = take(&mut c)?;
        records += 1;

        match record_header(b) {
            Left(header) => {
                let definition = Definition::parse(&mut c, header.developer)?;
                definitions.insert(header.local, definition);
            }
            Right(header) => {
                let definition = definitions
                    .get(&header.local)
                    .ok_or(Error::UndefinedLocalMessage(header.local))?;

                let offset = c.position();
                let body = c
                    .bytes(definition.data_size())
                    .ok_or(Error::EndOfSlice(offset))?;

                let compressed = header
                    .time_offset
                    .zip(last_timestamp)
                    .and_then(|(offset, last)| resolve_time_offset(last, offset));

                if !o.accepts(definition.global) {
                    if let Some(ts) = field_timestamp(definition, body) {
                        last_timestamp = Some(ts);
                    }
                    debug!("skipping FIT message {}", definition.global);
                    continue;
                }

                let message = decode_message(definition, header.local, body, compressed);
                if let Some(ts) = message.timestamp {
                    last_timestamp = Some(ts);
                }
                o.message(message);
            }
        }
    }

    Ok(Report {
        header,
        crc_valid,
        records,
    })
}

fn decode_message(
    definition: &Definition,
    local: u8,
    body: &[u8],
    compressed: Option<u32>,
) -> Message {
    let mut fields = Vec::with_capacity(definition.fields.len());
    let mut i = 0;

    for field in &definition.fields {
        let bytes = &body[i..i + field.size as usize];
        i += field.size as usize;

        if let Some(value) = decode_field(bytes, field, definition.endian) {
            fields.push((field.number, value));
        }
    }

    let timestamp = fields
        .iter()
        .find(|(n, _)| *n == TIMESTAMP_FIELD)
        .and_then(|(_, v)| v.as_u64())
        .and_then(|ts| u32::try_from(ts).ok())
        .or(compressed);

    Message {
        global: definition.global,
        local,
        timestamp,
        fields,
    }
}

/// Read only the timestamp field of a message body.
fn field_timestamp(definition: &Definition, body: &[u8]) -> Option<u32> {
    let mut i = 0;
    for field in &definition.fields {
        let bytes = &body[i..i + field.size as usize];
        i += field.size as usize;

        if field.number == TIMESTAMP_FIELD {
            return decode_field(bytes, field, definition.endian)?
                .as_u64()
                .and_then(|ts| u32::try_from(ts).ok());
        }
    }
    None
}

/// Take an exact number of bytes, reporting the offset on failure.
fn take<const N: usize>(c: &mut Cursor<'_>) -> Result<[u8; N], Error> {
    let offset = c.position();
    c.take().ok_or(Error::EndOfSlice(offset))
}
