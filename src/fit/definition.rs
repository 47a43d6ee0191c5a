//! Definition records: the layout of a local message type.

use log::debug;
use zerocopy::FromBytes;

use crate::binary::Cursor;

use super::Error;

/// Byte order of a message's multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// FIT base types.
///
/// The `z` variants differ from their unsigned counterparts only in their
/// invalid marker on the wire; they decode identically here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    String,
    Float32,
    Float64,
    UInt8z,
    UInt16z,
    UInt32z,
    Byte,
    SInt64,
    UInt64,
    UInt64z,
}

impl BaseType {
    /// Decode a base type byte. The endian-ability flag (bit 7) is ignored.
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b & 0x1F {
            0x00 => Self::Enum,
            0x01 => Self::SInt8,
            0x02 => Self::UInt8,
            0x03 => Self::SInt16,
            0x04 => Self::UInt16,
            0x05 => Self::SInt32,
            0x06 => Self::UInt32,
            0x07 => Self::String,
            0x08 => Self::Float32,
            0x09 => Self::Float64,
            0x0A => Self::UInt8z,
            0x0B => Self::UInt16z,
            0x0C => Self::UInt32z,
            0x0D => Self::Byte,
            0x0E => Self::SInt64,
            0x0F => Self::UInt64,
            0x10 => Self::UInt64z,
            _ => return None,
        })
    }

    /// Size in bytes of a single element of this type.
    pub fn size(self) -> usize {
        match self {
            Self::Enum | Self::SInt8 | Self::UInt8 | Self::UInt8z | Self::Byte | Self::String => 1,
            Self::SInt16 | Self::UInt16 | Self::UInt16z => 2,
            Self::SInt32 | Self::UInt32 | Self::UInt32z | Self::Float32 => 4,
            Self::Float64 | Self::SInt64 | Self::UInt64 | Self::UInt64z => 8,
        }
    }
}

/// Layout of one field within a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub number: u8,
    /// Size in bytes; a multiple of the base type's size for arrays.
    pub size: u8,
    pub base_type: BaseType,
}

/// Layout of a local message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub endian: Endian,
    pub global: u16,
    pub fields: Vec<FieldDefinition>,
    /// Bytes of developer fields trailing each data message.
    pub developer_size: usize,
}

impl Definition {
    /// Decode the body of a definition record, following its header byte.
    pub fn parse(c: &mut Cursor<'_>, developer: bool) -> Result<Self, Error> {
        #[repr(C)]
        #[derive(FromBytes)]
        struct DefinitionMessage {
            _reserved: u8,
            architecture: u8,
            global_message: [u8; 2],
            field_count: u8,
        }

        let r = take::<5>(c)?;
        let DefinitionMessage {
            architecture,
            global_message,
            field_count,
            ..
        } = zerocopy::transmute!(r);

        let (endian, global) = if architecture == 0 {
            (Endian::Little, u16::from_le_bytes(global_message))
        } else {
            (Endian::Big, u16::from_be_bytes(global_message))
        };

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let [number, size, base_type] = take::<3>(c)?;

            let base_type = BaseType::from_byte(base_type).unwrap_or_else(|| {
                debug!("unknown FIT base type {base_type:#04x} for field {number}, reading as bytes");
                BaseType::Byte
            });

            fields.push(FieldDefinition {
                number,
                size,
                base_type,
            });
        }

        let mut developer_size = 0;
        if developer {
            let [count] = take::<1>(c)?;
            for _ in 0..count {
                let [_number, size, _developer_index] = take::<3>(c)?;
                developer_size += size as usize;
            }
        }

        Ok(Self {
            endian,
            global,
            fields,
            developer_size,
        })
    }

    /// Total bytes of a data message with this layout.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.size as usize).sum::<usize>() + self.developer_size
    }

    pub fn has_field(&self, number: u8) -> bool {
        self.fields.iter().any(|f| f.number == number)
    }
}

fn take<const N: usize>(c: &mut Cursor<'_>) -> Result<[u8; N], Error> {
    let offset = c.position();
    c.take().ok_or(Error::EndOfSlice(offset))
}
