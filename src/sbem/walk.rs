//! Entry-level traversal of an SBEM file.

use zerocopy::FromBytes;

use crate::binary::Cursor;

use super::{Error, SIGNATURE};

/// One entry of an SBEM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    /// Declares a type id and its textual description.
    Descriptor { id: u16, text: &'a [u8] },
    /// A value (or group of values) of a previously declared type.
    Data { id: u8, payload: &'a [u8] },
}

/// Iterator over the entries following the file signature.
///
/// A malformed entry yields one `Err` and ends the walk.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    c: Cursor<'a>,
    done: bool,
}

/// Check the file signature and start a walk over the entries.
pub fn entries(r: &[u8]) -> Result<Walk<'_>, Error> {
    #[repr(C)]
    #[derive(FromBytes)]
    struct FileHeader {
        magic: [u8; 4],
        reserved: [u8; 4],
    }

    let mut c = Cursor::new(r);
    let h = c.take::<8>().ok_or(Error::MissingSignature)?;
    let FileHeader { magic, reserved } = zerocopy::transmute!(h);

    if magic != SIGNATURE[..4] || reserved != SIGNATURE[4..] {
        Err(Error::MissingSignature)?;
    }

    Ok(Walk { c, done: false })
}

impl<'a> Walk<'a> {
    /// Read a length byte, where `0xFF` announces a four-byte length.
    fn length(&mut self) -> Option<usize> {
        match self.c.u8()? {
            0xFF => self.c.u32_le().map(|n| n as usize),
            n => Some(n as usize),
        }
    }

    fn entry(&mut self) -> Option<Entry<'a>> {
        match self.c.u8()? {
            0 => {
                let len = self.length()?;
                let body = self.c.bytes(len)?;
                let (id, text) = body.split_at_checked(2)?;
                let text = match text.iter().position(|&b| b == 0) {
                    Some(nul) => &text[..nul],
                    None => text,
                };
                Some(Entry::Descriptor {
                    id: u16::from_le_bytes([id[0], id[1]]),
                    text,
                })
            }
            id => {
                let len = self.length()?;
                let payload = self.c.bytes(len)?;
                Some(Entry::Data { id, payload })
            }
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Result<Entry<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.c.is_empty() {
            return None;
        }

        let offset = self.c.position();
        match self.entry() {
            Some(entry) => Some(Ok(entry)),
            None => {
                self.done = true;
                Some(Err(Error::Malformed(offset)))
            }
        }
    }
}
