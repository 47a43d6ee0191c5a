//! Endian-aware integer, BCD, and string readers.
//!
//! The free functions index directly into the supplied slice and panic when
//! the read runs past its end: callers are expected to have validated the
//! offset. Decoders walking untrusted input use [`Cursor`], which returns
//! `None` instead.

/// Read a little-endian `u16` at an offset.
pub fn read_u16_le(r: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(array(r, offset))
}

/// Read a big-endian `u16` at an offset.
pub fn read_u16_be(r: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(array(r, offset))
}

/// Read a little-endian `u32` at an offset.
pub fn read_u32_le(r: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(array(r, offset))
}

/// Read a big-endian `u32` at an offset.
pub fn read_u32_be(r: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(array(r, offset))
}

/// Write a little-endian `u16` at an offset.
pub fn write_u16_le(w: &mut [u8], offset: usize, value: u16) {
    w[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Write a big-endian `u16` at an offset.
pub fn write_u16_be(w: &mut [u8], offset: usize, value: u16) {
    w[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Write a little-endian `u32` at an offset.
pub fn write_u32_le(w: &mut [u8], offset: usize, value: u32) {
    w[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Write a big-endian `u32` at an offset.
pub fn write_u32_be(w: &mut [u8], offset: usize, value: u32) {
    w[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Decode one packed binary-coded decimal byte (`0x42` is 42).
pub fn read_bcd(b: u8) -> u8 {
    ((b >> 4) & 0x0F) * 10 + (b & 0x0F)
}

/// Read text of at most `max_length` bytes, stopping at the first zero byte.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn read_string(r: &[u8], offset: usize, max_length: usize) -> String {
    let end = (offset + max_length).min(r.len());
    let bytes = &r[offset..end];
    let bytes = match bytes.iter().position(|&b| b == 0) {
        Some(nul) => &bytes[..nul],
        None => bytes,
    };

    String::from_utf8_lossy(bytes).into_owned()
}

fn array<const N: usize>(r: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0; N];
    buf.copy_from_slice(&r[offset..offset + N]);
    buf
}

/// A bounds-checked forward reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    r: &'a [u8],
    i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(r: &'a [u8]) -> Self {
        Self { r, i: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.i
    }

    pub fn remaining(&self) -> usize {
        self.r.len() - self.i
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.r.get(self.i).copied()
    }

    /// Take an exact number of bytes, advancing the cursor only on success.
    pub fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.bytes(N)?;
        let mut buf = [0; N];
        buf.copy_from_slice(bytes);
        Some(buf)
    }

    /// Take a slice of `n` bytes, advancing the cursor only on success.
    pub fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.i.checked_add(n)?;
        let bytes = self.r.get(self.i..end)?;
        self.i = end;
        Some(bytes)
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.bytes(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn u16_le(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }
}
