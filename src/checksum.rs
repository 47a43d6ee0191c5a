//! Checksums used to verify data read from dive computers.

/// CRC-16/CCITT: polynomial `0x1021`, initial value `0xFFFF`, MSB first.
pub fn crc16(r: &[u8]) -> u16 {
    r.iter().fold(0xFFFF, |mut crc, &b| {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// CRC-32 (ISO 3309): reflected polynomial `0xEDB88320`, initial value and
/// final XOR `0xFFFFFFFF`.
pub fn crc32(r: &[u8]) -> u32 {
    let crc = r.iter().fold(0xFFFF_FFFF, |mut crc: u32, &b| {
        crc ^= b as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
        crc
    });

    crc ^ 0xFFFF_FFFF
}

/// Running byte sum modulo 256.
pub fn sum8(r: &[u8]) -> u8 {
    r.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Accumulate a slice of bytes into a FIT file CRC.
///
/// FIT files use their own reflected CRC-16 (polynomial `0xA001`), computed a
/// nibble at a time. Pass `0` to start a new check, or a previous result to
/// continue one.
pub fn fit_crc(init: u16, r: &[u8]) -> u16 {
    r.iter().fold(init, |acc, b| fit_crc_byte(acc, *b))
}

fn fit_crc_byte(mut crc: u16, b: u8) -> u16 {
    const CRC_TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    for nibble in [b & 0xF, (b >> 4) & 0xF] {
        let tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[nibble as usize];
    }

    crc
}
