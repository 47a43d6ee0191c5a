use divesync::{
    binary::{
        Cursor, read_bcd, read_string, read_u16_be, read_u16_le, read_u32_be, read_u32_le,
        write_u16_be, write_u16_le, write_u32_be, write_u32_le,
    },
    checksum::{crc16, crc32, fit_crc, sum8},
};

const CHECK: &[u8] = b"123456789";

#[test]
fn crc32_reference_values() {
    assert_eq!(crc32(CHECK), 0xCBF4_3926);
    assert_eq!(crc32(&[]), 0x0000_0000);
}

#[test]
fn crc16_reference_values() {
    assert_eq!(crc16(CHECK), 0x29B1);
    assert_eq!(crc16(&[]), 0xFFFF);
}

#[test]
fn fit_crc_reference_values() {
    // CRC-16/ARC.
    assert_eq!(fit_crc(0, CHECK), 0xBB3D);
    assert_eq!(fit_crc(fit_crc(0, &CHECK[..4]), &CHECK[4..]), 0xBB3D);
}

#[test]
fn sum8_wraps() {
    assert_eq!(sum8(&[]), 0);
    assert_eq!(sum8(&[1, 2, 3]), 6);
    assert_eq!(sum8(&[0xFF, 0x02]), 0x01);
}

#[test]
fn endian_round_trip() {
    let mut w = [0u8; 6];

    for v in [0u16, 1, 0x1234, 0xFFFF] {
        write_u16_le(&mut w, 1, v);
        assert_eq!(read_u16_le(&w, 1), v);
        write_u16_be(&mut w, 1, v);
        assert_eq!(read_u16_be(&w, 1), v);
    }

    for v in [0u32, 1, 0x1234_5678, 0xFFFF_FFFF] {
        write_u32_le(&mut w, 2, v);
        assert_eq!(read_u32_le(&w, 2), v);
        write_u32_be(&mut w, 2, v);
        assert_eq!(read_u32_be(&w, 2), v);
    }
}

#[test]
fn endian_byte_order() {
    let r = [0x12, 0x34, 0x56, 0x78];
    assert_eq!(read_u16_le(&r, 0), 0x3412);
    assert_eq!(read_u16_be(&r, 0), 0x1234);
    assert_eq!(read_u32_le(&r, 0), 0x7856_3412);
    assert_eq!(read_u32_be(&r, 0), 0x1234_5678);
}

#[test]
fn bcd() {
    assert_eq!(read_bcd(0x00), 0);
    assert_eq!(read_bcd(0x42), 42);
    assert_eq!(read_bcd(0x99), 99);
}

#[test]
fn string_stops_at_nul_and_length() {
    let r = b"xxEON\0Core";
    assert_eq!(read_string(r, 2, 8), "EON");
    assert_eq!(read_string(r, 2, 2), "EO");
    assert_eq!(read_string(b"Perdix", 0, 64), "Perdix");
    assert_eq!(read_string(&[0x41, 0xFF, 0x42], 0, 3), "A\u{FFFD}B");
}

#[test]
fn cursor_never_reads_past_the_end() {
    let mut c = Cursor::new(&[1, 2, 3, 4, 5]);
    assert_eq!(c.u8(), Some(1));
    assert_eq!(c.u16_le(), Some(0x0302));
    assert_eq!(c.u32_le(), None);
    assert_eq!(c.position(), 3);
    assert_eq!(c.peek(), Some(4));
    assert_eq!(c.take::<2>(), Some([4, 5]));
    assert!(c.is_empty());
    assert_eq!(c.bytes(1), None);
    assert_eq!(c.skip(usize::MAX), None);
}
