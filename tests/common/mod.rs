#![allow(dead_code)]

use divesync::{checksum::fit_crc, sbem::SIGNATURE};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// FIT base type bytes.
pub mod base {
    pub const ENUM: u8 = 0x00;
    pub const SINT8: u8 = 0x01;
    pub const UINT8: u8 = 0x02;
    pub const UINT16: u8 = 0x84;
    pub const SINT32: u8 = 0x85;
    pub const UINT32: u8 = 0x86;
    pub const STRING: u8 = 0x07;
    pub const UINT32Z: u8 = 0x8C;
}

/// Writes synthetic FIT documents record by record.
#[derive(Debug, Default)]
pub struct FitWriter {
    records: Vec<u8>,
}

impl FitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a little-endian local message. Fields are
    /// `(number, size, base type)` triples.
    pub fn define(&mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> &mut Self {
        self.records.push(0x40 | local);
        self.records.extend_from_slice(&[0, 0]);
        self.records.extend_from_slice(&global.to_le_bytes());
        self.push_fields(fields)
    }

    pub fn define_big_endian(
        &mut self,
        local: u8,
        global: u16,
        fields: &[(u8, u8, u8)],
    ) -> &mut Self {
        self.records.push(0x40 | local);
        self.records.extend_from_slice(&[0, 1]);
        self.records.extend_from_slice(&global.to_be_bytes());
        self.push_fields(fields)
    }

    /// Define a local message with trailing developer fields of the given
    /// sizes.
    pub fn define_developer(
        &mut self,
        local: u8,
        global: u16,
        fields: &[(u8, u8, u8)],
        developer: &[u8],
    ) -> &mut Self {
        self.records.push(0x60 | local);
        self.records.extend_from_slice(&[0, 0]);
        self.records.extend_from_slice(&global.to_le_bytes());
        self.push_fields(fields);
        self.records.push(developer.len() as u8);
        for (i, &size) in developer.iter().enumerate() {
            self.records.extend_from_slice(&[i as u8, size, 0]);
        }
        self
    }

    fn push_fields(&mut self, fields: &[(u8, u8, u8)]) -> &mut Self {
        self.records.push(fields.len() as u8);
        for &(number, size, base_type) in fields {
            self.records.extend_from_slice(&[number, size, base_type]);
        }
        self
    }

    pub fn data(&mut self, local: u8, body: &[u8]) -> &mut Self {
        self.records.push(local & 0x0F);
        self.records.extend_from_slice(body);
        self
    }

    /// A data record with a compressed timestamp header.
    pub fn compressed(&mut self, local: u8, time_offset: u8, body: &[u8]) -> &mut Self {
        self.records.push(0x80 | (local & 0x03) << 5 | (time_offset & 0x1F));
        self.records.extend_from_slice(body);
        self
    }

    /// A 14-byte header, the records, and the file CRC.
    pub fn finish(&self) -> Vec<u8> {
        let mut r = vec![14, 0x20];
        r.extend_from_slice(&2132u16.to_le_bytes());
        r.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        r.extend_from_slice(b".FIT");
        let header_crc = fit_crc(0, &r);
        r.extend_from_slice(&header_crc.to_le_bytes());
        r.extend_from_slice(&self.records);
        let crc = fit_crc(0, &r);
        r.extend_from_slice(&crc.to_le_bytes());
        r
    }
}

/// Concatenate little-endian field bytes into a message body.
pub fn body(fields: &[&[u8]]) -> Vec<u8> {
    fields.concat()
}

/// A FIT dive: a file id, `depths_mm` one second apart, and a summary.
pub fn fit_dive(time_created: u32, depths_mm: &[u32]) -> Vec<u8> {
    let mut w = FitWriter::new();
    w.define(
        0,
        0,
        &[(3, 4, base::UINT32Z), (4, 4, base::UINT32), (1, 2, base::UINT16)],
    )
    .data(
        0,
        &body(&[
            &1234u32.to_le_bytes(),
            &time_created.to_le_bytes(),
            &1u16.to_le_bytes(),
        ]),
    )
    .define(1, 20, &[(253, 4, base::UINT32), (92, 4, base::UINT32)]);

    for (i, depth) in depths_mm.iter().enumerate() {
        let ts = time_created + i as u32;
        w.data(1, &body(&[&ts.to_le_bytes(), &depth.to_le_bytes()]));
    }

    let max = depths_mm.iter().copied().max().unwrap_or(0);
    w.define(2, 268, &[(3, 4, base::UINT32), (10, 4, base::UINT32)])
        .data(2, &body(&[&max.to_le_bytes(), &7u32.to_le_bytes()]));

    w.finish()
}

/// Writes synthetic SBEM files.
#[derive(Debug)]
pub struct SbemWriter {
    r: Vec<u8>,
}

impl Default for SbemWriter {
    fn default() -> Self {
        Self {
            r: SIGNATURE.to_vec(),
        }
    }
}

impl SbemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn length(&mut self, len: usize) {
        if len < 0xFF {
            self.r.push(len as u8);
        } else {
            self.r.push(0xFF);
            self.r.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }

    pub fn descriptor(&mut self, id: u16, text: &str) -> &mut Self {
        self.r.push(0);
        self.length(text.len() + 2);
        self.r.extend_from_slice(&id.to_le_bytes());
        self.r.extend_from_slice(text.as_bytes());
        self
    }

    pub fn scalar(&mut self, id: u16, path: &str, format: &str) -> &mut Self {
        self.descriptor(id, &format!("<PTH>{path}\n<FRM>{format}\n"))
    }

    pub fn group(&mut self, id: u16, members: &[u16]) -> &mut Self {
        let members: Vec<String> = members.iter().map(u16::to_string).collect();
        self.descriptor(id, &format!("<GRP>{}", members.join(",")))
    }

    pub fn data(&mut self, id: u8, payload: &[u8]) -> &mut Self {
        self.r.push(id);
        self.length(payload.len());
        self.r.extend_from_slice(payload);
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.r.clone()
    }
}

pub const SAMPLE_GROUP: u8 = 30;
pub const PRESSURE_GROUP: u8 = 31;

/// Declare a sample group (time delta in ms, depth in cm, temperature in
/// tenths of a degree) and a pressure group (gas number, centibar).
pub fn sbem_schema(w: &mut SbemWriter) -> &mut SbemWriter {
    w.scalar(10, "sml.DeviceLog.Samples.Sample.Time", "uint16")
        .scalar(11, "sml.DeviceLog.Samples.Sample.Depth", "uint16")
        .scalar(12, "sml.DeviceLog.Samples.Sample.Temperature", "int16")
        .scalar(13, "sml.DeviceLog.Samples.Sample.Cylinder.GasNumber", "uint8")
        .scalar(14, "sml.DeviceLog.Samples.Sample.Cylinder.Pressure", "uint16")
        .group(SAMPLE_GROUP as u16, &[10, 11, 12])
        .group(PRESSURE_GROUP as u16, &[13, 14])
}

pub fn sbem_sample(time_ms: u16, depth_cm: u16, temperature_dc: i16) -> Vec<u8> {
    [
        time_ms.to_le_bytes(),
        depth_cm.to_le_bytes(),
        temperature_dc.to_le_bytes(),
    ]
    .concat()
}

pub fn sbem_pressure(tank: u8, centibar: u16) -> Vec<u8> {
    let mut payload = vec![tank];
    payload.extend_from_slice(&centibar.to_le_bytes());
    payload
}

/// Three samples: 0 cm, 500 cm, 0 cm, one minute apart.
pub fn sbem_dive() -> Vec<u8> {
    let mut w = SbemWriter::new();
    sbem_schema(&mut w)
        .data(SAMPLE_GROUP, &sbem_sample(0, 0, 250))
        .data(SAMPLE_GROUP, &sbem_sample(60000, 500, 180))
        .data(SAMPLE_GROUP, &sbem_sample(60000, 0, 200));
    w.finish()
}
