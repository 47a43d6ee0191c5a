//! The normalized dive record produced by every decoder.
//!
//! Units are fixed: depths in millimetres, pressures in millibar,
//! temperatures in millikelvin, gas fractions in permille, times in seconds.
//! Decoders convert once, while decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zero degrees Celsius, in millikelvin.
pub const ZERO_CELSIUS_MK: i64 = 273_150;

/// Convert a temperature in degrees Celsius to millikelvin.
pub fn celsius_to_mk(celsius: f64) -> u32 {
    ((celsius * 1000.0).round() as i64 + ZERO_CELSIUS_MK).max(0) as u32
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedDive {
    pub id: String,
    pub number: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_s: u32,
    pub max_depth_mm: u32,
    pub mean_depth_mm: u32,
    pub surface_temperature_mk: Option<u32>,
    pub water_temperature_mk: Option<u32>,
    pub location: Option<Position>,
    pub cylinders: Vec<Cylinder>,
    pub computers: Vec<DiveComputer>,
    pub events: Vec<DiveEvent>,
}

impl NormalizedDive {
    /// A dive with no samples, standing in for data that could not be decoded.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            computers: vec![DiveComputer::default()],
            ..Default::default()
        }
    }

    /// Samples of the first dive computer.
    pub fn samples(&self) -> &[DiveSample] {
        self.computers.first().map_or(&[], |c| &c.samples)
    }
}

/// Latitude and longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GasMix {
    pub o2_permille: u16,
    pub he_permille: u16,
    pub n2_permille: u16,
}

impl GasMix {
    /// Build a mix from whole percentages; nitrogen makes up the remainder.
    pub fn from_percent(o2: u8, he: u8) -> Self {
        let o2 = (o2.min(100) as u16) * 10;
        let he = (he.min(100) as u16) * 10;
        Self {
            o2_permille: o2,
            he_permille: he,
            n2_permille: 1000u16.saturating_sub(o2 + he),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cylinder {
    pub mix: GasMix,
    pub start_pressure_mbar: Option<u32>,
    pub end_pressure_mbar: Option<u32>,
    pub working_pressure_mbar: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiveComputer {
    pub model: String,
    pub serial: Option<u32>,
    pub firmware: Option<String>,
    pub samples: Vec<DiveSample>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiveSample {
    /// Seconds since the start of the dive.
    pub time_s: u32,
    pub depth_mm: u32,
    pub temperature_mk: Option<u32>,
    pub pressures: Vec<TankPressure>,
    pub deco: Option<Deco>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankPressure {
    pub tank: u8,
    pub pressure_mbar: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deco {
    pub ndl_s: Option<u32>,
    pub time_to_surface_s: Option<u32>,
    pub stop_depth_mm: Option<u32>,
    pub stop_time_s: Option<u32>,
    pub cns_percent: Option<u8>,
    pub in_deco: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveEvent {
    pub time_s: u32,
    pub kind: DiveEventKind,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiveEventKind {
    GasSwitch,
    Bookmark,
    Ascent,
    Alert,
    Other(u8),
}
