//! Dive activities: samples, gas mixes, and summaries.
//!
//! Values are first collected in the units FIT itself describes (metres,
//! metres per second, bar); [`FitDive::normalize`] converts them to the fixed
//! units of [`NormalizedDive`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;

use crate::dive::{
    Cylinder, Deco, DiveComputer, DiveEvent, DiveEventKind, DiveSample, GasMix, NormalizedDive,
    Position, TankPressure, celsius_to_mk,
};

use super::{
    Error, MESSAGE_INDEX_FIELD, Message, MessageSink, decode::Report, global,
    semicircles_to_degrees, to_unix_time,
};

mod field {
    pub mod file_id {
        pub const MANUFACTURER: u8 = 1;
        pub const PRODUCT: u8 = 2;
        pub const SERIAL_NUMBER: u8 = 3;
        pub const TIME_CREATED: u8 = 4;
    }

    pub mod session {
        pub const START_TIME: u8 = 2;
        pub const START_POSITION_LAT: u8 = 3;
        pub const START_POSITION_LONG: u8 = 4;
        pub const TOTAL_ELAPSED_TIME: u8 = 7;
    }

    pub mod record {
        pub const POSITION_LAT: u8 = 0;
        pub const POSITION_LONG: u8 = 1;
        pub const TEMPERATURE: u8 = 13;
        pub const DEPTH: u8 = 92;
        pub const NEXT_STOP_DEPTH: u8 = 93;
        pub const NEXT_STOP_TIME: u8 = 94;
        pub const TIME_TO_SURFACE: u8 = 95;
        pub const NDL_TIME: u8 = 96;
        pub const CNS_LOAD: u8 = 97;
        pub const ASCENT_RATE: u8 = 127;
        pub const PO2: u8 = 129;
    }

    pub mod event {
        pub const EVENT: u8 = 0;
        pub const DATA: u8 = 3;
    }

    pub mod device_info {
        pub const SOFTWARE_VERSION: u8 = 5;
    }

    pub mod dive_gas {
        pub const HELIUM_CONTENT: u8 = 0;
        pub const OXYGEN_CONTENT: u8 = 1;
        pub const STATUS: u8 = 2;
    }

    pub mod dive_summary {
        pub const REFERENCE_MESG: u8 = 0;
        pub const AVG_DEPTH: u8 = 2;
        pub const MAX_DEPTH: u8 = 3;
        pub const SURFACE_INTERVAL: u8 = 4;
        pub const DIVE_NUMBER: u8 = 10;
        pub const BOTTOM_TIME: u8 = 11;
    }

    pub mod tank_update {
        pub const SENSOR: u8 = 0;
        pub const PRESSURE: u8 = 1;
    }
}

mod event {
    pub const DIVE_ALERT: u8 = 56;
    pub const DIVE_GAS_SWITCHED: u8 = 57;
}

/// `dive_gas` status marking a disabled gas.
const GAS_DISABLED: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileId {
    pub manufacturer: Option<u16>,
    pub product: Option<u16>,
    pub serial_number: Option<u32>,
    pub time_created: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Session {
    pub start_time: Option<u32>,
    pub elapsed_s: Option<f64>,
    pub start_position: Option<Position>,
}

/// One `record` message carrying a depth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// FIT timestamp, in seconds since the FIT epoch.
    pub timestamp: u32,
    pub depth_m: f64,
    pub temperature_c: Option<f64>,
    pub position: Option<Position>,
    pub next_stop_depth_m: Option<f64>,
    pub next_stop_time_s: Option<u32>,
    pub time_to_surface_s: Option<u32>,
    pub ndl_s: Option<u32>,
    pub cns_percent: Option<u8>,
    pub ascent_rate_m_s: Option<f64>,
    pub ppo2_bar: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gas {
    pub oxygen_percent: u8,
    pub helium_percent: u8,
    pub enabled: bool,
}

impl Gas {
    pub fn nitrogen_percent(&self) -> u8 {
        100u8
            .saturating_sub(self.oxygen_percent)
            .saturating_sub(self.helium_percent)
    }
}

/// End-of-dive aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiveSummary {
    pub timestamp: Option<u32>,
    pub reference_mesg: Option<u16>,
    pub max_depth_m: f64,
    pub avg_depth_m: Option<f64>,
    pub surface_interval_s: Option<u32>,
    pub dive_number: Option<u32>,
    pub bottom_time_s: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankUpdate {
    pub timestamp: u32,
    pub sensor: u32,
    pub pressure_bar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u32,
    pub event: u8,
    pub data: Option<u32>,
}

/// Everything collected from one FIT dive activity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitDive {
    pub file_id: FileId,
    pub firmware: Option<String>,
    pub session: Option<Session>,
    pub samples: Vec<Sample>,
    /// Gas mixes keyed by message index.
    pub gases: BTreeMap<u16, Gas>,
    pub summary: Option<DiveSummary>,
    pub tank_updates: Vec<TankUpdate>,
    pub events: Vec<Event>,
    pub crc_valid: Option<bool>,
    /// Error that cut the record walk short, if any.
    pub truncated: Option<Error>,
}

/// Decode a dive activity.
///
/// Only an invalid document header is an error. A fault part-way through
/// the records keeps everything decoded before it and is noted in
/// [`FitDive::truncated`].
pub fn decode(r: &[u8]) -> Result<FitDive, Error> {
    let mut dive = FitDive::default();

    match super::decode(r, &mut dive) {
        Ok(Report { crc_valid, .. }) => dive.crc_valid = crc_valid,
        Err(err) if err.is_header() => return Err(err),
        Err(err) => {
            debug!("FIT walk stopped early: {err}");
            dive.truncated = Some(err);
        }
    }

    Ok(dive)
}

impl MessageSink for FitDive {
    fn accepts(&self, g: u16) -> bool {
        matches!(
            g,
            global::FILE_ID
                | global::SESSION
                | global::RECORD
                | global::EVENT
                | global::DEVICE_INFO
                | global::DIVE_GAS
                | global::DIVE_SUMMARY
                | global::TANK_UPDATE
        )
    }

    fn message(&mut self, m: Message) {
        match m.global {
            global::FILE_ID => self.add_file_id(&m),
            global::SESSION => self.add_session(&m),
            global::RECORD => self.add_record(&m),
            global::EVENT => self.add_event(&m),
            global::DEVICE_INFO => self.add_device_info(&m),
            global::DIVE_GAS => self.add_dive_gas(&m),
            global::DIVE_SUMMARY => self.add_dive_summary(&m),
            global::TANK_UPDATE => self.add_tank_update(&m),
            _ => {}
        }
    }
}

fn position(m: &Message, lat: u8, long: u8) -> Option<Position> {
    Some(Position {
        latitude: semicircles_to_degrees(m.i32(lat)?),
        longitude: semicircles_to_degrees(m.i32(long)?),
    })
}

impl FitDive {
    fn add_file_id(&mut self, m: &Message) {
        use field::file_id::*;

        self.file_id = FileId {
            manufacturer: m.u16(MANUFACTURER),
            product: m.u16(PRODUCT),
            serial_number: m.u32(SERIAL_NUMBER),
            time_created: m.u32(TIME_CREATED),
        };
    }

    fn add_session(&mut self, m: &Message) {
        use field::session::*;

        self.session = Some(Session {
            start_time: m.u32(START_TIME).or(m.timestamp),
            elapsed_s: m.f64(TOTAL_ELAPSED_TIME).map(|t| t / 1000.0),
            start_position: position(m, START_POSITION_LAT, START_POSITION_LONG),
        });
    }

    fn add_record(&mut self, m: &Message) {
        use field::record::*;

        // Records without a depth belong to the surface part of an activity.
        let Some(depth_mm) = m.f64(DEPTH) else {
            return;
        };

        let Some(timestamp) = m
            .timestamp
            .or_else(|| self.samples.last().map(|s| s.timestamp))
        else {
            debug!("skipping FIT record without a timestamp");
            return;
        };

        self.samples.push(Sample {
            timestamp,
            depth_m: depth_mm / 1000.0,
            temperature_c: m.f64(TEMPERATURE),
            position: position(m, POSITION_LAT, POSITION_LONG),
            next_stop_depth_m: m.f64(NEXT_STOP_DEPTH).map(|d| d / 1000.0),
            next_stop_time_s: m.u32(NEXT_STOP_TIME),
            time_to_surface_s: m.u32(TIME_TO_SURFACE),
            ndl_s: m.u32(NDL_TIME),
            cns_percent: m.u8(CNS_LOAD),
            ascent_rate_m_s: m.f64(ASCENT_RATE).map(|r| r / 1000.0),
            ppo2_bar: m.f64(PO2).map(|p| p / 100.0),
        });
    }

    fn add_event(&mut self, m: &Message) {
        use field::event::*;

        if let (Some(timestamp), Some(event)) = (m.timestamp, m.u8(EVENT)) {
            self.events.push(Event {
                timestamp,
                event,
                data: m.u32(DATA),
            });
        }
    }

    fn add_device_info(&mut self, m: &Message) {
        use field::device_info::*;

        if self.firmware.is_none() {
            self.firmware = m
                .f64(SOFTWARE_VERSION)
                .map(|v| format!("{:.2}", v / 100.0));
        }
    }

    fn add_dive_gas(&mut self, m: &Message) {
        use field::dive_gas::*;

        let index = m.u16(MESSAGE_INDEX_FIELD).unwrap_or(self.gases.len() as u16);
        let gas = Gas {
            oxygen_percent: m.u8(OXYGEN_CONTENT).unwrap_or(21),
            helium_percent: m.u8(HELIUM_CONTENT).unwrap_or(0),
            enabled: m.u8(STATUS).is_none_or(|s| s != GAS_DISABLED),
        };
        self.gases.insert(index, gas);
    }

    fn add_dive_summary(&mut self, m: &Message) {
        use field::dive_summary::*;

        let Some(max_depth) = m.f64(MAX_DEPTH) else {
            return;
        };

        let summary = DiveSummary {
            timestamp: m.timestamp,
            reference_mesg: m.u16(REFERENCE_MESG),
            max_depth_m: max_depth / 1000.0,
            avg_depth_m: m.f64(AVG_DEPTH).map(|d| d / 1000.0),
            surface_interval_s: m.u32(SURFACE_INTERVAL),
            dive_number: m.u32(DIVE_NUMBER),
            bottom_time_s: m.f64(BOTTOM_TIME).map(|t| t / 1000.0),
        };

        // Prefer the summary of the whole session over per-lap summaries.
        let keep_existing = self.summary.is_some_and(|s| {
            s.reference_mesg == Some(global::SESSION)
                && summary.reference_mesg != Some(global::SESSION)
        });
        if !keep_existing {
            self.summary = Some(summary);
        }
    }

    fn add_tank_update(&mut self, m: &Message) {
        use field::tank_update::*;

        if let (Some(timestamp), Some(sensor), Some(pressure)) =
            (m.timestamp, m.u32(SENSOR), m.f64(PRESSURE))
        {
            self.tank_updates.push(TankUpdate {
                timestamp,
                sensor,
                pressure_bar: pressure / 100.0,
            });
        }
    }

    /// Whether the activity holds any dive data.
    pub fn is_dive(&self) -> bool {
        !self.samples.is_empty() || self.summary.is_some()
    }

    /// Opaque device fingerprint: the file creation time, little-endian.
    pub fn fingerprint(&self) -> Option<Vec<u8>> {
        self.file_id.time_created.map(|t| t.to_le_bytes().to_vec())
    }

    fn start_timestamp(&self) -> Option<u32> {
        self.session
            .and_then(|s| s.start_time)
            .or_else(|| self.samples.first().map(|s| s.timestamp))
            .or(self.file_id.time_created)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_timestamp()
            .and_then(|ts| DateTime::from_timestamp(to_unix_time(ts), 0))
    }

    /// Convert to a normalized dive recorded by `model`.
    pub fn normalize(&self, id: impl Into<String>, model: &str) -> NormalizedDive {
        let first = self.samples.first().map(|s| s.timestamp);
        let offset = |ts: u32| first.map_or(0, |f| ts.saturating_sub(f));

        // Sensors are numbered in order of first appearance.
        let mut sensors: Vec<u32> = Vec::new();
        for update in &self.tank_updates {
            if !sensors.contains(&update.sensor) {
                sensors.push(update.sensor);
            }
        }
        let tank = |sensor: u32| sensors.iter().position(|&s| s == sensor).unwrap_or(0) as u8;

        let mut samples: Vec<DiveSample> = self
            .samples
            .iter()
            .map(|s| DiveSample {
                time_s: offset(s.timestamp),
                depth_mm: meters_to_mm(s.depth_m),
                temperature_mk: s.temperature_c.map(celsius_to_mk),
                pressures: Vec::new(),
                deco: deco(s),
            })
            .collect();

        for update in &self.tank_updates {
            let time_s = offset(update.timestamp);
            if let Some(sample) = samples.iter_mut().find(|s| s.time_s >= time_s) {
                sample.pressures.push(TankPressure {
                    tank: tank(update.sensor),
                    pressure_mbar: bar_to_mbar(update.pressure_bar),
                });
            }
        }

        let mut cylinders: Vec<Cylinder> = self
            .gases
            .values()
            .filter(|g| g.enabled)
            .map(|g| Cylinder {
                mix: GasMix::from_percent(g.oxygen_percent, g.helium_percent),
                ..Default::default()
            })
            .collect();
        for (i, sensor) in sensors.iter().enumerate() {
            let mut readings = self.tank_updates.iter().filter(|u| u.sensor == *sensor);
            if let Some(cylinder) = cylinders.get_mut(i) {
                let start = readings.next();
                let end = readings.last().or(start);
                cylinder.start_pressure_mbar = start.map(|u| bar_to_mbar(u.pressure_bar));
                cylinder.end_pressure_mbar = end.map(|u| bar_to_mbar(u.pressure_bar));
            }
        }

        let max_depth_mm = match self.summary {
            Some(s) => meters_to_mm(s.max_depth_m),
            None => samples.iter().map(|s| s.depth_mm).max().unwrap_or(0),
        };
        let mean_depth_mm = match self.summary.and_then(|s| s.avg_depth_m) {
            Some(d) => meters_to_mm(d),
            None if !samples.is_empty() => {
                let sum: u64 = samples.iter().map(|s| s.depth_mm as u64).sum();
                (sum / samples.len() as u64) as u32
            }
            None => 0,
        };

        let duration_s = self
            .session
            .and_then(|s| s.elapsed_s)
            .map(|t| t.round() as u32)
            .or_else(|| samples.last().map(|s| s.time_s))
            .or_else(|| {
                self.summary
                    .and_then(|s| s.bottom_time_s)
                    .map(|t| t.round() as u32)
            })
            .unwrap_or(0);

        let events = self
            .events
            .iter()
            .map(|e| DiveEvent {
                time_s: offset(e.timestamp),
                kind: match e.event {
                    event::DIVE_GAS_SWITCHED => DiveEventKind::GasSwitch,
                    event::DIVE_ALERT => DiveEventKind::Alert,
                    other => DiveEventKind::Other(other),
                },
                value: e.data.map(i64::from),
            })
            .collect();

        NormalizedDive {
            id: id.into(),
            number: self.summary.and_then(|s| s.dive_number),
            start_time: self.start_time(),
            duration_s,
            max_depth_mm,
            mean_depth_mm,
            surface_temperature_mk: samples.first().and_then(|s| s.temperature_mk),
            water_temperature_mk: samples.iter().filter_map(|s| s.temperature_mk).min(),
            location: self
                .session
                .and_then(|s| s.start_position)
                .or_else(|| self.samples.iter().find_map(|s| s.position)),
            cylinders,
            computers: vec![DiveComputer {
                model: model.to_string(),
                serial: self.file_id.serial_number,
                firmware: self.firmware.clone(),
                samples,
            }],
            events,
        }
    }
}

fn deco(s: &Sample) -> Option<Deco> {
    let deco = Deco {
        ndl_s: s.ndl_s,
        time_to_surface_s: s.time_to_surface_s,
        stop_depth_mm: s.next_stop_depth_m.map(meters_to_mm),
        stop_time_s: s.next_stop_time_s,
        cns_percent: s.cns_percent,
        in_deco: s.next_stop_depth_m.is_some_and(|d| d > 0.0),
    };
    (deco != Deco::default()).then_some(deco)
}

fn meters_to_mm(m: f64) -> u32 {
    (m * 1000.0).round().max(0.0) as u32
}

fn bar_to_mbar(bar: f64) -> u32 {
    (bar * 1000.0).round().max(0.0) as u32
}
