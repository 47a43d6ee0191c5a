//! Sample accumulation over data entries (the second pass).

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};

use crate::dive::{
    Cylinder, DiveComputer, DiveSample, GasMix, NormalizedDive, TankPressure, ZERO_CELSIUS_MK,
};

use super::{
    Error,
    schema::{GroupLayout, Role, Schema},
    walk::{Entry, entries},
};

/// Depth reading meaning "no reading".
pub const DEPTH_NONE: i64 = 0xFFFF;
/// Pressure reading meaning "no reading".
pub const PRESSURE_NONE: i64 = 0xFFFF;
/// Temperature reading meaning "no reading".
pub const TEMPERATURE_NONE: i64 = -3000;

/// Samples and header values accumulated from one SBEM file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SbemDive {
    pub start_time: Option<DateTime<Utc>>,
    /// Sum of all sample time deltas.
    pub elapsed_ms: u64,
    pub max_depth_cm: u32,
    pub min_temperature_dc: Option<i64>,
    pub samples: Vec<DiveSample>,
    /// Readings of the pressure group, in stream order. Sentinel readings
    /// keep their slot as `None`.
    pub pressures: Vec<Option<TankPressure>>,
    pub gases: Vec<GasMix>,
    depth_sum_mm: u64,
    depth_count: u64,
}

/// Decode an SBEM file.
///
/// Fails if the signature is missing or no group carries time and depth.
pub fn decode(r: &[u8]) -> Result<SbemDive, Error> {
    let walk = entries(r)?;
    let schema = Schema::build(walk.clone());

    let groups = schema.groups();
    let samples = groups
        .iter()
        .find(|g| g.has(Role::TimeDelta) && g.has(Role::Depth))
        .ok_or(Error::NoSampleGroup)?;
    let pressures = groups
        .iter()
        .find(|g| g.id != samples.id && g.has(Role::Pressure));

    let date_times: Vec<u16> = schema.scalars(Role::DateTime).map(|t| t.id).collect();
    let oxygen: Vec<u16> = schema.scalars(Role::Oxygen).map(|t| t.id).collect();
    let helium: Vec<u16> = schema.scalars(Role::Helium).map(|t| t.id).collect();

    let mut dive = SbemDive::default();

    for entry in walk {
        let (id, payload) = match entry {
            Ok(Entry::Data { id, payload }) => (id as u16, payload),
            Ok(Entry::Descriptor { .. }) => continue,
            Err(err) => {
                debug!("SBEM data pass stopped: {err}");
                break;
            }
        };

        if id == samples.id {
            dive.add_sample(samples, payload);
        } else if let Some(group) = pressures.filter(|g| g.id == id) {
            dive.pressures.push(pressure(group, payload));
        } else if date_times.contains(&id) {
            dive.start_time = parse_date_time(payload);
        } else if oxygen.contains(&id) {
            let o2 = payload.first().copied().unwrap_or(21);
            dive.gases.push(GasMix::from_percent(o2, 0));
        } else if helium.contains(&id) {
            let he = payload.first().copied().unwrap_or(0);
            if let Some(last) = dive.gases.last_mut() {
                let o2 = (last.o2_permille / 10) as u8;
                *last = GasMix::from_percent(o2, he);
            }
        }
    }

    dive.merge_pressures();
    Ok(dive)
}

/// Decode an SBEM file, degrading to a placeholder dive on failure.
///
/// A corrupt file yields a dive with no samples and zero duration, along
/// with the reason, so that one bad file cannot abort a batch.
pub fn decode_or_placeholder(
    r: &[u8],
    id: impl Into<String>,
    model: &str,
) -> (NormalizedDive, Option<Error>) {
    let id = id.into();
    match decode(r) {
        Ok(dive) => (dive.normalize(id, model), None),
        Err(err) => {
            warn!("SBEM decode of {id} degraded to a placeholder: {err}");
            let mut placeholder = NormalizedDive::placeholder(id);
            placeholder.computers[0].model = model.to_string();
            (placeholder, Some(err))
        }
    }
}

fn pressure(group: &GroupLayout, payload: &[u8]) -> Option<TankPressure> {
    let centibar = group
        .member(Role::Pressure)?
        .read(payload)
        .filter(|&p| p != PRESSURE_NONE)?;
    let tank = group
        .member(Role::GasNumber)
        .and_then(|m| m.read(payload))
        .unwrap_or(0);

    Some(TankPressure {
        tank: tank.clamp(0, u8::MAX as i64) as u8,
        pressure_mbar: tenfold(centibar)?,
    })
}

/// Scale a centi-unit reading to milli-units. Readings that are negative or
/// too large for the result count as missing.
fn tenfold(centi: i64) -> Option<u32> {
    u32::try_from(centi.checked_mul(10)?).ok()
}

fn parse_date_time(payload: &[u8]) -> Option<DateTime<Utc>> {
    let text = std::str::from_utf8(payload).ok()?.trim_end_matches('\0');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

impl SbemDive {
    fn add_sample(&mut self, group: &GroupLayout, payload: &[u8]) {
        let read = |role| group.member(role).and_then(|m| m.read(payload));

        let delta = read(Role::TimeDelta).unwrap_or(0).max(0) as u64;
        self.elapsed_ms += delta;

        let depth_mm = read(Role::Depth)
            .filter(|&d| d != DEPTH_NONE)
            .and_then(tenfold);
        let depth_mm = match depth_mm {
            Some(mm) => {
                self.max_depth_cm = self.max_depth_cm.max(mm / 10);
                self.depth_sum_mm += mm as u64;
                self.depth_count += 1;
                mm
            }
            // Hold the previous depth across a missing reading.
            None => self.samples.last().map_or(0, |s| s.depth_mm),
        };

        let temperature = read(Role::Temperature).filter(|&t| t != TEMPERATURE_NONE);
        if let Some(t) = temperature {
            self.min_temperature_dc = Some(self.min_temperature_dc.map_or(t, |m| m.min(t)));
        }

        let mut sample = DiveSample {
            time_s: (self.elapsed_ms / 1000) as u32,
            depth_mm,
            temperature_mk: temperature.map(deci_celsius_to_mk),
            ..Default::default()
        };
        if group.has(Role::Pressure) {
            sample.pressures.extend(pressure(group, payload));
        }

        self.samples.push(sample);
    }

    /// Attach pressure readings to samples index for index.
    ///
    /// The sample and pressure groups are written at a 1:1 rate, so the i-th
    /// reading belongs to the i-th sample. This does not hold if a device
    /// writes the two groups at different rates: surplus readings are
    /// dropped, and samples past the last reading have no pressure.
    fn merge_pressures(&mut self) {
        if self.pressures.len() > self.samples.len() {
            debug!(
                "dropping {} SBEM pressure readings without a matching sample",
                self.pressures.len() - self.samples.len()
            );
        }

        for (sample, reading) in self.samples.iter_mut().zip(&self.pressures) {
            sample.pressures.extend(*reading);
        }
    }

    pub fn duration_s(&self) -> u32 {
        (self.elapsed_ms / 1000) as u32
    }

    pub fn normalize(&self, id: impl Into<String>, model: &str) -> NormalizedDive {
        let mut cylinders: Vec<Cylinder> = self
            .gases
            .iter()
            .map(|&mix| Cylinder {
                mix,
                ..Default::default()
            })
            .collect();

        for (tank, cylinder) in cylinders.iter_mut().enumerate() {
            let mut readings = self
                .samples
                .iter()
                .flat_map(|s| &s.pressures)
                .filter(|p| p.tank as usize == tank);
            let start = readings.next();
            let end = readings.last().or(start);
            cylinder.start_pressure_mbar = start.map(|p| p.pressure_mbar);
            cylinder.end_pressure_mbar = end.map(|p| p.pressure_mbar);
        }

        NormalizedDive {
            id: id.into(),
            number: None,
            start_time: self.start_time,
            duration_s: self.duration_s(),
            max_depth_mm: self.max_depth_cm.saturating_mul(10),
            mean_depth_mm: self
                .depth_sum_mm
                .checked_div(self.depth_count)
                .unwrap_or(0) as u32,
            surface_temperature_mk: self.samples.iter().find_map(|s| s.temperature_mk),
            water_temperature_mk: self.min_temperature_dc.map(deci_celsius_to_mk),
            location: None,
            cylinders,
            computers: vec![DiveComputer {
                model: model.to_string(),
                serial: None,
                firmware: None,
                samples: self.samples.clone(),
            }],
            events: Vec::new(),
        }
    }
}

fn deci_celsius_to_mk(dc: i64) -> u32 {
    (dc * 100 + ZERO_CELSIUS_MK).max(0) as u32
}
