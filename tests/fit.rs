mod common;

use common::{FitWriter, base, body, fit_dive, init_logging};
use divesync::{
    Decoder,
    descriptor::lookup,
    dive::{DiveEventKind, GasMix, TankPressure, celsius_to_mk},
    fit::{self, Error, FIT_EPOCH_OFFSET},
};

const T0: u32 = 1_000_000_000;

fn record_definition(w: &mut FitWriter) -> &mut FitWriter {
    w.define(0, 20, &[(253, 4, base::UINT32), (92, 4, base::UINT32)])
}

#[test]
fn single_record() {
    init_logging();

    let mut w = FitWriter::new();
    record_definition(&mut w).data(0, &body(&[&T0.to_le_bytes(), &12_345u32.to_le_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.crc_valid, Some(true));
    assert_eq!(dive.truncated, None);
    assert_eq!(dive.samples.len(), 1);

    let normalized = dive.normalize("a", "Garmin Descent Mk2");
    let samples = normalized.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].depth_mm, 12_345);
    assert_eq!(samples[0].time_s, 0);
    assert_eq!(normalized.max_depth_mm, 12_345);
    assert_eq!(
        normalized.start_time.map(|t| t.timestamp()),
        Some(T0 as i64 + FIT_EPOCH_OFFSET)
    );
}

#[test]
fn big_endian_records() {
    let mut w = FitWriter::new();
    w.define_big_endian(0, 20, &[(253, 4, base::UINT32), (92, 4, base::UINT32)])
        .data(0, &body(&[&T0.to_be_bytes(), &3_000u32.to_be_bytes()]))
        .data(0, &body(&[&(T0 + 4).to_be_bytes(), &4_500u32.to_be_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap().normalize("a", "m");
    let samples = dive.samples();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].time_s, 4);
    assert_eq!(samples[1].depth_mm, 4_500);
}

#[test]
fn compressed_timestamps() {
    let mut w = FitWriter::new();
    record_definition(&mut w)
        .define(1, 20, &[(92, 4, base::UINT32)])
        // T0 ends in 0b00000; offsets count up from there.
        .data(0, &body(&[&T0.to_le_bytes(), &1_000u32.to_le_bytes()]))
        .compressed(1, 10, &2_000u32.to_le_bytes())
        // Rolled over: 3 is below 10.
        .compressed(1, 3, &3_000u32.to_le_bytes());

    let dive = fit::dive::decode(&w.finish()).unwrap().normalize("a", "m");
    let times: Vec<u32> = dive.samples().iter().map(|s| s.time_s).collect();
    assert_eq!(T0 & 0x1F, 0);
    assert_eq!(times, [0, 10, 35]);
}

#[test]
fn compressed_timestamp_past_the_range_is_dropped() {
    let last = 0xFFFF_FFFEu32;
    let mut w = FitWriter::new();
    record_definition(&mut w)
        .define(1, 20, &[(92, 4, base::UINT32)])
        .data(0, &body(&[&last.to_le_bytes(), &1_000u32.to_le_bytes()]))
        // Offset 0 is below 0x1E, so it would roll past u32::MAX.
        .compressed(1, 0, &2_000u32.to_le_bytes());

    let descriptor = lookup("Garmin", "Descent Mk2").unwrap();
    let out = Decoder::Fit.decode(descriptor, &w.finish(), true).unwrap();
    let depths: Vec<u32> = out.dives[0].samples().iter().map(|s| s.depth_mm).collect();
    assert_eq!(depths, [1_000, 2_000]);
    assert_eq!(fit::header::resolve_time_offset(last, 0), None);
    assert_eq!(fit::header::resolve_time_offset(last, 0x1F), Some(u32::MAX));
}

#[test]
fn record_details() {
    let mut w = FitWriter::new();
    w.define(
        0,
        20,
        &[
            (253, 4, base::UINT32),
            (92, 4, base::UINT32),
            (13, 1, base::SINT8),
            (93, 4, base::UINT32),
            (94, 4, base::UINT32),
            (96, 4, base::UINT32),
            (97, 1, base::UINT8),
        ],
    )
    .data(
        0,
        &body(&[
            &T0.to_le_bytes(),
            &30_000u32.to_le_bytes(),
            &[18],
            &6_000u32.to_le_bytes(),
            &120u32.to_le_bytes(),
            &0u32.to_le_bytes(),
            &[12],
        ]),
    );

    let dive = fit::dive::decode(&w.finish()).unwrap().normalize("a", "m");
    let sample = &dive.samples()[0];
    assert_eq!(sample.temperature_mk, Some(celsius_to_mk(18.0)));
    assert_eq!(dive.water_temperature_mk, Some(291_150));

    let deco = sample.deco.unwrap();
    assert!(deco.in_deco);
    assert_eq!(deco.stop_depth_mm, Some(6_000));
    assert_eq!(deco.stop_time_s, Some(120));
    assert_eq!(deco.ndl_s, Some(0));
    assert_eq!(deco.cns_percent, Some(12));
}

#[test]
fn invalid_field_values_are_absent() {
    let mut w = FitWriter::new();
    w.define(
        0,
        20,
        &[(253, 4, base::UINT32), (92, 4, base::UINT32), (13, 1, base::SINT8)],
    )
    .data(0, &body(&[&T0.to_le_bytes(), &7_000u32.to_le_bytes(), &[0x7F]]))
    // No depth: a surface record.
    .data(0, &body(&[&(T0 + 1).to_le_bytes(), &u32::MAX.to_le_bytes(), &[20]]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.samples.len(), 1);
    assert_eq!(dive.samples[0].temperature_c, None);
}

#[test]
fn gas_mixes() {
    let mut w = FitWriter::new();
    let gas = [
        (254, 2, base::UINT16),
        (0, 1, base::UINT8),
        (1, 1, base::UINT8),
        (2, 1, base::ENUM),
    ];
    record_definition(&mut w)
        .data(0, &body(&[&T0.to_le_bytes(), &1_000u32.to_le_bytes()]))
        .define(1, 259, &gas)
        .data(1, &body(&[&0u16.to_le_bytes(), &[0, 32, 1]]))
        .data(1, &body(&[&1u16.to_le_bytes(), &[35, 21, 1]]))
        .data(1, &body(&[&2u16.to_le_bytes(), &[0, 100, 0]]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.gases.len(), 3);
    assert_eq!(dive.gases[&0].nitrogen_percent(), 68);
    assert_eq!(dive.gases[&1].nitrogen_percent(), 44);
    assert!(!dive.gases[&2].enabled);

    let cylinders = dive.normalize("a", "m").cylinders;
    assert_eq!(cylinders.len(), 2);
    assert_eq!(
        cylinders[0].mix,
        GasMix {
            o2_permille: 320,
            he_permille: 0,
            n2_permille: 680,
        }
    );
    assert_eq!(cylinders[1].mix, GasMix::from_percent(21, 35));
}

#[test]
fn summary_overrides_sample_maximum() {
    let dive = fit::dive::decode(&fit_dive(T0, &[0, 8_000, 21_500, 0])).unwrap();
    let summary = dive.summary.unwrap();
    assert_eq!(summary.max_depth_m, 21.5);
    assert_eq!(summary.dive_number, Some(7));

    let normalized = dive.normalize("a", "m");
    assert_eq!(normalized.max_depth_mm, 21_500);
    assert_eq!(normalized.number, Some(7));
    assert_eq!(normalized.duration_s, 3);
    assert_eq!(normalized.mean_depth_mm, 7_375);
}

#[test]
fn session_summary_is_preferred() {
    let mut w = FitWriter::new();
    let summary = [(0, 2, base::UINT16), (3, 4, base::UINT32)];
    record_definition(&mut w)
        .data(0, &body(&[&T0.to_le_bytes(), &1_000u32.to_le_bytes()]))
        .define(1, 268, &summary)
        .data(1, &body(&[&18u16.to_le_bytes(), &30_000u32.to_le_bytes()]))
        .data(1, &body(&[&19u16.to_le_bytes(), &12_000u32.to_le_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.summary.unwrap().max_depth_m, 30.0);
}

#[test]
fn tank_updates_join_samples() {
    let mut w = FitWriter::new();
    record_definition(&mut w);
    for i in 0..4 {
        w.data(0, &body(&[&(T0 + 10 * i).to_le_bytes(), &5_000u32.to_le_bytes()]));
    }
    w.define(1, 259, &[(0, 1, base::UINT8), (1, 1, base::UINT8)])
        .data(1, &[0, 21])
        .define(
            2,
            319,
            &[(253, 4, base::UINT32), (0, 4, base::UINT32Z), (1, 2, base::UINT16)],
        )
        .data(2, &body(&[&(T0 + 5).to_le_bytes(), &77u32.to_le_bytes(), &20_000u16.to_le_bytes()]))
        .data(2, &body(&[&(T0 + 30).to_le_bytes(), &77u32.to_le_bytes(), &15_000u16.to_le_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap().normalize("a", "m");
    let samples = dive.samples();
    assert!(samples[0].pressures.is_empty());
    assert_eq!(
        samples[1].pressures,
        [TankPressure {
            tank: 0,
            pressure_mbar: 200_000,
        }]
    );
    assert_eq!(samples[3].pressures[0].pressure_mbar, 150_000);

    assert_eq!(dive.cylinders[0].start_pressure_mbar, Some(200_000));
    assert_eq!(dive.cylinders[0].end_pressure_mbar, Some(150_000));
}

#[test]
fn events() {
    let mut w = FitWriter::new();
    record_definition(&mut w)
        .data(0, &body(&[&T0.to_le_bytes(), &1_000u32.to_le_bytes()]))
        .define(
            1,
            21,
            &[(253, 4, base::UINT32), (0, 1, base::ENUM), (3, 4, base::UINT32)],
        )
        .data(1, &body(&[&(T0 + 60).to_le_bytes(), &[57], &1u32.to_le_bytes()]))
        .data(1, &body(&[&(T0 + 90).to_le_bytes(), &[56], &u32::MAX.to_le_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap().normalize("a", "m");
    assert_eq!(dive.events.len(), 2);
    assert_eq!(dive.events[0].kind, DiveEventKind::GasSwitch);
    assert_eq!(dive.events[0].time_s, 60);
    assert_eq!(dive.events[0].value, Some(1));
    assert_eq!(dive.events[1].kind, DiveEventKind::Alert);
    assert_eq!(dive.events[1].value, None);
}

#[test]
fn unknown_messages_are_skipped() {
    let mut w = FitWriter::new();
    w.define(3, 65_280, &[(0, 3, base::STRING), (1, 4, base::SINT32)])
        .data(3, b"abc\x01\x00\x00\x00");
    record_definition(&mut w).data(0, &body(&[&T0.to_le_bytes(), &2_000u32.to_le_bytes()]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.truncated, None);
    assert_eq!(dive.samples.len(), 1);
}

#[test]
fn developer_fields_are_skipped() {
    let mut w = FitWriter::new();
    w.define_developer(0, 20, &[(253, 4, base::UINT32), (92, 4, base::UINT32)], &[2, 3])
        .data(0, &body(&[&T0.to_le_bytes(), &2_000u32.to_le_bytes(), &[9; 5]]))
        .data(0, &body(&[&(T0 + 1).to_le_bytes(), &2_500u32.to_le_bytes(), &[9; 5]]));

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.truncated, None);
    assert_eq!(dive.samples.len(), 2);
    assert_eq!(dive.samples[1].depth_m, 2.5);
}

#[test]
fn undefined_local_message_truncates() {
    let mut w = FitWriter::new();
    record_definition(&mut w)
        .data(0, &body(&[&T0.to_le_bytes(), &2_000u32.to_le_bytes()]))
        .data(5, &[0; 8]);

    let dive = fit::dive::decode(&w.finish()).unwrap();
    assert_eq!(dive.truncated, Some(Error::UndefinedLocalMessage(5)));
    assert_eq!(dive.samples.len(), 1);
}

#[test]
fn truncated_document_keeps_earlier_samples() {
    let r = fit_dive(T0, &[1_000, 2_000, 3_000]);
    let cut = &r[..r.len() - 12];

    let dive = fit::dive::decode(cut).unwrap();
    assert!(matches!(dive.truncated, Some(Error::EndOfSlice(_))));
    assert_eq!(dive.crc_valid, None);
    assert!(!dive.samples.is_empty());
}

#[test]
fn invalid_headers() {
    let mut r = fit_dive(T0, &[1_000]);
    r[8..12].copy_from_slice(b".FXT");
    assert_eq!(fit::dive::decode(&r), Err(Error::NotFitData));

    let mut r = fit_dive(T0, &[1_000]);
    r[0] = 13;
    assert_eq!(fit::dive::decode(&r), Err(Error::UnknownHeaderLength(13)));
}

#[test]
fn decoding_is_idempotent() {
    let r = fit_dive(T0, &[0, 5_000, 10_000, 5_000, 0]);
    let a = fit::dive::decode(&r).unwrap().normalize("a", "m");
    let b = fit::dive::decode(&r).unwrap().normalize("a", "m");
    assert_eq!(a, b);
}

#[test]
fn decoder_output() {
    let descriptor = lookup("Garmin", "Descent Mk2").unwrap();
    let r = fit_dive(T0, &[0, 5_000, 0]);

    let out = Decoder::Fit.decode(descriptor, &r, true).unwrap();
    assert_eq!(out.dives.len(), 1);
    assert_eq!(out.fingerprint, Some(T0.to_le_bytes().to_vec()));
    assert_eq!(out.serial, Some(1234));
    assert!(out.warnings.is_empty());

    let dive = &out.dives[0];
    assert_eq!(dive.id.len(), 8);
    assert_eq!(dive.computers[0].model, "Garmin Descent Mk2");
    assert_eq!(dive.computers[0].serial, Some(1234));
}

#[test]
fn checksum_mismatch_is_a_warning() {
    let descriptor = lookup("Garmin", "Descent Mk1").unwrap();
    let mut r = fit_dive(T0, &[0, 5_000, 0]);
    let last = r.len() - 1;
    r[last] ^= 0xFF;

    let out = Decoder::Fit.decode(descriptor, &r, true).unwrap();
    assert_eq!(out.dives.len(), 1);
    assert_eq!(out.warnings.len(), 1);

    let out = Decoder::Fit.decode(descriptor, &r, false).unwrap();
    assert!(out.warnings.is_empty());
}

#[test]
fn activity_without_dive_data() {
    let descriptor = lookup("Garmin", "Descent G1").unwrap();
    let mut w = FitWriter::new();
    w.define(0, 0, &[(4, 4, base::UINT32)]).data(0, &T0.to_le_bytes());

    let out = Decoder::Fit.decode(descriptor, &w.finish(), true).unwrap();
    assert!(out.dives.is_empty());
    assert_eq!(out.fingerprint, Some(T0.to_le_bytes().to_vec()));
}
