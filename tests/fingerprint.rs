use chrono::{TimeZone, Utc};
use divesync::{
    descriptor::lookup,
    fingerprint::{Fingerprint, FingerprintKey, FingerprintManager, compare_fingerprints},
    store::{FingerprintStore, MemoryFingerprintStore},
};

#[cfg(feature = "json-store")]
use {
    divesync::store::{JsonFingerprintStore, StoreError},
    std::{fs, path::PathBuf},
    uuid::Uuid,
};

#[cfg(feature = "json-store")]
fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("divesync-{}.json", Uuid::new_v4()))
}

#[test]
fn comparison() {
    let a = [0x10, 0x20, 0x30, 0x40];
    assert!(compare_fingerprints(&a, &a));
    assert!(compare_fingerprints(&[], &[]));
    assert!(!compare_fingerprints(&a, &[0x10, 0x20, 0x30, 0x41]));
    assert!(!compare_fingerprints(&a, &a[..3]));
    assert!(!compare_fingerprints(&a, &[0x10, 0x20, 0x30, 0x40, 0x00]));
}

#[test]
fn serials_must_match() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let a = Fingerprint {
        data: vec![1, 2, 3],
        serial: 100,
        device_time: 0,
        captured_at: at,
    };
    let mut b = a.clone();
    assert!(a.matches(&b));
    b.serial = 101;
    assert!(!a.matches(&b));
}

fn exercise<S: FingerprintStore>(store: S) -> S {
    let mk2 = lookup("Garmin", "Descent Mk2").unwrap();
    let core = lookup("Suunto", "EON Core").unwrap();
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let mut fingerprints = FingerprintManager::new(store);
    assert_eq!(fingerprints.get_fingerprint(mk2, 1).unwrap(), None);

    let saved = fingerprints
        .save_fingerprint_at(mk2, 1, &[1, 2, 3, 4], 99, at)
        .unwrap();
    fingerprints.save_fingerprint_at(mk2, 2, &[5], 0, at).unwrap();
    fingerprints.save_fingerprint_at(core, 1, &[6], 0, at).unwrap();

    assert_eq!(fingerprints.get_fingerprint(mk2, 1).unwrap(), Some(saved));
    assert_eq!(fingerprints.list().unwrap().len(), 3);

    // Saving again replaces the entry.
    fingerprints
        .save_fingerprint_at(mk2, 1, &[9, 9], 100, at)
        .unwrap();
    let stored = fingerprints.get_fingerprint(mk2, 1).unwrap().unwrap();
    assert_eq!(stored.data, [9, 9]);
    assert_eq!(stored.device_time, 100);
    assert_eq!(fingerprints.list().unwrap().len(), 3);

    assert!(fingerprints.remove_fingerprint(mk2, 2).unwrap());
    assert!(!fingerprints.remove_fingerprint(mk2, 2).unwrap());
    assert_eq!(fingerprints.get_fingerprint(mk2, 2).unwrap(), None);

    let keys: Vec<FingerprintKey> = fingerprints.list().unwrap().into_iter().map(|(k, _)| k).collect();
    assert!(keys.contains(&FingerprintKey::new(core, 1)));

    fingerprints.clear().unwrap();
    assert!(fingerprints.list().unwrap().is_empty());

    fingerprints.into_store()
}

#[test]
fn memory_store() {
    exercise(MemoryFingerprintStore::new());
}

#[cfg(feature = "json-store")]
#[test]
fn json_store() {
    let path = temp_path();
    exercise(JsonFingerprintStore::new(&path));
    fs::remove_file(&path).unwrap();
}

#[cfg(feature = "json-store")]
#[test]
fn json_store_persists_across_instances() {
    let path = temp_path();
    let d5 = lookup("Suunto", "D5").unwrap();

    let mut fingerprints = FingerprintManager::new(JsonFingerprintStore::new(&path));
    fingerprints.save_fingerprint(d5, 7, &[1, 2], 0).unwrap();

    let reopened = FingerprintManager::new(JsonFingerprintStore::new(&path));
    let stored = reopened.get_fingerprint(d5, 7).unwrap().unwrap();
    assert_eq!(stored.data, [1, 2]);
    assert_eq!(stored.serial, 7);

    fs::remove_file(&path).unwrap();
}

#[cfg(feature = "json-store")]
#[test]
fn json_store_rejects_corrupt_documents() {
    let path = temp_path();
    fs::write(&path, b"{ not json").unwrap();

    let fingerprints = FingerprintManager::new(JsonFingerprintStore::new(&path));
    let d5 = lookup("Suunto", "D5").unwrap();
    assert!(matches!(
        fingerprints.get_fingerprint(d5, 0),
        Err(StoreError::Json(_))
    ));

    fs::remove_file(&path).unwrap();
}
