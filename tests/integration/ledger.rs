//! Integration tests for ledger persistence.

use std::path::{Path, PathBuf};

use tapbot::error::TapError;
use tapbot::ledger::{JsonStore, Ledger};

fn setup(dir: &Path) -> (PathBuf, PathBuf) {
    let packages = dir.join("packages.txt");
    std::fs::write(&packages, "com.zhiliaoapp.musically\n\n  com.ss.android.ugc.trill  \n").unwrap();
    (dir.join("device_data.json"), packages)
}

#[test]
fn test_set_user_survives_reload_without_touching_other_cells() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());

    let mut ledger = Ledger::open(&store, &packages).unwrap();
    ledger
        .refresh(&["dev1".to_string(), "dev2".to_string()])
        .unwrap();
    ledger.set_user("dev1", "com.zhiliaoapp.musically", "alice").unwrap();
    ledger.set_user("dev2", "com.ss.android.ugc.trill", "bob").unwrap();
    ledger.set_user("dev1", "com.zhiliaoapp.musically", " carol ").unwrap();

    let reloaded = Ledger::open(&store, &packages).unwrap();
    let dev1 = reloaded.record("dev1").unwrap();
    let dev2 = reloaded.record("dev2").unwrap();
    assert_eq!(dev1.user("com.zhiliaoapp.musically"), "carol");
    assert_eq!(dev1.user("com.ss.android.ugc.trill"), "");
    assert_eq!(dev2.user("com.zhiliaoapp.musically"), "");
    assert_eq!(dev2.user("com.ss.android.ugc.trill"), "bob");
    assert_eq!(dev2.device_name, "dev2");
}

#[test]
fn test_packages_file_is_trimmed_and_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());
    let ledger = Ledger::open(&store, &packages).unwrap();
    assert_eq!(
        ledger.packages(),
        ["com.zhiliaoapp.musically", "com.ss.android.ugc.trill"]
    );
    assert!(ledger.records().is_empty());
}

#[test]
fn test_missing_packages_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Ledger::open(&dir.path().join("db.json"), &dir.path().join("nope.txt"));
    assert!(matches!(result, Err(TapError::PackagesNotFound { .. })));
}

#[test]
fn test_corrupt_store_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());
    std::fs::write(&store, "{ not json").unwrap();
    assert!(matches!(
        Ledger::open(&store, &packages),
        Err(TapError::StoreCorrupt { .. })
    ));
}

#[test]
fn test_refresh_is_idempotent_and_keeps_usernames() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());

    let mut ledger = Ledger::open(&store, &packages).unwrap();
    ledger.refresh(&["dev1".to_string()]).unwrap();
    ledger.set_user("dev1", "com.zhiliaoapp.musically", "alice").unwrap();
    ledger.set_device_name("dev1", "Phone A").unwrap();

    let mut again = Ledger::open(&store, &packages).unwrap();
    let summary = again.refresh(&["dev1".to_string()]).unwrap();
    assert!(summary.added.is_empty());
    assert!(summary.stale.is_empty());

    let record = again.record("dev1").unwrap();
    assert_eq!(record.device_name, "Phone A");
    assert_eq!(record.user("com.zhiliaoapp.musically"), "alice");
    assert_eq!(again.records().len(), 1);
}

#[test]
fn test_refresh_adds_cells_for_new_packages() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());

    let mut ledger = Ledger::open(&store, &packages).unwrap();
    ledger.refresh(&["dev1".to_string()]).unwrap();

    std::fs::write(&packages, "com.zhiliaoapp.musically\ncom.new.app\n").unwrap();
    let mut ledger = Ledger::open(&store, &packages).unwrap();
    ledger.refresh(&["dev1".to_string()]).unwrap();

    let stored = JsonStore::new(&store).load().unwrap();
    assert!(stored[0].packages.contains_key("com.new.app"));
    // Cells of packages dropped from the list are not removed.
    assert!(stored[0].packages.contains_key("com.ss.android.ugc.trill"));

    let rows = ledger.rows("dev1").unwrap();
    let listed: Vec<_> = rows.iter().map(|r| r.package.as_str()).collect();
    assert_eq!(listed, ["com.zhiliaoapp.musically", "com.new.app"]);
}

#[test]
fn test_store_is_plain_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let (store, packages) = setup(dir.path());

    let mut ledger = Ledger::open(&store, &packages).unwrap();
    ledger.refresh(&["dev1".to_string()]).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["device_id"], "dev1");
    assert_eq!(records[0]["device_name"], "dev1");
    assert_eq!(records[0]["packages"]["com.zhiliaoapp.musically"], "");
    assert!(!store.with_extension("json.tmp").exists());
}
