//! Integration tests for pweq-config.
//!
//! These tests exercise the on-disk layout end to end: rendering into the
//! drop-in directory, presets and session files living side by side.

use pweq_config::{
    ConfigLayout, GainTable, PresetStore, SessionStore, load_gains, parse_gains, render,
    write_config,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn dual_syntax_parse_agrees() {
    let bare = parse_gains("type = bq_peaking, freq = 1000, gain = 2.5");
    let quoted = parse_gains(r#""type": "bq_peaking", "freq": 1000, "gain": 2.5"#);
    let expected = GainTable::try_from_pairs([(1000, 2.5)]).unwrap();
    assert_eq!(bare, expected);
    assert_eq!(quoted, expected);
    assert_eq!(bare.len(), 1);
    assert_eq!(quoted.len(), 1);
}

#[test]
fn sparse_table_round_trips_through_render() {
    let gains = GainTable::try_from_pairs([(1000, 2.5)]).unwrap();
    let back = parse_gains(&render(&gains));

    assert_eq!(back.len(), 10);
    assert_eq!(back, gains);
}

#[test]
fn clamping_at_write_and_read() {
    let gains = GainTable::try_from_pairs([(31, 50.0), (63, -50.0)]).unwrap();
    let text = render(&gains);
    assert!(text.contains("gain = 12.0"));
    assert!(text.contains("gain = -12.0"));

    let parsed = parse_gains("type = bq_peaking, freq = 31, gain = 50\ntype = bq_peaking, freq = 63, gain = -50");
    assert_eq!(parsed.get(31), Some(12.0));
    assert_eq!(parsed.get(63), Some(-12.0));
}

#[test]
fn rendered_file_in_layout_reads_back() {
    let temp = TempDir::new().unwrap();
    let layout = ConfigLayout::new(temp.path());
    layout.ensure_dirs().unwrap();

    let gains = GainTable::try_from_pairs([(125, 3.5), (2000, -6.0)]).unwrap();
    write_config(layout.rendered_config_path(), &gains).unwrap();

    let loaded = load_gains(layout.rendered_config_path()).unwrap();
    assert_eq!(loaded.get(125), Some(3.5));
    assert_eq!(loaded.get(2000), Some(-6.0));
    assert_eq!(loaded.get(16000), Some(0.0));
}

#[test]
fn rewriting_same_table_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("99-pweq.conf");
    let gains = GainTable::try_from_pairs([(500, 1.0)]).unwrap();

    write_config(&path, &gains).unwrap();
    let first = fs::read(&path).unwrap();
    write_config(&path, &gains).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn rendered_config_can_be_saved_as_preset() {
    let temp = TempDir::new().unwrap();
    let layout = ConfigLayout::new(temp.path());
    layout.ensure_dirs().unwrap();
    let store = PresetStore::new(layout.presets_dir());

    let gains = GainTable::try_from_pairs([(4000, 4.5)]).unwrap();
    write_config(layout.rendered_config_path(), &gains).unwrap();

    // Copying the live file into the preset dir makes it a preset.
    fs::copy(
        layout.rendered_config_path(),
        layout.presets_dir().join("Live.conf"),
    )
    .unwrap();
    assert_eq!(store.list(), vec!["Live".to_string()]);
    assert_eq!(store.load("Live").unwrap().get(4000), Some(4.5));
}

#[test]
fn session_and_presets_coexist() {
    let temp = TempDir::new().unwrap();
    let layout = ConfigLayout::new(temp.path());
    let session = SessionStore::new(layout.session_path());
    let presets = PresetStore::new(layout.presets_dir());

    let a = GainTable::try_from_pairs([(31, 1.0)]).unwrap();
    let b = GainTable::try_from_pairs([(63, -1.0)]).unwrap();
    session.save(&a).unwrap();
    presets.save("b", &b).unwrap();

    assert_eq!(session.load().unwrap(), a);
    assert_eq!(presets.load("b").unwrap().get(63), Some(-1.0));
    assert!(!presets.list().iter().any(|n| n.contains("session")));
}
