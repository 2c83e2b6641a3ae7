//! Content loading, snapshot persistence and replay files.

use std::path::PathBuf;

use tactics_core::affinity::Element;
use tactics_core::combat::BattleConfig;
use tactics_core::replay::BattleReplay;
use tactics_core::run::Run;
use tactics_headless::autopilot::{new_run, play, AutopilotConfig, PickPolicy};
use tactics_headless::batch::{run_batch, BatchConfig, BatchResults};
use tactics_headless::data_loader::{
    load_catalog, load_snapshot, save_snapshot, GameData, LoadError, OPPONENTS_FILE,
};
use tactics_test_utils::fixtures;

fn shipped_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

#[test]
fn shipped_data_files_load() {
    let data = GameData::load_dir(shipped_data_dir()).unwrap();
    assert_eq!(data.catalog.len(), 9);
    assert_eq!(data.loot.items().len(), 10);
    assert_eq!(data.recruits.len(), 3);

    let zealots = data.catalog.get("dawn_zealots").unwrap();
    assert_eq!(zealots.units[0].abilities.len(), 2);
    assert!(zealots.units[0].abilities[1].buff.is_some());
    assert_eq!(data.recruits[2].abilities[0].id, "soothing_tide");
}

#[test]
fn sample_catalog_loads_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(OPPONENTS_FILE), fixtures::SAMPLE_CATALOG_RON).unwrap();

    let data = GameData::load_dir(dir.path()).unwrap();
    assert_eq!(data.catalog, fixtures::sample_catalog());
    // Files that are absent fall back to builtin content.
    assert_eq!(data.recruits, GameData::builtin().recruits);
}

#[test]
fn malformed_catalog_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "[ (id: \"oops\", ").unwrap();
    assert!(matches!(load_catalog(&path), Err(LoadError::Invalid(_))));
}

#[test]
fn undersized_catalog_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.ron");
    let text = r#"[
        (id: "a", name: "A", difficulty: Standard, primary_tag: "a",
         units: [(id: "u", name: "U", element: Fire, role: Tank,
                  stats: (hp: 10, atk: 1, def: 1, speed: 1))]),
    ]"#;
    std::fs::write(&path, text).unwrap();
    let err = load_catalog(&path).unwrap_err();
    assert!(err.to_string().contains("at least 3"));
}

#[test]
fn snapshot_file_resumes_identically() {
    let data = GameData::builtin();
    let config = AutopilotConfig::default().with_battles(2).with_pick(PickPolicy::Easiest);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs/run.ron");

    let mut original = new_run(314, &data.recruits, Some(Element::Water));
    play(&mut original, &data, &config).unwrap();
    save_snapshot(&path, &original.snapshot()).unwrap();
    let tail = play(&mut original, &data, &config).unwrap();

    let mut resumed = Run::resume(load_snapshot(&path).unwrap()).unwrap();
    assert_eq!(resumed.battle_index(), 2);
    assert_eq!(play(&mut resumed, &data, &config).unwrap().battles, tail.battles);
    assert_eq!(resumed.snapshot(), original.snapshot());
}

#[test]
fn replay_file_round_trips_and_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("battle.replay");
    let spec = fixtures::weak_opponent();

    let (replay, outcome) = BattleReplay::record(
        21,
        0,
        fixtures::WEAK_OPPONENT_ID,
        fixtures::sample_player_roster(),
        spec.enemy_roster(0),
        BattleConfig::default(),
    );
    replay.save(&path).unwrap();

    let loaded = BattleReplay::load(&path).unwrap();
    assert_eq!(loaded, replay);
    assert!(loaded.verify());
    assert_eq!(loaded.resolve(), outcome);
}

#[test]
fn batch_results_survive_json() {
    let data = GameData::builtin();
    let config = BatchConfig {
        seed_start: 5,
        run_count: 3,
        autopilot: AutopilotConfig::default().with_battles(2),
        ..BatchConfig::default()
    };
    let results = run_batch(config, &data);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/batch.json");
    results.save(&path).unwrap();
    let loaded = BatchResults::load(&path).unwrap();
    assert_eq!(loaded.runs, results.runs);
    assert_eq!(loaded.summary.battles, 6);
}

#[test]
fn batch_is_independent_of_thread_count() {
    let data = GameData::load_dir(shipped_data_dir()).unwrap();
    let config = |parallel_runs| BatchConfig {
        seed_start: 100,
        run_count: 6,
        parallel_runs,
        alignment: Some(Element::Fire),
        autopilot: AutopilotConfig::default().with_battles(3),
        verify_determinism: false,
    };
    let single = run_batch(config(1), &data);
    let many = run_batch(config(4), &data);
    assert_eq!(single.runs, many.runs);
}
