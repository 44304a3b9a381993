use curate_core::catalog::StationCatalog;
use curate_core::error::CurateError;
use curate_core::preview::{PlaybackState, PreviewCommand};
use curate_core::seed::PersistedSelectionSeed;
use curate_core::session::CurationSession;
use curate_core::station::{CuratedRecord, RawStation};
use curate_core::view::SortKey;

fn catalog() -> StationCatalog {
    let raw: Vec<RawStation> = serde_json::from_str(
        r#"[
          {"stationuuid":"a","name":"Drift FM","url_resolved":"http://drift.example/stream",
           "tags":"ambient,chill","homepage":"http://drift.example","favicon":"",
           "country":"Iceland","countrycode":"IS","codec":"MP3","bitrate":128,"clickcount":120},
          {"stationuuid":"b","name":"Space Noise","url_resolved":"http://space.example/stream",
           "tags":"ambient,drone","clickcount":50}
        ]"#,
    )
    .unwrap();
    StationCatalog::from_raw(raw)
}

fn seeded_with_b() -> CurationSession {
    let seed = PersistedSelectionSeed::parse(r#"[{"stationuuid":"b","name":"Space Noise"}]"#).unwrap();
    CurationSession::new(catalog(), seed)
}

fn visible_ids(session: &CurationSession) -> Vec<String> {
    session
        .visible()
        .iter()
        .map(|r| r.stationuuid.clone())
        .collect()
}

#[test]
fn initial_view_is_by_listeners_with_seed_selected() {
    let session = seeded_with_b();
    assert_eq!(visible_ids(&session), vec!["a", "b"]);
    assert!(session.is_selected("b"));
    assert!(!session.is_selected("a"));
}

#[test]
fn toggling_then_exporting_keeps_catalog_order() {
    let mut session = seeded_with_b();
    assert!(session.toggle("a").unwrap());
    let out = session.export();
    let ids: Vec<&str> = out.iter().map(|r| r.stationuuid.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(
        out[0],
        CuratedRecord {
            stationuuid: "a".into(),
            name: "Drift FM".into(),
            url_resolved: "http://drift.example/stream".into(),
            tags: "ambient,chill".into(),
            homepage: "http://drift.example".into(),
            favicon: "".into(),
            country: "Iceland".into(),
            countrycode: "IS".into(),
            codec: "MP3".into(),
            bitrate: 128,
        }
    );
    assert_eq!(out[1].codec, "");
}

#[test]
fn filter_hides_rows_without_touching_selection() {
    let mut session = seeded_with_b();
    session.toggle("a").unwrap();
    session.set_filter("drone");
    assert_eq!(visible_ids(&session), vec!["b"]);
    // hidden rows stay selected and still export
    assert_eq!(session.export().len(), 2);
}

#[test]
fn preview_switch_and_toggle_off() {
    let mut session = seeded_with_b();
    session.play("a").unwrap();
    let cmds = session.play("b").unwrap();
    assert_eq!(cmds[0], PreviewCommand::Stop);
    assert!(matches!(
        session.preview().state(),
        PlaybackState::Playing { record_id, .. } if record_id == "b"
    ));

    assert_eq!(session.play("b").unwrap(), vec![PreviewCommand::Stop]);
    assert_eq!(session.preview().state(), &PlaybackState::Idle);
}

#[test]
fn preview_failure_returns_to_idle_and_keeps_selection() {
    let mut session = seeded_with_b();
    let token = match session.play("b").unwrap().as_slice() {
        [PreviewCommand::Start { token, .. }] => *token,
        other => panic!("unexpected commands {:?}", other),
    };
    assert!(session.on_preview_failure(token, "connection refused").is_some());
    assert_eq!(session.preview().current(), None);
    assert!(session.is_selected("b"));
}

#[test]
fn sorting_by_selected_puts_chosen_rows_first() {
    let mut session = seeded_with_b();
    session.sort_by(SortKey::Selected);
    assert_eq!(visible_ids(&session), vec!["b", "a"]);
    session.sort_by(SortKey::Selected);
    assert_eq!(visible_ids(&session), vec!["a", "b"]);
    session.sort_by(SortKey::Name);
    assert_eq!(visible_ids(&session), vec!["a", "b"]);
    session.sort_by(SortKey::Name);
    assert_eq!(visible_ids(&session), vec!["b", "a"]);
}

#[test]
fn empty_selection_exports_empty_array() {
    let mut session = seeded_with_b();
    session.deselect_all();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ambient-stations.json");
    assert_eq!(session.export_to(&path).unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
}

#[test]
fn exported_file_reseeds_the_next_session() {
    let mut session = seeded_with_b();
    session.toggle("a").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ambient-stations.json");
    assert_eq!(session.export_to(&path).unwrap(), 2);

    let seed = PersistedSelectionSeed::load(&path).unwrap();
    let next = CurationSession::new(catalog(), seed);
    assert!(next.is_selected("a"));
    assert!(next.is_selected("b"));
    assert_eq!(next.seed_only_count(), 0);
}

#[test]
fn failed_export_keeps_selection_and_retry_succeeds() {
    let mut session = seeded_with_b();
    session.toggle("a").unwrap();
    let dir = tempfile::tempdir().unwrap();

    // Target is an existing, non-empty directory: the final rename fails.
    let blocked = dir.path().join("blocked");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), "x").unwrap();
    let err = session.export_to(&blocked).unwrap_err();
    assert!(matches!(err, CurateError::ExportWrite { ref path, .. } if path == &blocked));
    assert!(blocked.is_dir());
    assert!(!dir.path().join("blocked.tmp").exists());

    assert_eq!(session.selected_count(), 2);
    assert!(session.is_selected("a"));
    assert!(session.is_selected("b"));

    let path = dir.path().join("ambient-stations.json");
    assert_eq!(session.export_to(&path).unwrap(), 2);
    let seed = PersistedSelectionSeed::load(&path).unwrap();
    let next = CurationSession::new(catalog(), seed);
    assert!(next.is_selected("a"));
    assert!(next.is_selected("b"));
}
