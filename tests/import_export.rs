use serde_json::json;

use scorebook::{
    core::store::{Scorebook, StoreConfig, StoreError},
    model::{ResultEntry, Shooter, Shots, Team},
    persist::MemorySlot,
    types::{CompetitionType, Discipline},
};

fn populated() -> Scorebook {
    let mut store = Scorebook::open(Box::new(MemorySlot::new()), StoreConfig::default());
    store
        .add_team(Team::with_id("t1", "SV Nord", vec![Shooter::with_id("a", "Anna")]))
        .unwrap();
    store.add_standalone_shooter(Shooter::with_id("s", "Solo")).unwrap();
    store
        .save_result(ResultEntry::new(
            Some("t1".into()),
            "a",
            Discipline::Duel,
            Shots::from_values(&[8, 9]),
        ))
        .unwrap();
    store.set_setting("theme", json!({ "dark": true })).unwrap();
    store.set_shooter_filter(Some(vec!["s".into()])).unwrap();
    store
}

#[test]
fn export_then_import_restores_state() {
    let source = populated();
    let exported = source.export_data();
    assert_eq!(exported.export_type, "complete");
    assert!(chrono::DateTime::parse_from_rfc3339(&exported.export_date).is_ok());

    let json = serde_json::to_value(&exported).unwrap();
    assert_eq!(json["exportType"], "complete");
    assert!(json["standaloneShooters"].is_array());

    let mut target = Scorebook::open(Box::new(MemorySlot::new()), StoreConfig::default());
    target.import_data(json).unwrap();

    assert_eq!(target.teams(), source.teams());
    assert_eq!(target.standalone_shooters(), source.standalone_shooters());
    assert_eq!(target.results(), source.results());
    assert_eq!(target.shooter_filter(), source.shooter_filter());
    assert_eq!(target.settings(), source.settings());
}

#[test]
fn partial_import_keeps_unspecified_keys() {
    let mut store = populated();
    store
        .import_data(json!({
            "exportType": "complete",
            "teams": [{ "id": "t9", "name": "Neu", "shooters": [] }],
        }))
        .unwrap();

    assert_eq!(store.teams().len(), 1);
    assert_eq!(store.teams()[0].id, "t9");
    assert_eq!(store.standalone_shooters().len(), 1);
    assert_eq!(store.results().len(), 1);
    assert_eq!(store.settings().get("theme"), Some(&json!({ "dark": true })));
}

#[test]
fn malformed_import_changes_nothing() {
    let mut store = populated();
    let teams_before = store.teams().to_vec();

    let err = store
        .import_data(json!({
            "exportType": "complete",
            "teams": [],
            "results": [{ "id": "r1", "shooterId": "a", "discipline": "Bogen" }],
        }))
        .unwrap_err();

    assert!(matches!(err, StoreError::Import(_)));
    assert!(err.to_string().starts_with("Import fehlgeschlagen"));
    assert_eq!(store.teams(), teams_before.as_slice());
    assert_eq!(store.results().len(), 1);

    assert!(matches!(store.import_data(json!([1, 2])), Err(StoreError::Import(_))));
}

#[test]
fn legacy_settings_import_merges_recognized_keys_only() {
    let mut store = populated();
    store
        .import_data(json!({
            "settings": { "labelRows": 10 },
            "clubLogo": "data:image/png;base64,AAAA",
            "selectedCompetitionType": "Annex Scheibe",
            "teams": [],
        }))
        .unwrap();

    assert_eq!(store.teams().len(), 1);
    assert_eq!(store.label_layout().rows, 10);
    assert_eq!(store.settings().get("theme"), Some(&json!({ "dark": true })));
    assert_eq!(store.logo(), Some("data:image/png;base64,AAAA"));
    assert_eq!(store.competition_type(), CompetitionType::Annex);
    assert_eq!(store.selected_discipline(), Discipline::Annex);
}

#[test]
fn import_null_filter_unsets_it() {
    let mut store = populated();
    store
        .import_data(json!({ "exportType": "complete", "visibleShooterIds": null }))
        .unwrap();
    assert!(store.shooter_filter().is_unset());
}

#[test]
fn unknown_settings_keys_pass_through_export() {
    let mut store = populated();
    store.set_setting("futureFeature", json!([1, "zwei", { "drei": 3.0 }])).unwrap();
    let json = serde_json::to_value(store.export_data()).unwrap();
    assert_eq!(json["settings"]["futureFeature"], json!([1, "zwei", { "drei": 3.0 }]));
}

#[test]
fn import_runs_edit_checks_before_applying() {
    let mut store = populated();
    let teams_before = store.teams().to_vec();
    let results_before = store.results().to_vec();

    let rejected = [
        json!({
            "exportType": "complete",
            "teams": [{ "id": "t2", "name": "<script>x</script>", "shooters": [] }],
        }),
        json!({
            "exportType": "complete",
            "teams": [{ "id": "t2", "name": "Gut", "shooters": [{ "id": "b", "name": "  " }] }],
        }),
        json!({
            "exportType": "complete",
            "teams": [{ "id": "t2", "name": "Gut", "shooters": [{ "id": "a", "name": "Anna" }] }],
            "standaloneShooters": [{ "id": "a", "name": "Anna solo" }],
        }),
        json!({
            "exportType": "complete",
            "teams": [
                { "id": "t2", "name": "Eins", "shooters": [] },
                { "id": "t2", "name": "Zwei", "shooters": [] },
            ],
        }),
        json!({
            "exportType": "complete",
            "results": [{
                "id": "r9",
                "teamId": "t1",
                "shooterId": "a",
                "discipline": "Annex Scheibe",
                "shots": [10, 10, 10],
            }],
        }),
    ];
    for payload in rejected {
        let err = store.import_data(payload.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Import(_)), "{payload}");
    }

    assert_eq!(store.teams(), teams_before.as_slice());
    assert_eq!(store.results(), results_before.as_slice());
    assert_eq!(store.competition_type(), CompetitionType::PrecisionDuel);
}

#[test]
fn imported_standalone_shooter_must_not_clash_with_kept_rosters() {
    let mut store = populated();
    let err = store
        .import_data(json!({
            "exportType": "complete",
            "standaloneShooters": [{ "id": "a", "name": "Anna" }],
        }))
        .unwrap_err();
    assert!(matches!(err, StoreError::Import(_)));
    assert_eq!(store.standalone_shooters()[0].id, "s");
}

#[test]
fn imported_names_are_trimmed() {
    let mut store = populated();
    store
        .import_data(json!({
            "exportType": "complete",
            "teams": [{ "id": "t2", "name": "  SV Ost ", "shooters": [{ "id": "x", "name": " Xaver " }] }],
        }))
        .unwrap();
    assert_eq!(store.teams()[0].name, "SV Ost");
    assert_eq!(store.teams()[0].shooters[0].name, "Xaver");
}
