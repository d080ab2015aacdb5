use mc3_core::errors::{ErrorInfo, Mc3Error};
use mc3_core::provenance::{RunProvenance, SchemaVersion};
use mc3_core::MoveTuningRecord;

#[test]
fn error_round_trips_through_json() {
    let err = Mc3Error::Sync(
        ErrorInfo::new("gather-missing", "no value for slot")
            .with_context("slot", "2")
            .with_hint("every worker must report once"),
    );
    let json = serde_json::to_string(&err).unwrap();
    let back: Mc3Error = serde_json::from_str(&json).unwrap();
    assert_eq!(err, back);
}

#[test]
fn schema_versions_order_naturally() {
    let v1 = SchemaVersion::new(1, 2, 0);
    let v2 = SchemaVersion::new(1, 10, 0);
    assert!(v1 < v2);
    assert_eq!(SchemaVersion::default(), SchemaVersion::new(1, 0, 0));
}

#[test]
fn provenance_round_trips_through_json() {
    let mut provenance = RunProvenance {
        input_hash: "abc123".into(),
        seed: 42,
        created_at: "2024-01-01T00:00:00Z".into(),
        tool_versions: Default::default(),
    };
    provenance
        .tool_versions
        .insert("mc3-engine".into(), "0.1.0".into());

    let json = serde_json::to_string_pretty(&provenance).unwrap();
    let back: RunProvenance = serde_json::from_str(&json).unwrap();
    assert_eq!(provenance, back);
}

#[test]
fn tunable_record_round_trips_through_json() {
    let record = MoveTuningRecord {
        name: "slide".into(),
        weight: 1.0,
        tried_period: 10,
        tried_total: 110,
        accepted_period: 4,
        accepted_total: 40,
        tuning_parameter: 0.85,
    };
    let json = serde_json::to_string(&record).unwrap();
    let back: MoveTuningRecord = serde_json::from_str(&json).unwrap();
    assert!(record.matches(&back));
}
