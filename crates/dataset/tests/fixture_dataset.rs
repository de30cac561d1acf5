use dataset::Dataset;
use shared::domain::Outcome;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/launches.csv");

#[tokio::test]
async fn loads_launch_export_with_index_column() {
    let dataset = Dataset::load(FIXTURE).await.expect("dataset");

    assert_eq!(dataset.len(), 18);
    assert_eq!(
        dataset.sites(),
        [
            "CCAFS LC-40".to_string(),
            "VAFB SLC-4E".to_string(),
            "KSC LC-39A".to_string(),
            "CCAFS SLC-40".to_string(),
        ]
    );
    assert_eq!(dataset.unknown_payload_count(), 1);

    let extent = dataset.payload_extent().expect("extent");
    assert_eq!(extent.low(), 0.0);
    assert_eq!(extent.high(), 9600.0);

    let successes = dataset
        .records()
        .iter()
        .filter(|record| record.outcome == Outcome::Success)
        .count();
    assert_eq!(successes, 7);
    assert_eq!(
        dataset.records()[0].booster_version.as_deref(),
        Some("F9 v1.0  B0003")
    );
}

#[tokio::test]
async fn loads_a_copy_written_to_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("launches.csv");
    std::fs::copy(FIXTURE, &path).expect("copy fixture");

    let dataset = Dataset::load(&path).await.expect("dataset");
    assert_eq!(dataset.sites().len(), 4);
}
