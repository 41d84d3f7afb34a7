use metadata_cleaner::services::engine::{EngineError, ExifToolEngine, MetadataEngine};
use metadata_cleaner::services::metadata::MetadataReader;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[ignore]
async fn test_exiftool_read_and_strip() {
    // 1. Requires exiftool on PATH
    let engine = Arc::new(ExifToolEngine::new("exiftool", Some(Duration::from_secs(30))));
    assert!(engine.health_check().await, "exiftool should be installed");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "plain text\n").unwrap();

    // 2. Raw record carries the file-system fields
    let raw = engine.extract_metadata(&path).await.expect("Extract failed");
    assert!(raw.contains_key("SourceFile"));
    assert!(raw.contains_key("FileType"));

    // 3. Reader drops them
    let reader = MetadataReader::new(engine.clone());
    let filtered = reader.read_metadata(&path).await.expect("Read failed");
    assert!(!filtered.contains_key("SourceFile"));
    assert!(!filtered.contains_key("FileType"));

    // 4. Formats exiftool cannot write are reported as failures
    match engine.strip_metadata(&path).await {
        Err(EngineError::Exited { .. }) => {}
        other => panic!("Expected exit failure, got {:?}", other),
    }
}
