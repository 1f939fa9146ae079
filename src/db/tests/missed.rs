use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_count_and_get_missed() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let group = db.add_group("alt.binaries.teevee").await.unwrap();

    db.save_scan_batch(group.id, 100, &[], &[5, 3, 9]).await.unwrap();

    assert_eq!(db.count_missed("alt.binaries.teevee").await.unwrap(), 3);
    assert_eq!(db.count_missed("alt.binaries.other").await.unwrap(), 0);

    let missed = db.get_missed("alt.binaries.teevee", 2).await.unwrap();
    assert_eq!(missed.len(), 2);
    assert_eq!(missed[0].message_number, 3);
    assert_eq!(missed[1].message_number, 5);

    db.close().await;
}

#[tokio::test]
async fn test_purge_missed_respects_attempts() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let group = db.add_group("alt.binaries.teevee").await.unwrap();

    db.save_scan_batch(group.id, 100, &[], &[1, 2]).await.unwrap();
    db.save_scan_batch(group.id, 100, &[], &[2]).await.unwrap();

    // Only message 2 has reached two attempts
    let purged = db.purge_missed("alt.binaries.teevee", 2).await.unwrap();
    assert_eq!(purged, 1);
    assert_eq!(db.count_missed("alt.binaries.teevee").await.unwrap(), 1);

    db.close().await;
}
