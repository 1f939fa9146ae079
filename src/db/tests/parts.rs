use crate::db::*;
use tempfile::NamedTempFile;

fn sample_part(hash: &str, subject: &str, segments: Vec<(i32, &str)>) -> NewPart {
    NewPart {
        hash: hash.to_string(),
        subject: subject.to_string(),
        poster: "poster@example.com".to_string(),
        posted: 1_700_000_000,
        group_name: "alt.binaries.teevee".to_string(),
        total_segments: 3,
        segments: segments
            .into_iter()
            .map(|(number, message_id)| NewSegment {
                segment: number,
                size_bytes: 750_000,
                message_id: message_id.to_string(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_save_scan_batch_persists_parts_and_watermark() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    let parts = vec![
        sample_part("aaa", "Show [1/3]", vec![(1, "<s1@x>"), (2, "<s2@x>")]),
        sample_part("bbb", "Show [2/3]", vec![(1, "<s3@x>")]),
    ];

    db.save_scan_batch(group.id, 500, &parts, &[]).await.unwrap();

    let stored = db.unassigned_parts().await.unwrap();
    assert_eq!(stored.len(), 2);

    let first = db.find_part_by_hash("aaa").await.unwrap().unwrap();
    let segments = db.get_part_segments(first.id).await.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].segment, 1);
    assert_eq!(segments[1].segment, 2);

    let group = db
        .find_group_by_name("alt.binaries.teevee")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.last, 500);

    db.close().await;
}

#[tokio::test]
async fn test_rescan_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    let parts = vec![sample_part(
        "aaa",
        "Show [1/3]",
        vec![(1, "<s1@x>"), (2, "<s2@x>")],
    )];

    // Replaying the same chunk must not duplicate parts or segments
    db.save_scan_batch(group.id, 500, &parts, &[]).await.unwrap();
    db.save_scan_batch(group.id, 500, &parts, &[]).await.unwrap();

    let stored = db.unassigned_parts().await.unwrap();
    assert_eq!(stored.len(), 1);
    let segments = db.get_part_segments(stored[0].id).await.unwrap();
    assert_eq!(segments.len(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_later_segments_append_to_existing_part() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    db.save_scan_batch(
        group.id,
        100,
        &[sample_part("aaa", "Show [1/3]", vec![(1, "<s1@x>")])],
        &[],
    )
    .await
    .unwrap();

    // A later chunk carries the same logical part with a new segment
    db.save_scan_batch(
        group.id,
        200,
        &[sample_part("aaa", "Show [1/3]", vec![(3, "<s3@x>")])],
        &[],
    )
    .await
    .unwrap();

    let stored = db.unassigned_parts().await.unwrap();
    assert_eq!(stored.len(), 1);
    let segments = db.get_part_segments(stored[0].id).await.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].segment, 1);
    assert_eq!(segments[1].segment, 3);

    db.close().await;
}

#[tokio::test]
async fn test_missed_messages_recorded_with_attempts() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    db.save_scan_batch(group.id, 100, &[], &[42, 43]).await.unwrap();
    db.save_scan_batch(group.id, 100, &[], &[43]).await.unwrap();

    let missed = db.get_missed("alt.binaries.teevee", 10).await.unwrap();
    assert_eq!(missed.len(), 2);
    assert_eq!(missed[0].message_number, 42);
    assert_eq!(missed[0].attempts, 1);
    assert_eq!(missed[1].message_number, 43);
    assert_eq!(missed[1].attempts, 2);

    db.close().await;
}

#[tokio::test]
async fn test_delete_parts_cascades_segments() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    db.save_scan_batch(
        group.id,
        100,
        &[sample_part("aaa", "junk subject", vec![(1, "<s1@x>")])],
        &[],
    )
    .await
    .unwrap();

    let part = db.find_part_by_hash("aaa").await.unwrap().unwrap();
    db.delete_parts(&[part.id]).await.unwrap();

    assert!(db.find_part_by_hash("aaa").await.unwrap().is_none());
    assert!(db.get_part_segments(part.id).await.unwrap().is_empty());

    db.close().await;
}
