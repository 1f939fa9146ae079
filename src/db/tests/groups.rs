use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_add_and_find_group() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    assert!(group.id > 0);
    assert_eq!(group.name, "alt.binaries.teevee");
    assert_eq!(group.active, 1);
    assert_eq!(group.first, 0);
    assert_eq!(group.last, 0);
    assert_eq!(group.min_files, 1);

    let found = db.find_group_by_name("alt.binaries.teevee").await.unwrap();
    assert_eq!(found.unwrap().id, group.id);

    let missing = db.find_group_by_name("alt.binaries.nope").await.unwrap();
    assert!(missing.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_duplicate_group_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.add_group("alt.binaries.teevee").await.unwrap();
    let result = db.add_group("alt.binaries.teevee").await;
    assert!(result.is_err());

    db.close().await;
}

#[tokio::test]
async fn test_active_filtering() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.add_group("alt.binaries.moovee").await.unwrap();
    db.add_group("alt.binaries.teevee").await.unwrap();
    db.set_group_active("alt.binaries.moovee", false)
        .await
        .unwrap();

    let active = db.get_active_groups().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "alt.binaries.teevee");

    let all = db.get_all_groups().await.unwrap();
    assert_eq!(all.len(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_update_watermarks() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let group = db.add_group("alt.binaries.teevee").await.unwrap();
    db.update_group_watermarks(group.id, 100, 5000)
        .await
        .unwrap();

    let group = db
        .find_group_by_name("alt.binaries.teevee")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.first, 100);
    assert_eq!(group.last, 5000);

    db.close().await;
}

#[tokio::test]
async fn test_set_min_files() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.add_group("alt.binaries.teevee").await.unwrap();
    db.set_group_min_files("alt.binaries.teevee", 5)
        .await
        .unwrap();

    let group = db
        .find_group_by_name("alt.binaries.teevee")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.min_files, 5);

    db.close().await;
}
