use crate::db::*;
use tempfile::NamedTempFile;

fn imported(id: i64, scope: &str, pattern: &str, ordinal: i32) -> NewRule {
    NewRule {
        id,
        group_scope: scope.to_string(),
        pattern: pattern.to_string(),
        ordinal,
        description: String::new(),
    }
}

#[tokio::test]
async fn test_enabled_rules_ordered_by_ordinal() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.replace_imported_rules(&[
        imported(2, "*", r"(?P<name>.+)", 20),
        imported(1, "alt.binaries.teevee", r"(?P<name>.+?) \[", 10),
    ])
    .await
    .unwrap();

    let rules = db.enabled_rules().await.unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].id, 1);
    assert_eq!(rules[0].ordinal, 10);
    assert_eq!(rules[1].id, 2);

    db.close().await;
}

#[tokio::test]
async fn test_reimport_replaces_low_ids_keeps_local() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.replace_imported_rules(&[imported(1, "*", r"old", 10)])
        .await
        .unwrap();
    let local_id = db
        .insert_rule("alt.binaries.teevee", r"(?P<name>local)", 5, "hand written")
        .await
        .unwrap();
    assert!(local_id >= 100_000);

    db.replace_imported_rules(&[imported(7, "*", r"new", 10)])
        .await
        .unwrap();

    let rules = db.enabled_rules().await.unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].id, local_id);
    assert_eq!(rules[1].id, 7);
    assert_eq!(rules[1].pattern, "new");

    db.close().await;
}

#[tokio::test]
async fn test_disabled_rules_excluded() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.replace_imported_rules(&[imported(1, "*", r"a", 10), imported(2, "*", r"b", 20)])
        .await
        .unwrap();
    db.set_rule_enabled(1, false).await.unwrap();

    let rules = db.enabled_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, 2);

    db.close().await;
}
