//! Binary assembly: folding unassigned parts into binaries by content hash.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::db::{Database, PendingBinary};
use crate::subjects::SubjectParser;
use crate::types::content_hash;
use crate::{Error, Result};

/// Counters from one assembly pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssembleStats {
    /// Binaries created or extended
    pub binaries: usize,
    /// Parts attached to a binary
    pub assigned: usize,
    /// Parts deleted for lack of a parseable subject
    pub dropped: usize,
}

/// Group every unassigned part into a binary and persist the result.
///
/// Parts sharing (cleaned name, group, poster, declared total) collide on one
/// content hash and become one binary. A hash seen in an earlier run extends
/// the persisted binary instead of creating a second one, which is what makes
/// re-running this over the same parts safe. The whole batch lands in a
/// single transaction.
pub async fn assemble_binaries(db: &Database, parser: &SubjectParser) -> Result<AssembleStats> {
    let parts = db.unassigned_parts().await?;
    info!(parts = parts.len(), "assembling binaries");

    let mut pending: HashMap<String, PendingBinary> = HashMap::new();
    let mut dropped_ids = Vec::new();
    let mut stats = AssembleStats::default();

    for part in &parts {
        let parsed = match parser.parse(&part.group_name, &part.subject) {
            Ok(parsed) => parsed,
            Err(Error::Subject(_)) => {
                debug!(subject = %part.subject, "dropping unparseable part");
                dropped_ids.push(part.id);
                stats.dropped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let hash = content_hash(&[
            &parsed.name,
            &part.group_name,
            &part.poster,
            &parsed.total.to_string(),
        ]);

        if let Some(binary) = pending.get_mut(&hash) {
            binary.part_ids.push(part.id);
            stats.assigned += 1;
            continue;
        }

        // First sighting this run; an earlier run may have persisted it
        let existing_id = db.find_binary_by_hash(&hash).await?.map(|b| b.id);
        if existing_id.is_none() {
            debug!(name = %parsed.name, "new binary");
        }
        pending.insert(
            hash.clone(),
            PendingBinary {
                id: existing_id,
                hash,
                name: part.subject.clone(),
                group_name: part.group_name.clone(),
                poster: part.poster.clone(),
                posted: part.posted,
                total_parts: parsed.total,
                part_ids: vec![part.id],
            },
        );
        stats.assigned += 1;
    }

    let mut batch: Vec<PendingBinary> = pending.into_values().collect();
    batch.sort_by(|a, b| a.hash.cmp(&b.hash));
    stats.binaries = batch.len();

    db.save_assembly(&batch, &dropped_ids).await?;
    info!(
        binaries = stats.binaries,
        assigned = stats.assigned,
        dropped = stats.dropped,
        "assembly complete"
    );
    Ok(stats)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewPart, NewSegment};
    use crate::patterns::PatternLibrary;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn parser() -> SubjectParser {
        SubjectParser::new(PatternLibrary::from_rules(&[])).unwrap()
    }

    async fn db_with_group() -> (NamedTempFile, Arc<Database>, i64) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).await.unwrap();
        let group = db.add_group("misc.test").await.unwrap();
        (temp_file, Arc::new(db), group.id)
    }

    async fn seed_part(db: &Database, group_id: i64, hash: &str, subject: &str) {
        let part = NewPart {
            hash: hash.to_string(),
            subject: subject.to_string(),
            poster: "poster@example.com".to_string(),
            posted: 1_700_000_000,
            group_name: "misc.test".to_string(),
            total_segments: 1,
            segments: vec![NewSegment {
                segment: 1,
                size_bytes: 750_000,
                message_id: format!("<{}@x>", hash),
            }],
        };
        db.save_scan_batch(group_id, 0, &[part], &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_logical_name_forms_one_binary() {
        let (_file, db, group_id) = db_with_group().await;
        seed_part(&db, group_id, "h1", r#"Show.Name "show.part1.rar" [1/3]"#).await;
        seed_part(&db, group_id, "h2", r#"Show.Name "show.part2.rar" [2/3]"#).await;
        seed_part(&db, group_id, "h3", r#"Show.Name "show.part3.rar" [3/3]"#).await;

        let stats = assemble_binaries(&db, &parser()).await.unwrap();
        assert_eq!(stats.binaries, 1);
        assert_eq!(stats.assigned, 3);
        assert_eq!(stats.dropped, 0);

        // All three parts hang off the same binary
        assert!(db.unassigned_parts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_different_totals_form_distinct_binaries() {
        let (_file, db, group_id) = db_with_group().await;
        seed_part(&db, group_id, "h1", "Same.Name [1/3]").await;
        seed_part(&db, group_id, "h2", "Same.Name [1/5]").await;

        let stats = assemble_binaries(&db, &parser()).await.unwrap();
        assert_eq!(stats.binaries, 2);
    }

    #[tokio::test]
    async fn test_unparseable_part_deleted() {
        let (_file, db, group_id) = db_with_group().await;
        seed_part(&db, group_id, "good", "Named [1/2]").await;
        seed_part(&db, group_id, "junk", "no counts in this subject").await;

        let stats = assemble_binaries(&db, &parser()).await.unwrap();
        assert_eq!(stats.binaries, 1);
        assert_eq!(stats.dropped, 1);
        assert!(db.find_part_by_hash("junk").await.unwrap().is_none());
        assert!(db.find_part_by_hash("good").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reassembly_extends_persisted_binary() {
        let (_file, db, group_id) = db_with_group().await;
        seed_part(&db, group_id, "h1", r#"Show.Name "show.part1.rar" [1/3]"#).await;
        assemble_binaries(&db, &parser()).await.unwrap();

        // A later scan finds another part of the same binary
        seed_part(&db, group_id, "h2", r#"Show.Name "show.part2.rar" [2/3]"#).await;
        let stats = assemble_binaries(&db, &parser()).await.unwrap();
        assert_eq!(stats.binaries, 1);

        let part = db.find_part_by_hash("h1").await.unwrap().unwrap();
        let binary_id = part.binary_id.unwrap();
        let parts = db.get_binary_parts(binary_id).await.unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_with_nothing_pending_is_noop() {
        let (_file, db, group_id) = db_with_group().await;
        seed_part(&db, group_id, "h1", "Show.Name [1/1]").await;
        assemble_binaries(&db, &parser()).await.unwrap();

        let stats = assemble_binaries(&db, &parser()).await.unwrap();
        assert_eq!(stats, AssembleStats::default());
    }
}
