//! Group scanning: watermark reconciliation, chunked overview fetch, and
//! gap detection, with a bounded worker pool for parallel group scans.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::db::{Database, NewPart, NewSegment};
use crate::error::DatabaseError;
use crate::nntp::OverviewSource;
use crate::types::{content_hash, RawPosting};
use crate::{Error, Result};

/// Per-group result of one scan pass.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Group that was scanned
    pub group: String,
    /// Overview records received
    pub scanned: u64,
    /// Message numbers recorded as missed
    pub missed: u64,
    /// Scan failure, if any; other groups keep scanning regardless
    pub error: Option<String>,
}

/// Scans groups over one protocol connection.
pub struct GroupScanner<S: OverviewSource> {
    source: S,
    db: Arc<Database>,
    config: ScanConfig,
    segment_marker: Regex,
}

impl<S: OverviewSource> GroupScanner<S> {
    /// Wrap a connected overview source
    pub fn new(source: S, db: Arc<Database>, config: ScanConfig) -> Result<Self> {
        let segment_marker = Regex::new(r"(?i)\((\d+)[/](\d+)\)")
            .map_err(|e| Error::Other(format!("bad segment marker pattern: {}", e)))?;
        Ok(Self {
            source,
            db,
            config,
            segment_marker,
        })
    }

    /// Scan one group forward from its stored watermark
    ///
    /// Returns (records scanned, message numbers missed). The watermark
    /// advances chunk by chunk inside the same transaction as the chunk's
    /// parts, so a crash never skips articles; it only re-fetches the last
    /// incomplete chunk.
    pub async fn scan_group(&mut self, group_name: &str) -> Result<(u64, u64)> {
        let status = self.source.select_group(group_name).await?;
        let group = self.db.find_group_by_name(group_name).await?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!(
                "group {} is not registered",
                group_name
            )))
        })?;

        let limit = self.config.backfill_limit;
        let mut first = group.first;
        let mut last = group.last;

        // Fresh groups backfill a bounded window rather than full history
        if first == 0 {
            info!(group = group_name, low = status.low, "initializing first watermark");
            first = status.low;
        }
        if last == 0 {
            let start = (status.high - limit).max(status.low);
            info!(group = group_name, last = start, "initializing last watermark");
            last = start;
        }
        if first < status.low {
            warn!(
                group = group_name,
                stored = first,
                server = status.low,
                "first watermark older than server retention, resetting"
            );
            first = status.low;
        }
        if last > status.high {
            warn!(
                group = group_name,
                stored = last,
                server = status.high,
                "last watermark beyond server high, resetting"
            );
            last = status.high;
        }
        self.db.update_group_watermarks(group.id, first, last).await?;

        if last >= status.high {
            debug!(group = group_name, "no new articles");
            return Ok((0, 0));
        }

        let target = if limit > 0 {
            status.high.min(last + limit)
        } else {
            status.high
        };
        debug!(
            group = group_name,
            from = last + 1,
            to = target,
            "scanning range"
        );

        let mut scanned = 0u64;
        let mut missed_total = 0u64;
        let mut begin = last + 1;
        while begin <= target {
            let end = (begin + self.config.max_chunk - 1).min(target);
            let postings = self.source.fetch_overview(begin, end).await?;
            scanned += postings.len() as u64;

            let missed = if self.config.track_missed {
                missed_numbers(begin, end, &postings)
            } else {
                Vec::new()
            };
            missed_total += missed.len() as u64;

            let parts = self.collect_parts(group_name, &postings);
            self.db
                .save_scan_batch(group.id, end, &parts, &missed)
                .await?;
            begin = end + 1;
        }

        info!(group = group_name, scanned, missed = missed_total, "scan complete");
        Ok((scanned, missed_total))
    }

    /// Fold overview records into parts keyed by content hash
    ///
    /// The segment marker is the trailing "(n/m)" pair; when a subject
    /// carries several, the last one is the real marker (earlier ones belong
    /// to the name). The marker text is stripped before hashing so all
    /// segments of one part collide on the same hash.
    fn collect_parts(&self, group_name: &str, postings: &[RawPosting]) -> Vec<NewPart> {
        let mut parts: HashMap<String, NewPart> = HashMap::new();

        for posting in postings {
            let markers: Vec<_> = self.segment_marker.captures_iter(&posting.subject).collect();
            let Some(last_marker) = markers.last() else {
                continue;
            };
            let (Ok(segment), Ok(total)) = (
                last_marker[1].parse::<i32>(),
                last_marker[2].parse::<i32>(),
            ) else {
                continue;
            };
            let stripped = posting
                .subject
                .replace(&last_marker[0], "")
                .trim()
                .to_string();

            let hash = content_hash(&[
                &stripped,
                &posting.poster,
                group_name,
                &total.to_string(),
            ]);
            let segment = NewSegment {
                segment,
                size_bytes: posting.bytes,
                message_id: posting.message_id.clone(),
            };

            match parts.get_mut(&hash) {
                Some(part) => part.segments.push(segment),
                None => {
                    parts.insert(
                        hash.clone(),
                        NewPart {
                            hash,
                            subject: stripped,
                            poster: posting.poster.clone(),
                            posted: posting.date.timestamp(),
                            group_name: group_name.to_string(),
                            total_segments: total,
                            segments: vec![segment],
                        },
                    );
                }
            }
        }

        let mut parts: Vec<NewPart> = parts.into_values().collect();
        parts.sort_by(|a, b| a.hash.cmp(&b.hash));
        parts
    }

    /// Close the underlying connection
    pub async fn close(&mut self) {
        if let Err(e) = self.source.quit().await {
            debug!("error closing connection: {}", e);
        }
    }
}

/// Expected message numbers in [begin, end] absent from the response.
fn missed_numbers(begin: i64, end: i64, postings: &[RawPosting]) -> Vec<i64> {
    let observed: HashSet<i64> = postings.iter().map(|p| p.number).collect();
    (begin..=end).filter(|n| !observed.contains(n)).collect()
}

/// Scan a set of groups with a bounded worker pool.
///
/// One connection per worker, capped at the number of groups. Workers pull
/// group names from a shared queue; closing the queue after the last request
/// is the only termination signal. A failed group scan lands in that group's
/// outcome without disturbing the others.
pub async fn scan_groups<S, F, Fut>(
    db: Arc<Database>,
    config: ScanConfig,
    max_connections: usize,
    groups: Vec<String>,
    connect: F,
) -> Result<Vec<ScanOutcome>>
where
    S: OverviewSource + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S>>,
{
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let workers = max_connections.max(1).min(groups.len());
    info!(workers, groups = groups.len(), "starting group scan");

    let (request_tx, request_rx) = mpsc::channel::<String>(groups.len());
    let request_rx = Arc::new(Mutex::new(request_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<ScanOutcome>(groups.len());

    let mut handles = Vec::with_capacity(workers);
    for ident in 0..workers {
        let source = connect().await?;
        let mut scanner = GroupScanner::new(source, Arc::clone(&db), config.clone())?;
        let queue = Arc::clone(&request_rx);
        let results = result_tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let request = {
                    let mut queue = queue.lock().await;
                    queue.recv().await
                };
                let Some(group) = request else {
                    debug!(worker = ident, "request queue closed, exiting");
                    break;
                };
                debug!(worker = ident, group = %group, "scanning");
                let outcome = match scanner.scan_group(&group).await {
                    Ok((scanned, missed)) => ScanOutcome {
                        group,
                        scanned,
                        missed,
                        error: None,
                    },
                    Err(e) => {
                        error!(worker = ident, group = %group, "scan failed: {}", e);
                        ScanOutcome {
                            group,
                            scanned: 0,
                            missed: 0,
                            error: Some(e.to_string()),
                        }
                    }
                };
                if results.send(outcome).await.is_err() {
                    break;
                }
            }
            scanner.close().await;
        }));
    }
    drop(result_tx);

    for group in groups {
        if request_tx.send(group).await.is_err() {
            break;
        }
    }
    drop(request_tx);

    for handle in handles {
        if let Err(e) = handle.await {
            error!("scan worker panicked: {}", e);
        }
    }

    let mut outcomes = Vec::new();
    while let Some(outcome) = result_rx.recv().await {
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::nntp::GroupStatus;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use tempfile::NamedTempFile;

    /// In-memory overview source with a fixed article range.
    struct FakeSource {
        status: GroupStatus,
        postings: Vec<RawPosting>,
        fetches: Arc<StdMutex<Vec<(i64, i64)>>>,
        fail_select: bool,
    }

    impl FakeSource {
        fn new(low: i64, high: i64, postings: Vec<RawPosting>) -> Self {
            Self {
                status: GroupStatus {
                    low,
                    high,
                    count: high - low + 1,
                },
                postings,
                fetches: Arc::new(StdMutex::new(Vec::new())),
                fail_select: false,
            }
        }
    }

    #[async_trait]
    impl OverviewSource for FakeSource {
        async fn select_group(&mut self, name: &str) -> Result<GroupStatus> {
            if self.fail_select {
                return Err(Error::Nntp(format!("no such group: {}", name)));
            }
            Ok(self.status)
        }

        async fn fetch_overview(&mut self, begin: i64, end: i64) -> Result<Vec<RawPosting>> {
            self.fetches.lock().unwrap().push((begin, end));
            Ok(self
                .postings
                .iter()
                .filter(|p| p.number >= begin && p.number <= end)
                .cloned()
                .collect())
        }

        async fn quit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn posting(number: i64, subject: &str) -> RawPosting {
        RawPosting {
            number,
            subject: subject.to_string(),
            poster: "poster@example.com".to_string(),
            bytes: 750_000,
            message_id: format!("<msg{}@x>", number),
            date: Utc.with_ymd_and_hms(2025, 6, 23, 10, 0, 0).unwrap(),
            xref: String::new(),
        }
    }

    fn scan_config(max_chunk: i64, limit: i64, track_missed: bool) -> ScanConfig {
        ScanConfig {
            max_chunk,
            backfill_limit: limit,
            track_missed,
        }
    }

    async fn db_with_group() -> (NamedTempFile, Arc<Database>, i64) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).await.unwrap();
        let group = db.add_group("misc.test").await.unwrap();
        (temp_file, Arc::new(db), group.id)
    }

    #[tokio::test]
    async fn test_no_new_articles_short_circuits() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 1000).await.unwrap();

        let source = FakeSource::new(100, 1000, vec![]);
        let fetches = Arc::clone(&source.fetches);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(100, 100, false)).unwrap();

        let (scanned, missed) = scanner.scan_group("misc.test").await.unwrap();
        assert_eq!(scanned, 0);
        assert_eq!(missed, 0);
        // Zero overview calls beyond the bounds check
        assert!(fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_group_backfills_bounded_window() {
        let (_file, db, _) = db_with_group().await;

        // Server range [100, 1000], limit 100: scan starts at 901
        let source = FakeSource::new(100, 1000, vec![]);
        let fetches = Arc::clone(&source.fetches);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, false)).unwrap();

        scanner.scan_group("misc.test").await.unwrap();

        assert_eq!(*fetches.lock().unwrap(), vec![(901, 1000)]);
        let group = db.find_group_by_name("misc.test").await.unwrap().unwrap();
        assert_eq!(group.first, 100);
        assert_eq!(group.last, 1000);
    }

    #[tokio::test]
    async fn test_chunked_fetching_steps_through_range() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        let source = FakeSource::new(100, 1000, vec![]);
        let fetches = Arc::clone(&source.fetches);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(40, 1000, false)).unwrap();

        scanner.scan_group("misc.test").await.unwrap();

        assert_eq!(
            *fetches.lock().unwrap(),
            vec![(901, 940), (941, 980), (981, 1000)]
        );
    }

    #[tokio::test]
    async fn test_missed_messages_counted_when_tracking() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        // Only two articles present in [901, 1000]
        let postings = vec![
            posting(905, "Show.Name (1/2)"),
            posting(906, "Show.Name (2/2)"),
        ];
        let source = FakeSource::new(100, 1000, postings);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, true)).unwrap();

        let (scanned, missed) = scanner.scan_group("misc.test").await.unwrap();
        assert_eq!(scanned, 2);
        assert_eq!(missed, 98);
        assert_eq!(db.count_missed("misc.test").await.unwrap(), 98);
    }

    #[tokio::test]
    async fn test_missed_not_recorded_by_default() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        let source = FakeSource::new(100, 1000, vec![]);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, false)).unwrap();

        let (_, missed) = scanner.scan_group("misc.test").await.unwrap();
        assert_eq!(missed, 0);
        assert_eq!(db.count_missed("misc.test").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_segments_merge_into_one_part() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        let postings = vec![
            posting(901, r#"Show.Name - "show.rar" (1/3)"#),
            posting(902, r#"Show.Name - "show.rar" (2/3)"#),
            posting(903, r#"Show.Name - "show.rar" (3/3)"#),
        ];
        let source = FakeSource::new(100, 1000, postings);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, false)).unwrap();

        scanner.scan_group("misc.test").await.unwrap();

        let parts = db.unassigned_parts().await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].total_segments, 3);
        // The segment marker is stripped from the stored subject
        assert_eq!(parts[0].subject, r#"Show.Name - "show.rar""#);
        let segments = db.get_part_segments(parts[0].id).await.unwrap();
        assert_eq!(segments.len(), 3);
    }

    #[tokio::test]
    async fn test_last_marker_wins_for_segment_numbers() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        let postings = vec![posting(901, "Show (2006) (1/2) more (3/20)")];
        let source = FakeSource::new(100, 1000, postings);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, false)).unwrap();

        scanner.scan_group("misc.test").await.unwrap();

        let parts = db.unassigned_parts().await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].total_segments, 20);
        let segments = db.get_part_segments(parts[0].id).await.unwrap();
        assert_eq!(segments[0].segment, 3);
    }

    #[tokio::test]
    async fn test_postings_without_marker_ignored() {
        let (_file, db, group_id) = db_with_group().await;
        db.update_group_watermarks(group_id, 100, 900).await.unwrap();

        let postings = vec![posting(901, "a discussion thread, no binary")];
        let source = FakeSource::new(100, 1000, postings);
        let mut scanner =
            GroupScanner::new(source, Arc::clone(&db), scan_config(10_000, 100, false)).unwrap();

        let (scanned, _) = scanner.scan_group("misc.test").await.unwrap();
        assert_eq!(scanned, 1);
        assert!(db.unassigned_parts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pool_isolates_group_failures() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
        db.add_group("misc.good").await.unwrap();
        db.add_group("misc.bad").await.unwrap();

        let calls = Arc::new(StdMutex::new(0));
        let calls_in_factory = Arc::clone(&calls);
        let outcomes = scan_groups(
            Arc::clone(&db),
            scan_config(10_000, 100, false),
            1,
            vec!["misc.good".to_string(), "misc.bad".to_string()],
            move || {
                let calls = Arc::clone(&calls_in_factory);
                async move {
                    *calls.lock().unwrap() += 1;
                    let mut source = FakeSource::new(100, 1000, vec![posting(950, "x (1/1)")]);
                    source.fail_select = false;
                    Ok(source)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(outcomes.iter().all(|o| o.error.is_none()));
    }

    #[tokio::test]
    async fn test_pool_reports_error_per_group() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
        db.add_group("misc.good").await.unwrap();

        // "misc.missing" is not registered; its scan errors but the other
        // group still completes
        let outcomes = scan_groups(
            Arc::clone(&db),
            scan_config(10_000, 100, false),
            2,
            vec!["misc.good".to_string(), "misc.missing".to_string()],
            || async { Ok(FakeSource::new(100, 1000, vec![])) },
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        let good = outcomes.iter().find(|o| o.group == "misc.good").unwrap();
        assert!(good.error.is_none());
        let bad = outcomes.iter().find(|o| o.group == "misc.missing").unwrap();
        assert!(bad.error.is_some());
    }
}
