//! Part and segment persistence, including the per-chunk scan transaction.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, NewPart, Part, Segment};

impl Database {
    /// Find a part by its content hash
    pub async fn find_part_by_hash(&self, hash: &str) -> Result<Option<Part>> {
        let row = sqlx::query_as::<_, Part>(
            "SELECT id, hash, subject, poster, posted, group_name, total_segments, binary_id
             FROM parts WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find part: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get all parts not yet attached to a binary
    pub async fn unassigned_parts(&self) -> Result<Vec<Part>> {
        let rows = sqlx::query_as::<_, Part>(
            "SELECT id, hash, subject, poster, posted, group_name, total_segments, binary_id
             FROM parts WHERE binary_id IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get unassigned parts: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Get the segments of a part, ordered by segment number
    pub async fn get_part_segments(&self, part_id: i64) -> Result<Vec<Segment>> {
        let rows = sqlx::query_as::<_, Segment>(
            "SELECT id, part_id, segment, size_bytes, message_id
             FROM segments WHERE part_id = ? ORDER BY segment",
        )
        .bind(part_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get part segments: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Persist one scan chunk atomically
    ///
    /// Upserts parts by content hash, appends their segments, records the
    /// message numbers absent from the chunk, and advances the group's last
    /// watermark. Either everything lands or the watermark stays put, so a
    /// crashed scan re-fetches the chunk instead of skipping it. Re-fetching
    /// is safe: the UNIQUE constraint on (part_id, message_id) makes segment
    /// inserts no-ops on replay.
    pub async fn save_scan_batch(
        &self,
        group_id: i64,
        new_last: i64,
        parts: &[NewPart],
        missed: &[i64],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin scan transaction: {}",
                e
            )))
        })?;

        for part in parts {
            let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM parts WHERE hash = ?")
                .bind(&part.hash)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to look up part: {}",
                        e
                    )))
                })?;

            let part_id = match existing {
                Some(id) => id,
                None => {
                    let result = sqlx::query(
                        "INSERT INTO parts (hash, subject, poster, posted, group_name, total_segments)
                         VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&part.hash)
                    .bind(&part.subject)
                    .bind(&part.poster)
                    .bind(part.posted)
                    .bind(&part.group_name)
                    .bind(part.total_segments)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::QueryFailed(format!(
                            "Failed to insert part: {}",
                            e
                        )))
                    })?;
                    result.last_insert_rowid()
                }
            };

            for segment in &part.segments {
                sqlx::query(
                    "INSERT OR IGNORE INTO segments (part_id, segment, size_bytes, message_id)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(part_id)
                .bind(segment.segment)
                .bind(segment.size_bytes)
                .bind(&segment.message_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert segment: {}",
                        e
                    )))
                })?;
            }
        }

        if !missed.is_empty() {
            let group_name: String = sqlx::query_scalar("SELECT name FROM groups WHERE id = ?")
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to resolve group name: {}",
                        e
                    )))
                })?;

            for number in missed {
                sqlx::query(
                    "INSERT INTO missed_messages (group_name, message_number, attempts)
                     VALUES (?, ?, 1)
                     ON CONFLICT(group_name, message_number)
                     DO UPDATE SET attempts = attempts + 1",
                )
                .bind(&group_name)
                .bind(number)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to record missed message: {}",
                        e
                    )))
                })?;
            }
        }

        sqlx::query("UPDATE groups SET last = ? WHERE id = ?")
            .bind(new_last)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to advance watermark: {}",
                    e
                )))
            })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit scan transaction: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Delete parts by id, cascading to their segments
    pub async fn delete_parts(&self, part_ids: &[i64]) -> Result<()> {
        if part_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin delete transaction: {}",
                e
            )))
        })?;

        for id in part_ids {
            sqlx::query("DELETE FROM parts WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete part: {}",
                        e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit delete transaction: {}",
                e
            )))
        })?;

        Ok(())
    }
}
