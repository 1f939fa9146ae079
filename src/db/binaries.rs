//! Binary persistence: assembly batches and completeness queries.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Binary, Database, Part, PendingBinary};

impl Database {
    /// Find a binary by its content hash
    pub async fn find_binary_by_hash(&self, hash: &str) -> Result<Option<Binary>> {
        let row = sqlx::query_as::<_, Binary>(
            "SELECT id, hash, name, group_name, poster, posted, total_parts
             FROM binaries WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find binary: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Persist one assembly batch atomically
    ///
    /// Inserts binaries that do not exist yet, attaches each batch's parts
    /// via `parts.binary_id`, and deletes the parts whose subjects could not
    /// be parsed. All-or-nothing: a failure leaves every part unassigned so
    /// the next assembly pass retries the whole batch.
    pub async fn save_assembly(
        &self,
        binaries: &[PendingBinary],
        delete_part_ids: &[i64],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin assembly transaction: {}",
                e
            )))
        })?;

        for binary in binaries {
            let binary_id = match binary.id {
                Some(id) => id,
                None => {
                    let result = sqlx::query(
                        "INSERT INTO binaries (hash, name, group_name, poster, posted, total_parts)
                         VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&binary.hash)
                    .bind(&binary.name)
                    .bind(&binary.group_name)
                    .bind(&binary.poster)
                    .bind(binary.posted)
                    .bind(binary.total_parts)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::QueryFailed(format!(
                            "Failed to insert binary: {}",
                            e
                        )))
                    })?;
                    result.last_insert_rowid()
                }
            };

            for part_id in &binary.part_ids {
                sqlx::query("UPDATE parts SET binary_id = ? WHERE id = ?")
                    .bind(binary_id)
                    .bind(part_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::QueryFailed(format!(
                            "Failed to attach part to binary: {}",
                            e
                        )))
                    })?;
            }
        }

        for part_id in delete_part_ids {
            sqlx::query("DELETE FROM parts WHERE id = ?")
                .bind(part_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete unparseable part: {}",
                        e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit assembly transaction: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get the binaries whose segment coverage meets the completeness
    /// threshold (a percentage)
    ///
    /// A binary qualifies when all its declared parts are present and the
    /// aggregate segment ratio across those parts reaches the threshold.
    /// Ordered newest-posted first so fresh content promotes ahead of
    /// stragglers.
    pub async fn complete_candidates(&self, threshold: f64) -> Result<Vec<Binary>> {
        let rows = sqlx::query_as::<_, Binary>(
            "SELECT b.id, b.hash, b.name, b.group_name, b.poster, b.posted, b.total_parts
             FROM binaries b
             INNER JOIN (
                 SELECT p.binary_id,
                        COUNT(*) AS part_count,
                        SUM(p.total_segments) AS total_segments,
                        SUM((SELECT COUNT(*) FROM segments s WHERE s.part_id = p.id)) AS available_segments
                 FROM parts p
                 WHERE p.binary_id IS NOT NULL
                 GROUP BY p.binary_id
             ) agg ON agg.binary_id = b.id
             WHERE agg.part_count >= b.total_parts
               AND (CAST(agg.available_segments AS REAL) / agg.total_segments) * 100 >= ?
             ORDER BY b.posted DESC",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query complete binaries: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Get a binary's parts, ordered by subject for stable manifest output
    pub async fn get_binary_parts(&self, binary_id: i64) -> Result<Vec<Part>> {
        let rows = sqlx::query_as::<_, Part>(
            "SELECT id, hash, subject, poster, posted, group_name, total_segments, binary_id
             FROM parts WHERE binary_id = ? ORDER BY subject",
        )
        .bind(binary_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get binary parts: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Delete a binary and everything under it
    pub async fn delete_binary(&self, binary_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin delete transaction: {}",
                e
            )))
        })?;

        sqlx::query("DELETE FROM parts WHERE binary_id = ?")
            .bind(binary_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete binary parts: {}",
                    e
                )))
            })?;

        sqlx::query("DELETE FROM binaries WHERE id = ?")
            .bind(binary_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete binary: {}",
                    e
                )))
            })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit delete transaction: {}",
                e
            )))
        })?;

        Ok(())
    }
}
