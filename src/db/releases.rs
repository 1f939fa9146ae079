//! Release promotion and lookup.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, NewRelease, Release};

impl Database {
    /// Find a release by its dedup hash
    pub async fn find_release_by_hash(&self, hash: &str) -> Result<Option<Release>> {
        let row = sqlx::query_as::<_, Release>(
            "SELECT id, hash, name, search_name, original_name, poster, group_name,
                    posted, size_bytes, category, nzb, grabs, created_at
             FROM releases WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find release: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Promote a binary to a release atomically
    ///
    /// Inserts the release row and removes the source binary with its parts
    /// and segments in one transaction. The manifest already embedded in
    /// `release.nzb` is the only surviving record of the segment layout.
    pub async fn promote(&self, release: &NewRelease, binary_id: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin promote transaction: {}",
                e
            )))
        })?;

        let result = sqlx::query(
            "INSERT INTO releases (hash, name, search_name, original_name, poster, group_name,
                                   posted, size_bytes, category, nzb, grabs, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, strftime('%s', 'now'))",
        )
        .bind(&release.hash)
        .bind(&release.name)
        .bind(&release.search_name)
        .bind(&release.original_name)
        .bind(&release.poster)
        .bind(&release.group_name)
        .bind(release.posted)
        .bind(release.size_bytes)
        .bind(release.category)
        .bind(&release.nzb)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert release: {}",
                e
            )))
        })?;

        let release_id = result.last_insert_rowid();

        sqlx::query("DELETE FROM parts WHERE binary_id = ?")
            .bind(binary_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete promoted parts: {}",
                    e
                )))
            })?;

        sqlx::query("DELETE FROM binaries WHERE id = ?")
            .bind(binary_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete promoted binary: {}",
                    e
                )))
            })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit promote transaction: {}",
                e
            )))
        })?;

        Ok(release_id)
    }

    /// List releases newest first
    pub async fn list_releases(&self, limit: i64) -> Result<Vec<Release>> {
        let rows = sqlx::query_as::<_, Release>(
            "SELECT id, hash, name, search_name, original_name, poster, group_name,
                    posted, size_bytes, category, nzb, grabs, created_at
             FROM releases ORDER BY posted DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list releases: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
