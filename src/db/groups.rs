//! Group records and scan watermarks.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, Group};

impl Database {
    /// Register a new group for scanning
    ///
    /// Watermarks start at zero; the first scan initializes them from the
    /// server-reported bounds.
    pub async fn add_group(&self, name: &str) -> Result<Group> {
        sqlx::query("INSERT INTO groups (name, active, first, last, min_files) VALUES (?, 1, 0, 0, 1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to add group: {}",
                    e
                )))
            })?;

        self.find_group_by_name(name).await?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!(
                "group {} missing after insert",
                name
            )))
        })
    }

    /// Find a group by name
    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, Group>(
            "SELECT id, name, active, first, last, min_files FROM groups WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find group: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get all groups with scanning enabled
    pub async fn get_active_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, Group>(
            "SELECT id, name, active, first, last, min_files FROM groups WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get active groups: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Get all known groups
    pub async fn get_all_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, Group>(
            "SELECT id, name, active, first, last, min_files FROM groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get groups: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Enable or disable scanning for a group
    pub async fn set_group_active(&self, name: &str, active: bool) -> Result<()> {
        sqlx::query("UPDATE groups SET active = ? WHERE name = ?")
            .bind(if active { 1 } else { 0 })
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update group: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Set the minimum part count policy for a group
    pub async fn set_group_min_files(&self, name: &str, min_files: i32) -> Result<()> {
        sqlx::query("UPDATE groups SET min_files = ? WHERE name = ?")
            .bind(min_files)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update group min_files: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Persist reconciled watermarks for a group
    ///
    /// Used at scan start after clamping stored watermarks against the
    /// server-reported bounds; mid-scan advances go through the chunk
    /// transaction in [`Database::save_scan_batch`].
    pub async fn update_group_watermarks(&self, id: i64, first: i64, last: i64) -> Result<()> {
        sqlx::query("UPDATE groups SET first = ?, last = ? WHERE id = ?")
            .bind(first)
            .bind(last)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update group watermarks: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
