//! Missed message bookkeeping.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, MissedMessage};

impl Database {
    /// Count the missed messages recorded for a group
    pub async fn count_missed(&self, group_name: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM missed_messages WHERE group_name = ?")
                .bind(group_name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count missed messages: {}",
                        e
                    )))
                })?;

        Ok(count)
    }

    /// Get a group's missed messages, oldest message number first
    pub async fn get_missed(&self, group_name: &str, limit: i64) -> Result<Vec<MissedMessage>> {
        let rows = sqlx::query_as::<_, MissedMessage>(
            "SELECT id, group_name, message_number, attempts
             FROM missed_messages WHERE group_name = ?
             ORDER BY message_number LIMIT ?",
        )
        .bind(group_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get missed messages: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Drop missed-message records that have exceeded the retry budget
    pub async fn purge_missed(&self, group_name: &str, max_attempts: i32) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM missed_messages WHERE group_name = ? AND attempts >= ?",
        )
        .bind(group_name)
        .bind(max_attempts)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to purge missed messages: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
