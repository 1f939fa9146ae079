//! Regex rule storage and bulk import.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, RegexRuleRow};

/// A rule staged for bulk import, before it has a database id.
#[derive(Debug, Clone)]
pub struct NewRule {
    /// Imported rule id, kept so re-imports stay stable
    pub id: i64,
    /// Group name prefix this rule applies to, or "*" for all groups
    pub group_scope: String,
    /// Regex source with named captures
    pub pattern: String,
    /// Evaluation order within a scope, ascending
    pub ordinal: i32,
    /// Free-form note about what the rule matches
    pub description: String,
}

impl Database {
    /// Get the enabled rules in evaluation order
    pub async fn enabled_rules(&self) -> Result<Vec<RegexRuleRow>> {
        let rows = sqlx::query_as::<_, RegexRuleRow>(
            "SELECT id, group_scope, pattern, ordinal, enabled, description
             FROM regex_rules WHERE enabled = 1
             ORDER BY ordinal, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get regex rules: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Add a single local rule
    ///
    /// Local rules take ids at 100000 and above so bulk imports never
    /// overwrite them.
    pub async fn insert_rule(
        &self,
        group_scope: &str,
        pattern: &str,
        ordinal: i32,
        description: &str,
    ) -> Result<i64> {
        let next_id: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(id) + 1, 100000) FROM regex_rules WHERE id >= 100000",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to allocate rule id: {}",
                e
            )))
        })?;

        sqlx::query(
            "INSERT INTO regex_rules (id, group_scope, pattern, ordinal, enabled, description)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(next_id)
        .bind(group_scope)
        .bind(pattern)
        .bind(ordinal)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert regex rule: {}",
                e
            )))
        })?;

        Ok(next_id)
    }

    /// Replace all imported rules with a fresh dump
    ///
    /// Deletes every rule with id below 100000, then inserts the new set in
    /// one transaction. Local rules (id >= 100000) are untouched.
    pub async fn replace_imported_rules(&self, rules: &[NewRule]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin import transaction: {}",
                e
            )))
        })?;

        sqlx::query("DELETE FROM regex_rules WHERE id < 100000")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear imported rules: {}",
                    e
                )))
            })?;

        for rule in rules {
            sqlx::query(
                "INSERT INTO regex_rules (id, group_scope, pattern, ordinal, enabled, description)
                 VALUES (?, ?, ?, ?, 1, ?)",
            )
            .bind(rule.id)
            .bind(&rule.group_scope)
            .bind(&rule.pattern)
            .bind(rule.ordinal)
            .bind(&rule.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to import regex rule: {}",
                    e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit import transaction: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Enable or disable a rule
    pub async fn set_rule_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE regex_rules SET enabled = ? WHERE id = ?")
            .bind(if enabled { 1 } else { 0 })
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update regex rule: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
