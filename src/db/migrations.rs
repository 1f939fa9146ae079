//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            Self::create_groups_schema(conn).await?;
            Self::create_binaries_schema(conn).await?;
            Self::create_parts_schema(conn).await?;
            Self::create_releases_schema(conn).await?;
            Self::create_missed_messages_schema(conn).await?;
            Self::create_regex_rules_schema(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        Ok(())
    }

    async fn create_groups_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1,
                first INTEGER NOT NULL DEFAULT 0,
                last INTEGER NOT NULL DEFAULT 0,
                min_files INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("groups"))?;

        Ok(())
    }

    async fn create_binaries_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE binaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                group_name TEXT NOT NULL,
                poster TEXT NOT NULL,
                posted INTEGER NOT NULL,
                total_parts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("binaries"))?;

        Ok(())
    }

    async fn create_parts_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                subject TEXT NOT NULL,
                poster TEXT NOT NULL,
                posted INTEGER NOT NULL,
                group_name TEXT NOT NULL,
                total_segments INTEGER NOT NULL,
                binary_id INTEGER REFERENCES binaries(id) ON DELETE SET NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("parts"))?;

        sqlx::query("CREATE INDEX idx_parts_binary_id ON parts(binary_id)")
            .execute(&mut *conn)
            .await
            .map_err(migration_err("parts index"))?;

        sqlx::query(
            r#"
            CREATE TABLE segments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                part_id INTEGER NOT NULL REFERENCES parts(id) ON DELETE CASCADE,
                segment INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                UNIQUE(part_id, message_id)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("segments"))?;

        Ok(())
    }

    async fn create_releases_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                search_name TEXT NOT NULL,
                original_name TEXT NOT NULL,
                poster TEXT NOT NULL,
                group_name TEXT NOT NULL,
                posted INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                category INTEGER NOT NULL,
                nzb TEXT NOT NULL,
                grabs INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("releases"))?;

        Ok(())
    }

    async fn create_missed_messages_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE missed_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_name TEXT NOT NULL,
                message_number INTEGER NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 1,
                UNIQUE(group_name, message_number)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("missed_messages"))?;

        Ok(())
    }

    async fn create_regex_rules_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE regex_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_scope TEXT NOT NULL,
                pattern TEXT NOT NULL,
                ordinal INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                description TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_err("regex_rules"))?;

        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(migration_err("schema_version"))?;

        Ok(())
    }
}

fn migration_err(what: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| {
        Error::Database(DatabaseError::MigrationFailed(format!(
            "Failed to create {}: {}",
            what, e
        )))
    }
}
