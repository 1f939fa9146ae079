//! Database layer for usenet-indexer
//!
//! Handles SQLite persistence for groups, parts, segments, binaries,
//! releases, missed messages and subject rules.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`groups`] — Group records and scan watermarks
//! - [`parts`] — Part/segment persistence (scan batches)
//! - [`binaries`] — Binary assembly and completeness queries
//! - [`releases`] — Release promotion
//! - [`missed`] — Missed-message gap tracking
//! - [`rules`] — Subject regex rule storage

use sqlx::{sqlite::SqlitePool, FromRow};

mod binaries;
mod groups;
mod migrations;
mod missed;
mod parts;
mod releases;
mod rules;

pub use rules::NewRule;

/// Group record from database
///
/// `first`/`last` are the per-group scan watermarks: the oldest article
/// number ever considered and the newest article number already scanned.
#[derive(Debug, Clone, FromRow)]
pub struct Group {
    /// Unique database ID
    pub id: i64,
    /// Full group name (e.g. "alt.binaries.multimedia.anime")
    pub name: String,
    /// Whether the group is scanned (0 = disabled, 1 = enabled)
    pub active: i32,
    /// Oldest article number considered for this group
    pub first: i64,
    /// Newest article number already scanned
    pub last: i64,
    /// Minimum part count a binary must have to become a release
    pub min_files: i32,
}

/// Part record from database
#[derive(Debug, Clone, FromRow)]
pub struct Part {
    /// Unique database ID
    pub id: i64,
    /// Content hash grouping same-file segments together
    pub hash: String,
    /// Subject with the segment marker stripped
    pub subject: String,
    /// Poster (From header)
    pub poster: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Group the part was seen in
    pub group_name: String,
    /// Declared segment count from the subject's "(n/m)" marker
    pub total_segments: i32,
    /// Owning binary, NULL until assembled
    pub binary_id: Option<i64>,
}

/// Segment record from database
#[derive(Debug, Clone, FromRow)]
pub struct Segment {
    /// Unique database ID
    pub id: i64,
    /// Owning part
    pub part_id: i64,
    /// Sequence number within the part
    pub segment: i32,
    /// Size in bytes
    pub size_bytes: i64,
    /// Usenet message-ID
    pub message_id: String,
}

/// Binary record from database
#[derive(Debug, Clone, FromRow)]
pub struct Binary {
    /// Unique database ID
    pub id: i64,
    /// Content hash from (cleaned name, group, poster, total parts)
    pub hash: String,
    /// Original subject of the first part seen
    pub name: String,
    /// Group the binary was posted to
    pub group_name: String,
    /// Poster (From header)
    pub poster: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Declared part count parsed from the subject
    pub total_parts: i32,
}

/// Release record from database
#[derive(Debug, Clone, FromRow)]
pub struct Release {
    /// Unique database ID
    pub id: i64,
    /// Promotion hash (dedup key)
    pub hash: String,
    /// Cleaned release name
    pub name: String,
    /// Search-normalized name
    pub search_name: String,
    /// Original subject the release was built from
    pub original_name: String,
    /// Poster (From header)
    pub poster: String,
    /// Source group
    pub group_name: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Total size in bytes across all segments
    pub size_bytes: i64,
    /// Numeric category id (see [`crate::types::Category`])
    pub category: i64,
    /// NZB manifest document
    pub nzb: String,
    /// Times the NZB was fetched (maintained by the download surface)
    pub grabs: i64,
    /// Unix timestamp when the release was created
    pub created_at: i64,
}

/// Missed-message record from database
#[derive(Debug, Clone, FromRow)]
pub struct MissedMessage {
    /// Unique database ID
    pub id: i64,
    /// Group the message was expected in
    pub group_name: String,
    /// Article number absent from an overview response
    pub message_number: i64,
    /// How many scans have observed this number missing
    pub attempts: i32,
}

/// Subject regex rule record from database
#[derive(Debug, Clone, FromRow)]
pub struct RegexRuleRow {
    /// Unique database ID
    pub id: i64,
    /// Group-name scope: a prefix, or "*" for any group
    pub group_scope: String,
    /// Regex pattern text with named captures
    pub pattern: String,
    /// Evaluation order (ascending)
    pub ordinal: i32,
    /// Whether the rule participates in matching (0 = disabled)
    pub enabled: i32,
    /// Free-text description
    pub description: String,
}

/// New segment observed during a scan, pending persistence
#[derive(Debug, Clone)]
pub struct NewSegment {
    /// Sequence number within the part
    pub segment: i32,
    /// Size in bytes
    pub size_bytes: i64,
    /// Usenet message-ID
    pub message_id: String,
}

/// New part built from one scan chunk, pending persistence
#[derive(Debug, Clone)]
pub struct NewPart {
    /// Content hash (see [`crate::types::content_hash`])
    pub hash: String,
    /// Subject with the segment marker stripped
    pub subject: String,
    /// Poster (From header)
    pub poster: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Group the part was seen in
    pub group_name: String,
    /// Declared segment count
    pub total_segments: i32,
    /// Segments collected for this part in this chunk
    pub segments: Vec<NewSegment>,
}

/// One binary's pending assembly state for a batch save
///
/// `id` is `Some` for a binary loaded from an earlier run (merge) and
/// `None` for one first seen in this batch (create).
#[derive(Debug, Clone)]
pub struct PendingBinary {
    /// Existing row id, if this binary was already persisted
    pub id: Option<i64>,
    /// Content hash
    pub hash: String,
    /// Original subject of the first part seen
    pub name: String,
    /// Group name
    pub group_name: String,
    /// Poster
    pub poster: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Declared part count
    pub total_parts: i32,
    /// Parts to attach to this binary
    pub part_ids: Vec<i64>,
}

/// New release to be inserted at promotion time
#[derive(Debug, Clone)]
pub struct NewRelease {
    /// Promotion hash
    pub hash: String,
    /// Cleaned release name
    pub name: String,
    /// Search-normalized name
    pub search_name: String,
    /// Original subject
    pub original_name: String,
    /// Poster
    pub poster: String,
    /// Source group
    pub group_name: String,
    /// Posting date as unix seconds
    pub posted: i64,
    /// Total size in bytes
    pub size_bytes: i64,
    /// Numeric category id
    pub category: i64,
    /// NZB manifest document
    pub nzb: String,
}

/// Database handle for usenet-indexer
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
