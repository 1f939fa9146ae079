//! NNTP overview access.
//!
//! The scanner only needs three things from a news server: select a group,
//! fetch overview lines for an article range, and hang up. [`OverviewSource`]
//! captures that surface so scans can run against the real wire client or an
//! in-memory fake in tests.

mod client;

pub use client::NntpClient;

use async_trait::async_trait;

use crate::types::RawPosting;
use crate::Result;

/// Article bounds reported by the server when a group is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatus {
    /// Lowest article number the server still carries
    pub low: i64,
    /// Highest article number posted so far
    pub high: i64,
    /// Estimated article count
    pub count: i64,
}

/// Source of overview data for one connection.
#[async_trait]
pub trait OverviewSource: Send {
    /// Select a group and return its article bounds
    async fn select_group(&mut self, name: &str) -> Result<GroupStatus>;

    /// Fetch overview records for an inclusive article range
    ///
    /// Articles absent from the server are simply omitted from the result.
    async fn fetch_overview(&mut self, begin: i64, end: i64) -> Result<Vec<RawPosting>>;

    /// Close the connection politely
    async fn quit(&mut self) -> Result<()>;
}
