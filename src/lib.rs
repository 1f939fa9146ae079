//! # usenet-indexer
//!
//! Backend library for building a Usenet binary indexer.
//!
//! The crate ingests NNTP overview metadata, reassembles multi-segment
//! postings into parts and binaries, and promotes complete binaries into
//! deduplicated, categorized releases carrying a deterministic NZB manifest.
//!
//! ## Pipeline
//!
//! - **Ingest** ([`scanner`]) - poll each group's overview range in chunks,
//!   group segments into parts by content hash, advance the group watermark
//! - **Assemble** ([`assembler`]) - parse part subjects and attach parts to
//!   binaries keyed by (cleaned name, group, poster, declared part count)
//! - **Promote** ([`promoter`]) - turn binaries past the completeness
//!   threshold into categorized releases with a rendered NZB document
//!
//! Each stage is a batch job over the database, safe to re-run; state shared
//! between runs lives behind transactions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use usenet_indexer::{
//!     assembler, categorize::Categorizer, patterns::PatternLibrary, promoter, scanner,
//!     subjects::SubjectParser, Config, Database, NntpClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let db = Arc::new(Database::new(&config.database_path).await?);
//!     db.add_group("alt.binaries.multimedia.anime").await?;
//!
//!     // Scan active groups over a pool of NNTP connections
//!     let groups: Vec<String> = db
//!         .get_active_groups()
//!         .await?
//!         .into_iter()
//!         .map(|g| g.name)
//!         .collect();
//!     let server = config.server.clone();
//!     scanner::scan_groups(
//!         Arc::clone(&db),
//!         config.scan.clone(),
//!         config.server.max_connections,
//!         groups,
//!         || NntpClient::connect(&server),
//!     )
//!     .await?;
//!
//!     // Assemble parts into binaries, then promote the complete ones
//!     let parser = SubjectParser::new(PatternLibrary::load(&db).await?)?;
//!     let categorizer = Categorizer::new()?;
//!     assembler::assemble_binaries(&db, &parser).await?;
//!     promoter::make_releases(&db, &parser, &categorizer, f64::from(config.promote_threshold))
//!         .await?;
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Binary assembly from parsed parts
pub mod assembler;
/// Release categorization
pub mod categorize;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// NNTP overview client
pub mod nntp;
/// NZB manifest writer
pub mod nzb;
/// Regex rule library
pub mod patterns;
/// Release promotion
pub mod promoter;
/// Overview ingestion and watermarks
pub mod scanner;
/// Subject parsing and name cleaning
pub mod subjects;
/// Core types and hashes
pub mod types;

// Re-export commonly used types
pub use assembler::AssembleStats;
pub use categorize::Categorizer;
pub use config::{Config, ScanConfig, ServerConfig};
pub use db::Database;
pub use error::{DatabaseError, Error, Result};
pub use nntp::{GroupStatus, NntpClient, OverviewSource};
pub use patterns::PatternLibrary;
pub use promoter::PromoteStats;
pub use scanner::{GroupScanner, ScanOutcome};
pub use subjects::{ParsedSubject, SubjectParser};
pub use types::{Category, RawPosting};
