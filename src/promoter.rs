//! Release promotion.
//!
//! Walks binaries that passed the completeness threshold and turns each into
//! a release row with a rendered NZB manifest, or removes it when it cannot
//! become one (duplicate hash, fewer parts than the group's minimum). A
//! binary whose group has since been removed is left alone so a later run can
//! pick it up again.

use tracing::{debug, info, warn};

use crate::categorize::Categorizer;
use crate::db::{Database, NewRelease};
use crate::error::Result;
use crate::nzb::{write_nzb, ManifestFile, ManifestSegment};
use crate::subjects::SubjectParser;
use crate::types::{release_hash, Category};

/// Counters from one promotion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PromoteStats {
    /// Binaries promoted to releases
    pub promoted: usize,
    /// Binaries dropped because an identical release already exists
    pub duplicates: usize,
    /// Binaries dropped for having fewer parts than the group minimum
    pub rejected: usize,
    /// Binaries left untouched (group no longer registered)
    pub skipped: usize,
}

/// Promote every binary meeting `threshold` percent segment completeness.
pub async fn make_releases(
    db: &Database,
    parser: &SubjectParser,
    categorizer: &Categorizer,
    threshold: f64,
) -> Result<PromoteStats> {
    let candidates = db.complete_candidates(threshold).await?;
    info!(candidates = candidates.len(), threshold, "promoting binaries");

    let mut stats = PromoteStats::default();
    for binary in candidates {
        let parts = db.get_binary_parts(binary.id).await?;

        let mut files = Vec::with_capacity(parts.len());
        let mut size_bytes: i64 = 0;
        for part in &parts {
            let segments = db.get_part_segments(part.id).await?;
            let manifest_segments: Vec<ManifestSegment> = segments
                .iter()
                .map(|s| {
                    size_bytes += s.size_bytes;
                    ManifestSegment {
                        number: s.segment,
                        size_bytes: s.size_bytes,
                        message_id: s.message_id.clone(),
                    }
                })
                .collect();
            files.push(ManifestFile {
                subject: part.subject.clone(),
                poster: part.poster.clone(),
                posted: part.posted,
                group: part.group_name.clone(),
                segments: manifest_segments,
            });
        }

        let name = parser.release_name(&binary.group_name, &binary.name);
        let hash = release_hash(&name, &binary.group_name, binary.posted, size_bytes);
        if db.find_release_by_hash(&hash).await?.is_some() {
            debug!(binary = binary.id, %name, "duplicate release, dropping binary");
            db.delete_binary(binary.id).await?;
            stats.duplicates += 1;
            continue;
        }

        let Some(group) = db.find_group_by_name(&binary.group_name).await? else {
            warn!(
                binary = binary.id,
                group = %binary.group_name,
                "binary references unregistered group, leaving in place"
            );
            stats.skipped += 1;
            continue;
        };

        if parts.len() < group.min_files as usize {
            debug!(
                binary = binary.id,
                parts = parts.len(),
                min_files = group.min_files,
                "too few parts, dropping binary"
            );
            db.delete_binary(binary.id).await?;
            stats.rejected += 1;
            continue;
        }

        // Unclassifiable releases land in the catch-all, never Unknown
        let category = match categorizer.categorize(&name, &binary.group_name) {
            Category::Unknown => Category::Other,
            category => category,
        };
        let nzb = write_nzb(&name, &category.to_string(), &files);
        let release = NewRelease {
            hash,
            search_name: search_name(&name),
            original_name: binary.name.clone(),
            poster: binary.poster.clone(),
            group_name: binary.group_name.clone(),
            posted: binary.posted,
            size_bytes,
            category: category.id(),
            nzb,
            name,
        };
        let release_id = db.promote(&release, binary.id).await?;
        info!(
            release = release_id,
            name = %release.name,
            category = %category,
            size = size_bytes,
            "promoted binary"
        );
        stats.promoted += 1;
    }

    info!(
        promoted = stats.promoted,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        skipped = stats.skipped,
        "promotion complete"
    );
    Ok(stats)
}

/// Normalize a release name for the search index.
///
/// Drops characters with no search value and maps the usual word
/// separators to spaces.
pub fn search_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '#' | '@' | '$' | '%' | '^' | '§' | '¨' | '©' | 'Ö' => {}
            '_' | '.' | '-' => normalized.push(' '),
            _ => normalized.push(c),
        }
    }
    normalized.trim().to_string()
}
