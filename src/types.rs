//! Core types for usenet-indexer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One article as returned by the protocol source's overview command.
///
/// Never persisted as-is; the scanner folds overview records into
/// [Parts](crate::db::Part) and [Segments](crate::db::Segment).
#[derive(Clone, Debug)]
pub struct RawPosting {
    /// Server-assigned article number within the group
    pub number: i64,
    /// Raw subject line
    pub subject: String,
    /// From header (poster)
    pub poster: String,
    /// Article size in bytes
    pub bytes: i64,
    /// Message-ID, usually angle-bracket delimited
    pub message_id: String,
    /// Posting date
    pub date: DateTime<Utc>,
    /// Cross-reference header (which groups carry this article)
    pub xref: String,
}

/// Content hash used to group segments into parts and parts into binaries.
///
/// MD5 over the identity fields joined with `.`, stable across process
/// restarts. Parts hash (subject, poster, group, declared
/// segment total); binaries hash (cleaned name, group, poster, declared
/// part total).
pub fn content_hash(fields: &[&str]) -> String {
    format!("{:x}", md5::compute(fields.join(".")))
}

/// Promotion hash identifying a release.
///
/// SHA-256 over (cleaned name, group, posted epoch seconds, total byte
/// size). Dedup at promotion time is by equality of this hash, not by
/// name/date string comparison.
pub fn release_hash(name: &str, group: &str, posted: i64, size: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(group.as_bytes());
    hasher.update(posted.to_string().as_bytes());
    hasher.update(size.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Release category.
///
/// A fixed value-type hierarchy, not a database entity. The numeric ids
/// follow the newznab convention (parent = thousands, subcategory = parent
/// plus tens) and are what gets stored on a release row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Could not be categorized at all
    Unknown,
    /// Catch-all parent
    Other,
    /// Miscellaneous noise (random-looking names)
    OtherMisc,
    /// Hash-named postings
    OtherHashed,

    /// Console parent
    Console,
    /// Movies parent
    Movies,
    /// Audio parent
    Audio,
    /// PC parent
    Pc,
    /// TV parent
    Tv,
    /// Adult parent
    Xxx,
    /// Books parent
    Books,

    /// Foreign-language movie
    MovieForeign,
    /// Movie that fits no other movie bucket
    MovieOther,
    /// Standard-definition movie
    MovieSd,
    /// High-definition movie
    MovieHd,
    /// 3D movie
    Movie3d,
    /// BluRay movie
    MovieBluRay,
    /// DVD movie
    MovieDvd,
    /// WEB-DL movie
    MovieWebDl,

    /// WEB-DL TV episode
    TvWebDl,
    /// Foreign-language TV
    TvForeign,
    /// Standard-definition TV
    TvSd,
    /// High-definition TV
    TvHd,
    /// TV that fits no other TV bucket
    TvOther,
    /// Sports broadcast
    TvSport,
    /// Anime
    TvAnime,
    /// Documentary
    TvDocumentary,

    /// 0-day PC software
    Pc0day,
}

impl Category {
    /// Numeric id stored on release rows
    pub fn id(self) -> i64 {
        match self {
            Category::Unknown => -1,
            Category::Other => 0,
            Category::OtherMisc => 10,
            Category::OtherHashed => 20,
            Category::Console => 1000,
            Category::Movies => 2000,
            Category::Audio => 3000,
            Category::Pc => 4000,
            Category::Tv => 5000,
            Category::Xxx => 6000,
            Category::Books => 7000,
            Category::MovieForeign => 2010,
            Category::MovieOther => 2020,
            Category::MovieSd => 2030,
            Category::MovieHd => 2040,
            Category::Movie3d => 2050,
            Category::MovieBluRay => 2060,
            Category::MovieDvd => 2070,
            Category::MovieWebDl => 2080,
            Category::TvWebDl => 5010,
            Category::TvForeign => 5020,
            Category::TvSd => 5030,
            Category::TvHd => 5040,
            Category::TvOther => 5050,
            Category::TvSport => 5060,
            Category::TvAnime => 5070,
            Category::TvDocumentary => 5080,
            Category::Pc0day => 4010,
        }
    }

    /// Category from a stored numeric id; unknown ids map to Unknown
    pub fn from_id(id: i64) -> Self {
        match id {
            0 => Category::Other,
            10 => Category::OtherMisc,
            20 => Category::OtherHashed,
            1000 => Category::Console,
            2000 => Category::Movies,
            3000 => Category::Audio,
            4000 => Category::Pc,
            5000 => Category::Tv,
            6000 => Category::Xxx,
            7000 => Category::Books,
            2010 => Category::MovieForeign,
            2020 => Category::MovieOther,
            2030 => Category::MovieSd,
            2040 => Category::MovieHd,
            2050 => Category::Movie3d,
            2060 => Category::MovieBluRay,
            2070 => Category::MovieDvd,
            2080 => Category::MovieWebDl,
            5010 => Category::TvWebDl,
            5020 => Category::TvForeign,
            5030 => Category::TvSd,
            5040 => Category::TvHd,
            5050 => Category::TvOther,
            5060 => Category::TvSport,
            5070 => Category::TvAnime,
            5080 => Category::TvDocumentary,
            4010 => Category::Pc0day,
            _ => Category::Unknown,
        }
    }

    /// Parent category for a subcategory; parents return themselves
    pub fn parent(self) -> Self {
        match self.id() {
            id if id >= 1000 => Category::from_id((id / 1000) * 1000),
            id if id > 0 => Category::Other,
            _ => self,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Unknown => "Unknown",
            Category::Other => "Other",
            Category::OtherMisc => "Other_Misc",
            Category::OtherHashed => "Other_Hashed",
            Category::Console => "Console",
            Category::Movies => "Movies",
            Category::Audio => "Audio",
            Category::Pc => "PC",
            Category::Tv => "TV",
            Category::Xxx => "XXX",
            Category::Books => "Books",
            Category::MovieForeign => "Movie_Foreign",
            Category::MovieOther => "Movie_Other",
            Category::MovieSd => "Movie_SD",
            Category::MovieHd => "Movie_HD",
            Category::Movie3d => "Movie_3D",
            Category::MovieBluRay => "Movie_BluRay",
            Category::MovieDvd => "Movie_DVD",
            Category::MovieWebDl => "Movie_WEBDL",
            Category::TvWebDl => "TV_WEBDL",
            Category::TvForeign => "TV_Foreign",
            Category::TvSd => "TV_SD",
            Category::TvHd => "TV_HD",
            Category::TvOther => "TV_Other",
            Category::TvSport => "TV_Sport",
            Category::TvAnime => "TV_Anime",
            Category::TvDocumentary => "TV_Documentary",
            Category::Pc0day => "PC_0day",
        };
        f.write_str(name)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable() {
        let a = content_hash(&["Some.Show", "misc.test", "<poster@example.com>", "30"]);
        let b = content_hash(&["Some.Show", "misc.test", "<poster@example.com>", "30"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn content_hash_differs_on_any_field() {
        let base = content_hash(&["name", "group", "poster", "10"]);
        assert_ne!(base, content_hash(&["name", "group", "poster", "11"]));
        assert_ne!(base, content_hash(&["name", "group2", "poster", "10"]));
    }

    #[test]
    fn release_hash_is_stable() {
        let a = release_hash("Show Name", "misc.test", 1_600_000_000, 123_456);
        let b = release_hash("Show Name", "misc.test", 1_600_000_000, 123_456);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn category_ids_round_trip() {
        for cat in [
            Category::Other,
            Category::OtherMisc,
            Category::OtherHashed,
            Category::Movies,
            Category::MovieHd,
            Category::Tv,
            Category::TvSd,
            Category::TvAnime,
            Category::Pc0day,
        ] {
            assert_eq!(Category::from_id(cat.id()), cat);
        }
    }

    #[test]
    fn unknown_category_id_maps_to_unknown() {
        assert_eq!(Category::from_id(99_999), Category::Unknown);
        assert_eq!(Category::from_id(-1), Category::Unknown);
    }

    #[test]
    fn subcategory_parent() {
        assert_eq!(Category::TvHd.parent(), Category::Tv);
        assert_eq!(Category::MovieBluRay.parent(), Category::Movies);
        assert_eq!(Category::OtherHashed.parent(), Category::Other);
        assert_eq!(Category::Tv.parent(), Category::Tv);
    }

    #[test]
    fn category_display_names() {
        assert_eq!(Category::TvHd.to_string(), "TV_HD");
        assert_eq!(Category::MovieWebDl.to_string(), "Movie_WEBDL");
        assert_eq!(Category::Other.to_string(), "Other");
    }
}
