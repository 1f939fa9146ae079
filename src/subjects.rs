//! Subject parsing: raw overview subjects to cleaned names and part counts.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::patterns::PatternLibrary;
use crate::{Error, Result};

/// The logical reading of one posting subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubject {
    /// Cleaned logical name, shared by every part of the same binary
    pub name: String,
    /// This posting's position within the binary
    pub part: i32,
    /// Declared number of parts in the binary
    pub total: i32,
}

/// Turns raw subjects into cleaned names plus part counts.
///
/// Rule matches from the [`PatternLibrary`] take precedence; subjects no rule
/// covers go through a fixed sequence of generic stripping passes instead.
/// Identical input always yields identical output, which is what keeps binary
/// content hashes stable across runs.
pub struct SubjectParser {
    library: PatternLibrary,
    music_groups: Regex,
    parts: Regex,
    parts_separator: Regex,
    cleaners: Vec<Regex>,
    whitespace: Regex,
}

impl SubjectParser {
    /// Build a parser over a compiled rule library
    pub fn new(library: PatternLibrary) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::Other(format!("bad builtin pattern {}: {}", pattern, e)))
        };

        // Generic stripping passes, applied in order. Each removes one class
        // of noise: part-count tokens, quoted and bare file extensions,
        // byte-size annotations, yEnc markers.
        let cleaners = vec![
            compile(r#"(?i)[\[(\s]\d{1,5}(/|[\s_]of[\s_]|-|~)\d{1,5}([\])\s:]|$)|\s\d{1,3}\s?of\s?\d{1,3}\.?|\d{1,3}of\d{1,3}\.?|^\d{1,5}/\d{1,5}\s"#)?,
            compile(r#"(?i)([-_](proof|sample|thumbs?))*(\.part\d*(\.rar)?|\.rar|\.7z)?(\d{1,3}\.rev"|\.vol\d+\+\d+\S*"|\.[a-z0-9]{2,4}"|")"#)?,
            compile(r#"(?i)(\.part\d{1,5}|sample)?\.(7z|avi|diz|docx?|epub|idx|iso|jpg|m3u|m4a|mds|mkv|mobi|mp3|mp4|nfo|nzb|par\s?2|pdf|rar|rev|rtf|r\d\d|sfv|srs|srr|sub|txt|vol\d+\+\d+|xls|zip|z\d\d)\b"?"#)?,
            compile(r#"(?i)"?\s?-?\s?\d+([.,/]\d+)?\s?(k|m|g)?b(ytes?)?\b\s?-?(\s?yenc)?|\{\d+ yenc bytes\}|yenc \d+k?\b|\(\d+\s?(k|m|g)?b(ytes)?\)\s?yenc"#)?,
            compile(r#"(?i)/autorarpar\d{1,5}|\(\d+\)\s+yenc|\byenc\b|part\d+"#)?,
        ];

        Ok(Self {
            library,
            music_groups: compile(r"\.(flac|lossless|mp3|music|sounds)")?,
            parts: compile(r#"(?i)[\[(\s](\d{1,5})(/|[\s_]of[\s_]|-|~)(\d{1,5})([\])\s:]|$)"#)?,
            parts_separator: compile(r"(?i)[\s_]of[\s_]|[-~]")?,
            cleaners,
            whitespace: compile(r"\s\s+")?,
        })
    }

    /// Parse a subject into a cleaned name and its part counts
    ///
    /// Fails with [`Error::Subject`] when neither the matched rule nor the
    /// subject itself carries a usable part-count token; such a posting can
    /// never be assembled.
    pub fn parse(&self, group_name: &str, subject: &str) -> Result<ParsedSubject> {
        if let Some(captures) = self.library.match_subject(group_name, subject) {
            let name = name_from_captures(&captures);
            let (part, total) = captures
                .get("parts")
                .and_then(|raw| self.parse_parts_pair(raw))
                .or_else(|| self.parts_from_subject(subject))
                .ok_or_else(|| Error::Subject(subject.to_string()))?;
            return Ok(ParsedSubject { name, part, total });
        }

        let (part, total) = self
            .parts_from_subject(subject)
            .ok_or_else(|| Error::Subject(subject.to_string()))?;
        Ok(ParsedSubject {
            name: self.heuristic_clean(group_name, subject),
            part,
            total,
        })
    }

    /// Produce the cleaned logical name for a subject
    ///
    /// Rule match first, then generic stripping. This is the assembly-side
    /// entry point; [`SubjectParser::release_name`] is the promotion-side one.
    pub fn clean_name(&self, group_name: &str, subject: &str) -> String {
        if let Some(captures) = self.library.match_subject(group_name, subject) {
            return name_from_captures(&captures);
        }
        self.heuristic_clean(group_name, subject)
    }

    /// Rewrite a binary name for release, or return it unchanged
    ///
    /// Unlike [`SubjectParser::clean_name`] this never applies generic
    /// stripping: a name that no rule rewrites is already the best name the
    /// pipeline has.
    pub fn release_name(&self, group_name: &str, name: &str) -> String {
        if let Some(captures) = self.library.match_subject(group_name, name) {
            return name_from_captures(&captures);
        }
        name.to_string()
    }

    fn heuristic_clean(&self, group_name: &str, subject: &str) -> String {
        if self.music_groups.is_match(group_name) {
            return subject.trim().to_string();
        }

        let mut name = subject.to_string();
        for cleaner in &self.cleaners {
            name = cleaner.replace_all(&name, " ").into_owned();
        }
        let name = self.whitespace.replace_all(&name, " ");
        let cleaned = name.trim().to_string();
        if cleaned.is_empty() {
            debug!(subject, "subject cleaned to nothing, keeping raw");
            return subject.trim().to_string();
        }
        cleaned
    }

    /// Extract the (part, total) pair from a subject, if present
    pub fn parts_from_subject(&self, subject: &str) -> Option<(i32, i32)> {
        let captures = self.parts.captures(subject)?;
        let part: i32 = captures.get(1)?.as_str().parse().ok()?;
        let total: i32 = captures.get(3)?.as_str().parse().ok()?;
        Some((part, total))
    }

    /// Parse a captured "current/total" pair, normalizing `-`, `~` and "of"
    /// separators to `/`
    fn parse_parts_pair(&self, raw: &str) -> Option<(i32, i32)> {
        let normalized = self.parts_separator.replace(raw.trim(), "/");
        let (part, total) = normalized.split_once('/')?;
        let part: i32 = part.trim().parse().ok()?;
        let total: i32 = total.trim().parse().ok()?;
        Some((part, total))
    }
}

/// Derive a name from a rule's named captures.
///
/// A capture named "name" wins outright; a request id stands in when no name
/// capture exists; failing both, every non-bookkeeping capture is
/// concatenated in capture-name order to synthesize one.
fn name_from_captures(captures: &BTreeMap<String, String>) -> String {
    if let Some(name) = captures.get("name") {
        return name.clone();
    }
    if let Some(reqid) = captures.get("reqid") {
        return reqid.clone();
    }
    captures
        .iter()
        .filter(|(key, _)| key.as_str() != "parts")
        .map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join("")
}
