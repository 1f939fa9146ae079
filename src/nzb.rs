//! NZB manifest writer.
//!
//! Produces the newzBin 1.1 document downstream download clients consume.
//! The byte-level shape is compatibility-sensitive: fixed declaration and
//! DOCTYPE lines, two-space indent, files ordered by subject and segments by
//! number, so the same binary always encodes to the same bytes.

use std::fmt::Write;

/// One file entry of a manifest, usually built from a part row plus its
/// segment rows.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    /// Original posting subject
    pub subject: String,
    /// Posting author
    pub poster: String,
    /// Post date as epoch seconds
    pub posted: i64,
    /// Group the posting appeared in
    pub group: String,
    /// Segments carrying the file's data
    pub segments: Vec<ManifestSegment>,
}

/// One segment entry of a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestSegment {
    /// Sequence number within the file
    pub number: i32,
    /// Segment payload size in bytes
    pub size_bytes: i64,
    /// Article message-id, with or without angle brackets
    pub message_id: String,
}

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE nzb PUBLIC \"-//newzBin//DTD NZB 1.1//EN\" \"http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd\">\n";

/// Encode a manifest document.
///
/// Input order does not matter; files are sorted by subject and segments by
/// number before writing.
pub fn write_nzb(name: &str, category: &str, files: &[ManifestFile]) -> String {
    let mut files: Vec<ManifestFile> = files.to_vec();
    files.sort_by(|a, b| a.subject.cmp(&b.subject));
    for file in &mut files {
        file.segments.sort_by_key(|s| s.number);
    }

    let mut out = String::with_capacity(1024);
    out.push_str(HEADER);
    out.push_str("<nzb xmlns=\"http://www.newzbin.com/DTD/2003/nzb\">\n");
    out.push_str("  <head>\n");
    let _ = writeln!(out, "    <meta type=\"category\">{}</meta>", escape(category));
    let _ = writeln!(out, "    <meta type=\"name\">{}</meta>", escape(name));
    out.push_str("  </head>\n");

    for file in &files {
        let _ = writeln!(
            out,
            "  <file poster=\"{}\" date=\"{}\" subject=\"{}\">",
            escape(&file.poster),
            file.posted,
            escape(&file.subject)
        );
        out.push_str("    <groups>\n");
        let _ = writeln!(out, "      <group>{}</group>", escape(&file.group));
        out.push_str("    </groups>\n");
        out.push_str("    <segments>\n");
        for segment in &file.segments {
            let message_id = segment
                .message_id
                .trim_start_matches('<')
                .trim_end_matches('>');
            let _ = writeln!(
                out,
                "      <segment bytes=\"{}\" number=\"{}\">{}</segment>",
                segment.size_bytes,
                segment.number,
                escape(message_id)
            );
        }
        out.push_str("    </segments>\n");
        out.push_str("  </file>\n");
    }

    out.push_str("</nzb>\n");
    out
}

/// Escape text for use in XML content and attribute values.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
