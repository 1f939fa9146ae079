//! Line-based NNTP wire client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::config::ServerConfig;
use crate::types::RawPosting;
use crate::{Error, Result};

use super::{GroupStatus, OverviewSource};

/// NNTP client speaking the overview subset of RFC 3977.
///
/// One client is one connection. Callers that scan groups in parallel open
/// one client per worker.
pub struct NntpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl NntpClient {
    /// Connect and authenticate against a server
    pub async fn connect(server: &ServerConfig) -> Result<Self> {
        let stream = TcpStream::connect(server.address())
            .await
            .map_err(|e| Error::Nntp(format!("connect to {} failed: {}", server.address(), e)))?;
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        // Server speaks first: 200 (posting allowed) or 201 (read only)
        let greeting = client.read_response().await?;
        if !greeting.starts_with("200") && !greeting.starts_with("201") {
            return Err(Error::Nntp(format!("unexpected greeting: {}", greeting)));
        }
        debug!(server = %server.host, "connected to news server");

        if let (Some(username), Some(password)) = (&server.username, &server.password) {
            client.authenticate(username, password).await?;
        }

        Ok(client)
    }

    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let response = self
            .command(&format!("AUTHINFO USER {}", username))
            .await?;
        if response.starts_with("281") {
            return Ok(());
        }
        if !response.starts_with("381") {
            return Err(Error::Nntp(format!("authentication refused: {}", response)));
        }

        let response = self
            .command(&format!("AUTHINFO PASS {}", password))
            .await?;
        if !response.starts_with("281") {
            return Err(Error::Nntp(format!("authentication failed: {}", response)));
        }
        debug!("authenticated");
        Ok(())
    }

    async fn command(&mut self, line: &str) -> Result<String> {
        trace!(command = %line.split(' ').next().unwrap_or(line), "sending command");
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .map_err(|e| Error::Nntp(format!("write failed: {}", e)))?;
        self.read_response().await
    }

    async fn read_response(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| Error::Nntp(format!("read failed: {}", e)))?;
        if n == 0 {
            return Err(Error::Nntp("connection closed by server".to_string()));
        }
        Ok(line.trim_end().to_string())
    }

    /// Read a dot-terminated multiline block, undoing dot-stuffing
    async fn read_multiline(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| Error::Nntp(format!("read failed: {}", e)))?;
            if n == 0 {
                return Err(Error::Nntp(
                    "connection closed mid-response".to_string(),
                ));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line == "." {
                break;
            }
            // A leading ".." is dot-stuffing for a literal dot
            match line.strip_prefix("..") {
                Some(rest) => lines.push(format!(".{}", rest)),
                None => lines.push(line.to_string()),
            }
        }
        Ok(lines)
    }
}

/// Parse a "211 count low high name" GROUP response.
fn parse_group_response(response: &str) -> Result<GroupStatus> {
    let mut fields = response.split_whitespace();
    let code = fields.next().unwrap_or("");
    if code != "211" {
        return Err(Error::Nntp(format!("group selection failed: {}", response)));
    }
    let mut next_i64 = |what: &str| -> Result<i64> {
        fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| Error::Nntp(format!("malformed GROUP response ({}): {}", what, response)))
    };
    let count = next_i64("count")?;
    let low = next_i64("low")?;
    let high = next_i64("high")?;
    Ok(GroupStatus { low, high, count })
}

/// Parse one tab-separated overview line.
///
/// Field order per RFC 2980: number, subject, from, date, message-id,
/// references, bytes, lines, then optional extras (Xref). Lines that do not
/// parse are dropped rather than failing the whole fetch; damaged overview
/// entries are routine on real spools.
fn parse_overview_line(line: &str) -> Option<RawPosting> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return None;
    }
    let number: i64 = fields[0].parse().ok()?;
    let date = parse_overview_date(fields[3])?;
    let bytes: i64 = fields[6].trim().parse().unwrap_or(0);
    let xref = fields
        .get(8)
        .map(|f| f.trim_start_matches("Xref: ").to_string())
        .unwrap_or_default();

    Some(RawPosting {
        number,
        subject: fields[1].to_string(),
        poster: fields[2].to_string(),
        bytes,
        message_id: fields[4].to_string(),
        date,
        xref,
    })
}

/// Parse the Date header variants seen in overview data.
fn parse_overview_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Some servers omit the day-of-week or use two-digit years; retry with
    // the comma section stripped
    if let Some((_, rest)) = raw.split_once(", ") {
        if let Ok(parsed) = DateTime::parse_from_rfc2822(rest) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    None
}

#[async_trait]
impl OverviewSource for NntpClient {
    async fn select_group(&mut self, name: &str) -> Result<GroupStatus> {
        let response = self.command(&format!("GROUP {}", name)).await?;
        parse_group_response(&response)
    }

    async fn fetch_overview(&mut self, begin: i64, end: i64) -> Result<Vec<RawPosting>> {
        let response = self.command(&format!("XOVER {}-{}", begin, end)).await?;
        if response.starts_with("423") || response.starts_with("420") {
            // No articles in that range
            return Ok(Vec::new());
        }
        if !response.starts_with("224") {
            return Err(Error::Nntp(format!("overview fetch failed: {}", response)));
        }

        let lines = self.read_multiline().await?;
        let postings: Vec<RawPosting> = lines
            .iter()
            .filter_map(|line| parse_overview_line(line))
            .collect();
        trace!(begin, end, received = postings.len(), "fetched overview range");
        Ok(postings)
    }

    async fn quit(&mut self) -> Result<()> {
        // Best effort; the server may already have dropped us
        let _ = self.command("QUIT").await;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_response() {
        let status = parse_group_response("211 1234 3000234 3002322 misc.test").unwrap();
        assert_eq!(status.count, 1234);
        assert_eq!(status.low, 3000234);
        assert_eq!(status.high, 3002322);
    }

    #[test]
    fn test_parse_group_response_rejects_errors() {
        assert!(parse_group_response("411 no such group").is_err());
        assert!(parse_group_response("211 garbage").is_err());
    }

    #[test]
    fn test_parse_overview_line() {
        let line = "3000235\tShow.S01E01 [1/3]\tposter@example.com\tMon, 23 Jun 2025 10:01:02 +0000\t<abc@news>\t\t752000\t5893\tXref: news.example.com alt.binaries.teevee:3000235";
        let posting = parse_overview_line(line).unwrap();
        assert_eq!(posting.number, 3000235);
        assert_eq!(posting.subject, "Show.S01E01 [1/3]");
        assert_eq!(posting.poster, "poster@example.com");
        assert_eq!(posting.bytes, 752000);
        assert_eq!(posting.message_id, "<abc@news>");
        assert_eq!(posting.xref, "news.example.com alt.binaries.teevee:3000235");
    }

    #[test]
    fn test_parse_overview_line_drops_garbage() {
        assert!(parse_overview_line("not enough fields").is_none());
        assert!(parse_overview_line("abc\tsubject\tposter\tbad date\t<id>\t\t100").is_none());
    }

    #[test]
    fn test_parse_overview_date_variants() {
        assert!(parse_overview_date("Mon, 23 Jun 2025 10:01:02 +0000").is_some());
        assert!(parse_overview_date("23 Jun 2025 10:01:02 GMT").is_some());
        assert!(parse_overview_date("never").is_none());
    }
}
