//! Whitespace-delimited log line parsing
//!
//! Turns raw log text into an ordered [`ParsedLogSet`]. The expected line shape is:
//!
//! ```text
//! <TIMESTAMP> <LEVEL> <MODULE> <MESSAGE...>
//! ```
//!
//! The parser is tolerant: blank lines and lines with fewer than four
//! whitespace-delimited tokens are skipped without error. The only failure is
//! a source that cannot be read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hash;

/// Minimum number of whitespace-delimited tokens a line needs to become a record
pub const MIN_FIELDS: usize = 4;

/// Error raised when the log source itself cannot be read
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read log source: {0}")]
    Io(#[from] std::io::Error),
}

/// A single parsed log line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogRecord {
    /// First token of the line, stored verbatim
    pub timestamp: String,
    /// Second token, stored verbatim (not validated)
    pub level: String,
    /// Third token, stored verbatim
    pub module: String,
    /// Remaining tokens joined by a single space
    pub message: String,
    /// Digest of the raw tokens when the line was not valid UTF-8, since the
    /// decoded fields no longer tell such lines apart
    #[serde(skip)]
    raw_digest: Option<String>,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        level: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: level.into(),
            module: module.into(),
            message: message.into(),
            raw_digest: None,
        }
    }

    /// Content digest used as the row-level dedup key
    pub fn row_hash(&self) -> String {
        match &self.raw_digest {
            Some(digest) => digest.clone(),
            None => hash::row_digest(&self.timestamp, &self.level, &self.module, &self.message),
        }
    }
}

/// Ordered records parsed from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLogSet {
    source: Option<String>,
    records: Vec<LogRecord>,
}

impl ParsedLogSet {
    fn new(source: Option<String>) -> Self {
        Self {
            source,
            records: Vec::new(),
        }
    }

    /// Name of the file or buffer the records came from, if known
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    fn push_line(&mut self, line: &str) {
        match parse_line(line) {
            Some(record) => self.records.push(record),
            None => skipped(line),
        }
    }

    fn push_raw_line(&mut self, line: &[u8]) {
        match std::str::from_utf8(line) {
            Ok(text) => self.push_line(text),
            Err(_) => match parse_raw_line(line) {
                Some(record) => self.records.push(record),
                None => skipped(&String::from_utf8_lossy(line)),
            },
        }
    }
}

impl std::fmt::Display for ParsedLogSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LogFile('{}') | Records: {}",
            self.source.as_deref().unwrap_or("<buffer>"),
            self.records.len()
        )
    }
}

impl<'a> IntoIterator for &'a ParsedLogSet {
    type Item = &'a LogRecord;
    type IntoIter = std::slice::Iter<'a, LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for ParsedLogSet {
    type Item = LogRecord;
    type IntoIter = std::vec::IntoIter<LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Parse a single physical line
///
/// Returns `None` for blank lines and lines with fewer than [`MIN_FIELDS`] tokens.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let mut parts = line.split_whitespace();
    let timestamp = parts.next()?;
    let level = parts.next()?;
    let module = parts.next()?;

    let message = parts.collect::<Vec<_>>().join(" ");
    if message.is_empty() {
        return None;
    }

    Some(LogRecord::new(timestamp, level, module, message))
}

/// Parse a line that is not valid UTF-8
///
/// Fields are decoded lossily for display while the row digest is taken over
/// the original bytes, so lines differing only in invalid bytes stay distinct.
fn parse_raw_line(line: &[u8]) -> Option<LogRecord> {
    let mut parts = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());
    let timestamp = parts.next()?;
    let level = parts.next()?;
    let module = parts.next()?;

    let message = parts.collect::<Vec<_>>().join(&b' ');
    if message.is_empty() {
        return None;
    }

    let mut record = LogRecord::new(
        String::from_utf8_lossy(timestamp),
        String::from_utf8_lossy(level),
        String::from_utf8_lossy(module),
        String::from_utf8_lossy(&message),
    );
    record.raw_digest = Some(hash::row_digest_bytes([
        timestamp,
        level,
        module,
        message.as_slice(),
    ]));
    Some(record)
}

fn skipped(line: &str) {
    if !line.trim().is_empty() {
        tracing::debug!(
            "Skipping malformed line (expected >={} parts): {:?}",
            MIN_FIELDS,
            line
        );
    }
}

/// Parse an already decoded text blob
pub fn parse_str(content: &str) -> ParsedLogSet {
    let mut set = ParsedLogSet::new(None);
    for line in content.lines() {
        set.push_line(line);
    }
    set
}

/// Parse a raw byte buffer
///
/// Invalid UTF-8 sequences are replaced rather than rejected, so a stray
/// binary byte only affects the line it appears in.
pub fn parse_bytes(content: &[u8]) -> ParsedLogSet {
    let mut set = ParsedLogSet::new(None);
    for line in content.split(|&b| b == b'\n') {
        set.push_raw_line(line.strip_suffix(b"\r").unwrap_or(line));
    }
    set
}

/// Parse lines from a buffered reader
pub fn parse_reader<R: BufRead>(mut reader: R) -> Result<ParsedLogSet, ParseError> {
    let mut set = ParsedLogSet::new(None);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        set.push_raw_line(line.strip_suffix(b"\r").unwrap_or(line));
    }

    Ok(set)
}

/// Parse a log file from disk
pub fn parse_file(path: &Path) -> Result<ParsedLogSet, ParseError> {
    let file = File::open(path)?;
    let mut set = parse_reader(BufReader::new(file))?;
    set.source = Some(path.display().to_string());
    Ok(set)
}

/// Name a parsed set after its origin
pub fn with_source(mut set: ParsedLogSet, source: impl Into<String>) -> ParsedLogSet {
    set.source = Some(source.into());
    set
}
