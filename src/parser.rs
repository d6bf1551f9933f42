//! Extended shell history parsing.
//!
//! Each entry starts with a line shaped `: <unix-timestamp>:<duration>;<command>`.
//! Any following lines that do not have that shape belong to the same entry
//! (multi-line commands). The working directory is not logged, so it is
//! inferred by replaying `cd` commands from the home directory onwards.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::categorizer::{Categorizer, base_command};
use crate::error::ParseError;
use crate::types::CommandRecord;

static HISTORY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:\s*(\d+):(\d+);(.*)$").expect("history line pattern is valid")
});

/// An entry whose header has been read but whose continuation lines may still follow.
struct PendingEntry {
    timestamp: DateTime<Utc>,
    duration: u64,
    text: String,
}

enum LineKind<'l> {
    Header(PendingEntry),
    /// Header shape, but the timestamp is not representable.
    BadHeader,
    Continuation(&'l str),
}

fn classify_line(line: &str) -> LineKind<'_> {
    let Some(caps) = HISTORY_LINE.captures(line) else {
        return LineKind::Continuation(line);
    };

    let timestamp = caps[1]
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    let Some(timestamp) = timestamp else {
        return LineKind::BadHeader;
    };

    LineKind::Header(PendingEntry {
        timestamp,
        duration: caps[2].parse().unwrap_or(0),
        text: caps[3].to_string(),
    })
}

pub struct HistoryParser<'a> {
    categorizer: &'a Categorizer,
    home_dir: String,
}

impl<'a> HistoryParser<'a> {
    pub fn new(categorizer: &'a Categorizer, home_dir: impl Into<String>) -> Self {
        Self {
            categorizer,
            home_dir: home_dir.into(),
        }
    }

    pub fn home_dir(&self) -> &str {
        &self.home_dir
    }

    /// Parse a history file. Failing to open or read it is fatal.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<CommandRecord>, ParseError> {
        let file = File::open(path).map_err(|e| ParseError::source_unavailable(path, e))?;
        let reader = BufReader::with_capacity(64 * 1024, file);

        self.parse_reader(reader)
            .map_err(|e| ParseError::source_unavailable(path, e))
    }

    /// Parse history from any buffered reader.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> std::io::Result<Vec<CommandRecord>> {
        let mut state = ParseState::new(&self.home_dir);

        for line in reader.split(b'\n') {
            let bytes = line?;
            // History files are not guaranteed to be valid UTF-8.
            let line = String::from_utf8_lossy(&bytes);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            match classify_line(line) {
                LineKind::Header(entry) => {
                    self.finish(&mut state);
                    state.pending = Some(entry);
                }
                LineKind::BadHeader => {
                    self.finish(&mut state);
                    state.dropped_lines += 1;
                }
                LineKind::Continuation(text) => match state.pending.as_mut() {
                    Some(entry) => {
                        entry.text.push('\n');
                        entry.text.push_str(text);
                    }
                    None => state.dropped_lines += 1,
                },
            }
        }
        self.finish(&mut state);

        log::debug!(
            "Parsed {} history records ({} lines dropped)",
            state.records.len(),
            state.dropped_lines
        );

        Ok(state.records)
    }

    /// Emit the pending entry, if any, and apply its `cd` afterwards.
    fn finish(&self, state: &mut ParseState) {
        let Some(entry) = state.pending.take() else {
            return;
        };

        let record = CommandRecord {
            sequence_id: state.next_id,
            timestamp: entry.timestamp,
            duration: entry.duration,
            directory: state.current_dir.clone(),
            category: self.categorizer.classify(&entry.text),
            base_command: base_command(&entry.text).to_string(),
            session_id: None,
            text: entry.text,
        };

        if let Some(target) = cd_target(&record.text) {
            state.current_dir = resolve_directory(&state.current_dir, target, &self.home_dir);
        }

        state.next_id += 1;
        state.records.push(record);
    }
}

struct ParseState {
    records: Vec<CommandRecord>,
    pending: Option<PendingEntry>,
    current_dir: String,
    next_id: u64,
    dropped_lines: usize,
}

impl ParseState {
    fn new(home_dir: &str) -> Self {
        Self {
            records: Vec::new(),
            pending: None,
            current_dir: home_dir.to_string(),
            next_id: 1,
            dropped_lines: 0,
        }
    }
}

/// Parse the history file at `path` with directories tracked from `home_dir`.
pub fn parse_history_file(
    path: &Path,
    home_dir: &str,
    categorizer: &Categorizer,
) -> Result<Vec<CommandRecord>, ParseError> {
    HistoryParser::new(categorizer, home_dir).parse_file(path)
}

/// Parse history from an in-memory or streamed source.
pub fn parse_history<R: BufRead>(
    reader: R,
    home_dir: &str,
    categorizer: &Categorizer,
) -> std::io::Result<Vec<CommandRecord>> {
    HistoryParser::new(categorizer, home_dir).parse_reader(reader)
}

/// The argument of a leading `cd`, up to the first shell operator, with
/// surrounding quotes removed. `None` if the command is not a `cd`.
pub fn cd_target(command_text: &str) -> Option<&str> {
    let first_line = command_text.lines().next()?.trim_start();
    if base_command(first_line) != "cd" {
        return None;
    }

    let rest = &first_line[2..];
    let end = rest.find([';', '&', '|']).unwrap_or(rest.len());

    Some(rest[..end].trim().trim_matches(is_quote))
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Resolve a `cd` argument against the current directory.
pub fn resolve_directory(current_dir: &str, target: &str, home_dir: &str) -> String {
    let target = target.trim_matches(is_quote);

    if target.is_empty() || target == "~" {
        return home_dir.to_string();
    }
    if let Some(rest) = target.strip_prefix("~/") {
        return join_path(home_dir, rest);
    }
    if target.starts_with('/') {
        return clean_path(target);
    }
    match target {
        ".." => parent_dir(current_dir),
        "." => current_dir.to_string(),
        relative => join_path(current_dir, relative),
    }
}

/// Lexically normalize a slash-separated path: collapse repeated separators,
/// drop `.` segments and resolve `..` against preceding segments.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` at the root stays at the root.
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

pub fn join_path(base: &str, relative: &str) -> String {
    clean_path(&format!("{base}/{relative}"))
}

/// Parent of a path; the root is its own parent.
pub fn parent_dir(path: &str) -> String {
    let cleaned = clean_path(path);
    match cleaned.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => cleaned[..idx].to_string(),
        None => ".".to_string(),
    }
}
