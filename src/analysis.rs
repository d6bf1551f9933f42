//! Read-only queries over parsed records and sessions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::types::{Category, CommandRecord, Session};

/// Criteria for selecting sessions. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Sessions starting before this day (00:00 UTC) are excluded.
    pub start_date: Option<NaiveDate>,
    /// Sessions ending after the end of this day are excluded.
    pub end_date: Option<NaiveDate>,
    /// Category label the session must contain. `"all"` matches everything.
    pub category: Option<String>,
    /// Case-insensitive text to find in the description or any command.
    pub keyword: Option<String>,
    pub order: SortOrder,
}

/// Order of a session listing. Newest first unless asked otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{other}' (expected asc or desc)")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(start) = self.start_date
            && session.start_time.naive_utc() < start.and_time(chrono::NaiveTime::MIN)
        {
            return false;
        }

        if let Some(end) = self.end_date
            && session.end_time.naive_utc() > end.and_time(chrono::NaiveTime::MIN) + Duration::days(1)
        {
            return false;
        }

        if let Some(category) = self.category.as_deref()
            && category != "all"
            && !session.has_category(category)
        {
            return false;
        }

        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            let keyword = keyword.to_lowercase();
            let found = session.description.to_lowercase().contains(&keyword)
                || session
                    .commands
                    .iter()
                    .any(|cmd| cmd.text.to_lowercase().contains(&keyword));
            if !found {
                return false;
            }
        }

        true
    }
}

/// Sessions matching `filter`, in the filter's order. Input is oldest first.
pub fn filter_sessions<'a>(sessions: &'a [Session], filter: &SessionFilter) -> Vec<&'a Session> {
    let mut selected: Vec<&Session> = sessions.iter().filter(|s| filter.matches(s)).collect();
    if filter.order == SortOrder::Desc {
        selected.reverse();
    }
    selected
}

/// Records whose command text or directory contains `query`, ignoring case.
/// An empty query matches nothing.
pub fn search_commands<'a>(records: &'a [CommandRecord], query: &str) -> Vec<&'a CommandRecord> {
    if query.is_empty() {
        return Vec::new();
    }

    let query = query.to_lowercase();
    records
        .iter()
        .filter(|record| {
            record.text.to_lowercase().contains(&query)
                || record.directory.to_lowercase().contains(&query)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub count: usize,
}

/// Commands per calendar day in `tz`, oldest day first. Days without
/// commands are left out.
pub fn daily_volume<Tz: TimeZone>(records: &[CommandRecord], tz: &Tz) -> Vec<DailyVolume> {
    let mut volume: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        let date = record.timestamp.with_timezone(tz).date_naive();
        *volume.entry(date).or_default() += 1;
    }

    volume
        .into_iter()
        .map(|(date, count)| DailyVolume { date, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_commands: usize,
    pub total_sessions: usize,
    pub categories: BTreeMap<Category, usize>,
}

/// Totals over the whole history. Category counts include commands of
/// discarded runs, since they come from the records, not the sessions.
pub fn compute_stats(records: &[CommandRecord], sessions: &[Session]) -> HistoryStats {
    let mut categories = BTreeMap::new();
    for record in records {
        *categories.entry(record.category.clone()).or_default() += 1;
    }

    HistoryStats {
        total_commands: records.len(),
        total_sessions: sessions.len(),
        categories,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPattern {
    pub command: String,
    pub count: usize,
    pub categories: BTreeMap<Category, usize>,
    /// Number of sessions in which each other base command also appears.
    pub co_occurrence: BTreeMap<String, usize>,
}

/// Per-base-command usage and co-occurrence within sessions.
pub fn command_patterns(
    records: &[CommandRecord],
    sessions: &[Session],
) -> BTreeMap<String, CommandPattern> {
    let mut patterns: BTreeMap<String, CommandPattern> = BTreeMap::new();

    for record in records {
        let pattern = patterns
            .entry(record.base_command.clone())
            .or_insert_with(|| CommandPattern {
                command: record.base_command.clone(),
                count: 0,
                categories: BTreeMap::new(),
                co_occurrence: BTreeMap::new(),
            });
        pattern.count += 1;
        *pattern.categories.entry(record.category.clone()).or_default() += 1;
    }

    for session in sessions {
        let present: BTreeSet<&str> = session
            .commands
            .iter()
            .map(|cmd| cmd.base_command.as_str())
            .collect();

        for &cmd in &present {
            let Some(pattern) = patterns.get_mut(cmd) else {
                continue;
            };
            for &other in present.iter().filter(|&&other| other != cmd) {
                *pattern.co_occurrence.entry(other.to_string()).or_default() += 1;
            }
        }
    }

    patterns
}

/// Patterns ordered by count descending, then by command name.
pub fn top_patterns(patterns: &BTreeMap<String, CommandPattern>, limit: usize) -> Vec<&CommandPattern> {
    let mut ranked: Vec<&CommandPattern> = patterns.values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.command.cmp(&b.command)));
    ranked.truncate(limit);
    ranked
}
