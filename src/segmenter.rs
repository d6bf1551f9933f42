//! Single-pass session segmentation.
//!
//! Adjacent records are compared with four break heuristics, evaluated in
//! priority order and short-circuiting on the first that fires:
//!
//! 1. idle gap longer than the session timeout (always on)
//! 2. move to an unrelated directory (opt-in)
//! 3. a run of consecutive category changes (opt-in, threshold > 0)
//! 4. session longer than a maximum duration (opt-in, cap > 0)
//!
//! Runs shorter than the configured minimum are discarded, not merged.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::description::describe_session;
use crate::parser::parent_dir;
use crate::types::{Category, CommandRecord, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    pub session_timeout: Duration,
    pub directory_change_breaks_session: bool,
    /// Consecutive category changes that end a session. 0 disables.
    pub category_change_threshold: usize,
    /// Runs with fewer commands are dropped. Values below 1 behave as 1.
    pub min_commands_per_session: usize,
    /// Hard cap on session length. `None` disables.
    pub max_session_duration: Option<Duration>,
    /// Used to shorten directories in session descriptions.
    pub home_dir: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::minutes(30),
            directory_change_breaks_session: false,
            category_change_threshold: 0,
            min_commands_per_session: 1,
            max_session_duration: None,
            home_dir: String::new(),
        }
    }
}

impl SegmentConfig {
    fn min_commands(&self) -> usize {
        self.min_commands_per_session.max(1)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    Timeout,
    DirectoryChange,
    CategoryShift,
    MaxDuration,
}

/// In-progress session accumulator.
struct SessionBuilder {
    id: u32,
    start_time: DateTime<Utc>,
    commands: Vec<CommandRecord>,
    directories: Vec<String>,
    categories: BTreeMap<Category, usize>,
}

impl SessionBuilder {
    fn new(id: u32, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            commands: Vec::new(),
            directories: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    fn push(&mut self, record: &mut CommandRecord) {
        record.session_id = Some(self.id);

        if !self.directories.contains(&record.directory) {
            self.directories.push(record.directory.clone());
        }
        *self.categories.entry(record.category.clone()).or_default() += 1;
        self.commands.push(record.clone());
    }

    fn finish(self, home_dir: &str) -> Option<Session> {
        let end_time = self.commands.last()?.timestamp;

        let mut session = Session {
            id: self.id,
            start_time: self.start_time,
            end_time,
            duration_secs: (end_time - self.start_time).num_seconds(),
            commands: self.commands,
            directories: self.directories,
            categories: self.categories,
            description: String::new(),
        };
        session.description = describe_session(&session, home_dir);

        Some(session)
    }
}

/// Tracks consecutive category changes for the category-shift heuristic.
#[derive(Default)]
struct CategoryRun {
    last: Option<Category>,
    changes: usize,
}

impl CategoryRun {
    /// Record `category` and report whether the run has reached `threshold`.
    fn observe(&mut self, category: &Category, threshold: usize) -> bool {
        match &self.last {
            Some(last) if last != category => self.changes += 1,
            _ => self.changes = 0,
        }
        self.changes >= threshold
    }

    fn remember(&mut self, category: &Category) {
        self.last = Some(category.clone());
    }

    fn reset(&mut self) {
        self.changes = 0;
    }
}

/// Evaluate the break heuristics for `current` given the record before it.
fn check_break(
    previous: &CommandRecord,
    current: &CommandRecord,
    session_start: DateTime<Utc>,
    category_run: &mut CategoryRun,
    config: &SegmentConfig,
) -> Option<BreakReason> {
    if current.timestamp - previous.timestamp > config.session_timeout {
        return Some(BreakReason::Timeout);
    }

    if config.directory_change_breaks_session
        && !is_related_directory(&previous.directory, &current.directory)
    {
        return Some(BreakReason::DirectoryChange);
    }

    if config.category_change_threshold > 0
        && category_run.observe(&current.category, config.category_change_threshold)
    {
        return Some(BreakReason::CategoryShift);
    }

    if let Some(max_duration) = config.max_session_duration
        && current.timestamp - session_start > max_duration
    {
        return Some(BreakReason::MaxDuration);
    }

    None
}

/// Partition chronologically ordered records into sessions.
///
/// Every record gets `session_id` set to the session it was folded into,
/// including records of runs that are later discarded for being too short.
/// Session ids are `emitted_so_far + 1` at the moment a session is opened.
pub fn segment_sessions(records: &mut [CommandRecord], config: &SegmentConfig) -> Vec<Session> {
    let mut sessions = Vec::new();
    let Some(first) = records.first() else {
        return sessions;
    };

    let mut current = SessionBuilder::new(1, first.timestamp);
    let mut category_run = CategoryRun::default();

    for i in 0..records.len() {
        if i > 0 {
            let reason = check_break(
                &records[i - 1],
                &records[i],
                current.start_time,
                &mut category_run,
                config,
            );

            if let Some(reason) = reason {
                let finished = std::mem::replace(
                    &mut current,
                    SessionBuilder::new(0, records[i].timestamp),
                );
                emit(finished, reason, config, &mut sessions);
                current.id = sessions.len() as u32 + 1;
                category_run.reset();
            }
        }

        category_run.remember(&records[i].category);
        current.push(&mut records[i]);
    }

    if current.commands.len() >= config.min_commands() {
        sessions.extend(current.finish(&config.home_dir));
    } else {
        log::debug!(
            "Discarding trailing session {} with {} commands",
            current.id,
            current.commands.len()
        );
    }

    sessions
}

fn emit(
    finished: SessionBuilder,
    reason: BreakReason,
    config: &SegmentConfig,
    sessions: &mut Vec<Session>,
) {
    if finished.commands.len() < config.min_commands() {
        log::debug!(
            "Discarding session {} with {} commands (break: {:?})",
            finished.id,
            finished.commands.len(),
            reason
        );
        return;
    }

    sessions.extend(finished.finish(&config.home_dir));
}

/// Two directories are related when they are equal, one contains the other,
/// or they are siblings.
pub fn is_related_directory(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    let is_within = |child: &str, parent: &str| {
        child
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('/'))
    };
    if is_within(a, b) || is_within(b, a) {
        return true;
    }

    parent_dir(a) == parent_dir(b)
}
