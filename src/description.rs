//! Human-readable session summaries, e.g. `project: git npm [Version Control, Build]`.
//!
//! All frequency rankings break ties by first appearance in the session so the
//! same session always gets the same description.

use std::collections::HashMap;
use std::hash::Hash;

use crate::parser::clean_path;
use crate::types::{Category, CommandRecord, Session};

pub const EMPTY_SESSION: &str = "Empty session";
const FALLBACK_ACTIVITY: &str = "work";

/// Summarize a finalized session as `"{dir}: {activity} [{categories}]"`.
pub fn describe_session(session: &Session, home_dir: &str) -> String {
    if session.commands.is_empty() {
        return EMPTY_SESSION.to_string();
    }

    let activity = extract_top_activities(&session.commands);
    let short_dir = shorten_directory(find_most_active_directory(session), home_dir);

    let categories = top_categories(session)
        .iter()
        .map(Category::display_name)
        .collect::<Vec<_>>();

    if categories.is_empty() {
        format!("{short_dir}: {activity}")
    } else {
        format!("{short_dir}: {activity} [{}]", categories.join(", "))
    }
}

/// Rank items by count, descending, keeping first-seen order among equals.
fn rank_first_seen<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> Vec<(T, usize)> {
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (idx, item) in items.into_iter().enumerate() {
        counts.entry(item).or_insert((idx, 0)).1 += 1;
    }

    let mut ranked: Vec<(T, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (first_a, count_a)), (_, (first_b, count_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .map(|(item, (_, count))| (item, count))
        .collect()
}

fn clean_base_command(base: &str) -> String {
    let lower = base.to_lowercase();
    lower
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(lower)
}

/// The dominant command, or the top two, of a run of commands.
///
/// One command is enough when it accounts for more than half of all
/// commands; a runner-up is added when it accounts for at least a fifth.
pub fn extract_top_activities(commands: &[CommandRecord]) -> String {
    let total = commands.len();
    let ranked = rank_first_seen(
        commands
            .iter()
            .map(|cmd| clean_base_command(&cmd.base_command))
            .filter(|base| !base.is_empty()),
    );

    match ranked.as_slice() {
        [] => FALLBACK_ACTIVITY.to_string(),
        [(top, count), ..] if 2 * count > total => top.clone(),
        [(top, _), (second, count), ..] if 5 * count >= total => format!("{top} {second}"),
        _ => FALLBACK_ACTIVITY.to_string(),
    }
}

/// The directory most commands ran in; ties go to the one seen first.
pub fn find_most_active_directory(session: &Session) -> &str {
    rank_first_seen(session.commands.iter().map(|cmd| cmd.directory.as_str()))
        .first()
        .map(|&(dir, _)| dir)
        .unwrap_or("")
}

/// Compact label for a directory relative to the home directory.
///
/// After stripping home, the number of remaining segments decides how many
/// trailing segments are kept: 1 → 1, 2 → 1, 3 → 2, 4 → 2, 5+ → 3.
pub fn shorten_directory(full_path: &str, home_dir: &str) -> String {
    if !home_dir.is_empty() && full_path == home_dir {
        return "~".to_string();
    }

    let cleaned = clean_path(full_path);
    let mut parts: Vec<&str> = cleaned.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return ".".to_string();
    }

    if !home_dir.is_empty() && full_path.starts_with(&format!("{home_dir}/")) {
        let home_len = clean_path(home_dir)
            .split('/')
            .filter(|p| !p.is_empty())
            .count();
        if parts.len() > home_len {
            parts.drain(..home_len);
        }
    }

    let keep = match parts.len() {
        1 | 2 => 1,
        3 | 4 => 2,
        _ => 3,
    };
    parts[parts.len() - keep..].join("/")
}

/// The top category, plus the runner-up if it covers at least a fifth of the commands.
pub fn top_categories(session: &Session) -> Vec<Category> {
    let total = session.commands.len();

    // Rank in first-seen order, using the session's own counts.
    let mut order: Vec<&Category> = Vec::new();
    for category in session
        .commands
        .iter()
        .map(|cmd| &cmd.category)
        .chain(session.categories.keys())
    {
        if !order.contains(&category) {
            order.push(category);
        }
    }
    let mut ranked: Vec<(&Category, usize)> = order
        .into_iter()
        .filter_map(|category| {
            session
                .categories
                .get(category)
                .map(|&count| (category, count))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    match ranked.as_slice() {
        [] => Vec::new(),
        [(first, _), (second, count), ..] if 5 * count >= total => {
            vec![(*first).clone(), (*second).clone()]
        }
        [(first, _), ..] => vec![(*first).clone()],
    }
}

#[cfg(test)]
mod tests;
