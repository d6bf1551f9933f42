use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Local, NaiveDate, Utc};
use num_format::{Locale, ToFormattedString};

use crate::config::FormattingConfig;

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Log a warning, but only the first time this exact message is seen.
pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        log::warn!("{message}");
    }
}

#[derive(Clone)]
pub struct NumberFormatOptions {
    pub use_comma: bool,
    pub locale: String,
}

impl From<&FormattingConfig> for NumberFormatOptions {
    fn from(formatting: &FormattingConfig) -> Self {
        Self {
            use_comma: formatting.number_comma,
            locale: formatting.locale.clone(),
        }
    }
}

/// Format a count for display. Accepts both u32 and u64.
pub fn format_number(n: impl Into<u64>, options: &NumberFormatOptions) -> String {
    let n: u64 = n.into();
    let locale = match options.locale.as_str() {
        "de" => Locale::de,
        "fr" => Locale::fr,
        "es" => Locale::es,
        "it" => Locale::it,
        "ja" => Locale::ja,
        "ko" => Locale::ko,
        "zh" => Locale::zh,
        _ => Locale::en,
    };

    if options.use_comma {
        n.to_formatted_string(&locale)
    } else {
        n.to_string()
    }
}

/// Compact duration such as `45s`, `12m`, or `2h 05m`.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// A session timestamp in the user's local time zone.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_date(date: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{date}' (expected YYYY-MM-DD): {e}"))
}

#[cfg(test)]
mod tests;
