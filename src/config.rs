use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use crate::segmenter::SegmentConfig;
use crate::types::CategoryRule;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub sessions: SessionsConfig,
    pub formatting: FormattingConfig,
    /// User category rules, highest priority first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// History log to read. Empty means `~/.zsh_history`.
    pub file: String,
    /// Directory that bare `cd` returns to. Empty means the user's home.
    pub home_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SessionsConfig {
    pub timeout_minutes: u32,
    pub directory_change_breaks_session: bool,
    pub category_change_threshold: usize,
    pub min_commands_per_session: usize,
    pub max_session_duration_minutes: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FormattingConfig {
    pub number_comma: bool,
    pub locale: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
            directory_change_breaks_session: false,
            category_change_threshold: 0,
            min_commands_per_session: 1,
            max_session_duration_minutes: 0,
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            number_comma: false,
            locale: "en".to_string(),
        }
    }
}

thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".shell-sessions.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    /// The directory `cd` resolves against, falling back to the user's home.
    pub fn home_dir(&self) -> Result<String> {
        if !self.history.home_dir.is_empty() {
            return Ok(self.history.home_dir.clone());
        }

        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.to_string_lossy().into_owned())
    }

    /// The configured history file, or `~/.zsh_history`.
    pub fn history_path(&self) -> Result<PathBuf> {
        if !self.history.file.is_empty() {
            return Ok(expand_home(&self.history.file));
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".zsh_history"))
    }

    pub fn segment_config(&self) -> Result<SegmentConfig> {
        let sessions = &self.sessions;
        let max_session_duration = (sessions.max_session_duration_minutes > 0)
            .then(|| Duration::minutes(sessions.max_session_duration_minutes.into()));

        Ok(SegmentConfig {
            session_timeout: Duration::minutes(sessions.timeout_minutes.into()),
            directory_change_breaks_session: sessions.directory_change_breaks_session,
            category_change_threshold: sessions.category_change_threshold,
            min_commands_per_session: sessions.min_commands_per_session,
            max_session_duration,
            home_dir: self.home_dir()?,
        })
    }

    pub fn category_rules(&self) -> &[CategoryRule] {
        &self.categories
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .context("Invalid boolean value. Use 'true' or 'false'")
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Tune session detection with:");
        println!("   shell-sessions config set timeout-minutes 45");
        println!("or edit");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            let or_default = |value: &str| {
                if value.is_empty() {
                    "(default)".to_string()
                } else {
                    value.to_string()
                }
            };

            println!("🔧 Current configuration:");
            println!("   History File: {}", or_default(&config.history.file));
            println!("   Home Dir: {}", or_default(&config.history.home_dir));
            println!("   Timeout Minutes: {}", config.sessions.timeout_minutes);
            println!(
                "   Directory Change Breaks Session: {}",
                config.sessions.directory_change_breaks_session
            );
            println!(
                "   Category Change Threshold: {}",
                config.sessions.category_change_threshold
            );
            println!(
                "   Min Commands Per Session: {}",
                config.sessions.min_commands_per_session
            );
            println!(
                "   Max Session Duration Minutes: {}",
                config.sessions.max_session_duration_minutes
            );
            println!("   Category Rules: {}", config.categories.len());
            for rule in &config.categories {
                println!("     {} = {}", rule.category, rule.pattern);
            }
            println!("   Number Comma: {}", config.formatting.number_comma);
            println!("   Locale: {}", config.formatting.locale);
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'shell-sessions config init' to create one.");
        }
    }
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();

    match key {
        "history-file" => config.history.file = value.to_string(),
        "home-dir" => config.history.home_dir = value.to_string(),
        "timeout-minutes" => {
            config.sessions.timeout_minutes =
                value.parse::<u32>().context("Invalid number value")?;
        }
        "directory-change-breaks-session" => {
            config.sessions.directory_change_breaks_session = parse_bool(value)?;
        }
        "category-change-threshold" => {
            config.sessions.category_change_threshold =
                value.parse::<usize>().context("Invalid number value")?;
        }
        "min-commands-per-session" => {
            config.sessions.min_commands_per_session =
                value.parse::<usize>().context("Invalid number value")?;
        }
        "max-session-duration-minutes" => {
            config.sessions.max_session_duration_minutes =
                value.parse::<u32>().context("Invalid number value")?;
        }
        "number-comma" => config.formatting.number_comma = parse_bool(value)?,
        "locale" => config.formatting.locale = value.to_string(),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    config.save(false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_config() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join(".shell-sessions.toml");
        set_test_config_path(config_path.clone());
        (dir, config_path)
    }

    #[test]
    fn missing_file_loads_as_none() {
        let (_dir, _path) = setup_test_config();
        assert!(Config::load().expect("load config").is_none());
    }

    #[test]
    fn default_config_round_trip() {
        let (_dir, _path) = setup_test_config();
        create_default_config(true).expect("create_default_config");

        let loaded = Config::load()
            .expect("load config")
            .expect("config should exist");

        assert_eq!(loaded, Config::default());
        assert_eq!(loaded.sessions.timeout_minutes, 30);
        assert_eq!(loaded.sessions.min_commands_per_session, 1);
        assert_eq!(loaded.formatting.locale, "en");
        assert!(loaded.categories.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let (_dir, path) = setup_test_config();
        fs::write(
            &path,
            r#"
[sessions]
timeout_minutes = 10

[[categories]]
category = "deploy"
pattern = "^deploy\\s"

[[categories]]
category = "my-git"
pattern = "^git\\s"
"#,
        )
        .expect("write config");

        let cfg = Config::load()
            .expect("load config")
            .expect("config should exist");

        assert_eq!(cfg.sessions.timeout_minutes, 10);
        assert!(!cfg.sessions.directory_change_breaks_session);
        assert_eq!(cfg.formatting, FormattingConfig::default());
        assert_eq!(
            cfg.category_rules(),
            &[
                CategoryRule::new("deploy", r"^deploy\s"),
                CategoryRule::new("my-git", r"^git\s"),
            ]
        );
    }

    #[test]
    fn segment_config_conversion() {
        let mut cfg = Config::default();
        cfg.history.home_dir = "/home/u".to_string();
        cfg.sessions.timeout_minutes = 15;
        cfg.sessions.category_change_threshold = 3;
        cfg.sessions.min_commands_per_session = 2;

        let segment = cfg.segment_config().expect("segment config");
        assert_eq!(segment.session_timeout, Duration::minutes(15));
        assert_eq!(segment.category_change_threshold, 3);
        assert_eq!(segment.min_commands_per_session, 2);
        assert_eq!(segment.max_session_duration, None);
        assert_eq!(segment.home_dir, "/home/u");

        cfg.sessions.max_session_duration_minutes = 120;
        let segment = cfg.segment_config().expect("segment config");
        assert_eq!(segment.max_session_duration, Some(Duration::minutes(120)));
    }

    #[test]
    fn history_path_override() {
        let mut cfg = Config::default();
        cfg.history.file = "/var/log/history".to_string();
        assert_eq!(
            cfg.history_path().expect("history path"),
            PathBuf::from("/var/log/history")
        );
    }

    #[test]
    fn set_config_value_behaviour() {
        let (_dir, _path) = setup_test_config();

        create_default_config(true).expect("create_default_config");

        set_config_value("history-file", "/tmp/hist").expect("set history-file");
        set_config_value("home-dir", "/home/u").expect("set home-dir");
        set_config_value("timeout-minutes", "45").expect("set timeout-minutes");
        set_config_value("directory-change-breaks-session", "true")
            .expect("set directory-change-breaks-session");
        set_config_value("category-change-threshold", "4").expect("set category-change-threshold");
        set_config_value("min-commands-per-session", "2").expect("set min-commands-per-session");
        set_config_value("max-session-duration-minutes", "240")
            .expect("set max-session-duration-minutes");
        set_config_value("number-comma", "true").expect("set number-comma");
        set_config_value("locale", "de").expect("set locale");

        let cfg = Config::load()
            .expect("load config")
            .expect("config should exist");

        assert_eq!(cfg.history.file, "/tmp/hist");
        assert_eq!(cfg.history.home_dir, "/home/u");
        assert_eq!(cfg.sessions.timeout_minutes, 45);
        assert!(cfg.sessions.directory_change_breaks_session);
        assert_eq!(cfg.sessions.category_change_threshold, 4);
        assert_eq!(cfg.sessions.min_commands_per_session, 2);
        assert_eq!(cfg.sessions.max_session_duration_minutes, 240);
        assert!(cfg.formatting.number_comma);
        assert_eq!(cfg.formatting.locale, "de");

        let err = set_config_value("unknown-key", "value").unwrap_err();
        let msg = format!("{err}");
        assert!(
            msg.contains("Unknown config key"),
            "unexpected error message: {msg}"
        );
        let err = set_config_value("number-comma", "not-a-bool").unwrap_err();
        let msg = format!("{err}");
        assert!(
            msg.contains("Invalid boolean value"),
            "unexpected error message: {msg}"
        );
        let err = set_config_value("timeout-minutes", "soon").unwrap_err();
        assert!(format!("{err}").contains("Invalid number value"));
    }
}
