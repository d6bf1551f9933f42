use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use shell_sessions::analysis::{self, SessionFilter, SortOrder};
use shell_sessions::categorizer::Categorizer;
use shell_sessions::config::{self, Config};
use shell_sessions::logging;
use shell_sessions::parser::parse_history_file;
use shell_sessions::segmenter::segment_sessions;
use shell_sessions::types::{CommandRecord, RuleOrigin, Session};
use shell_sessions::utils::{self, NumberFormatOptions};

#[derive(Parser)]
#[command(name = "shell-sessions")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// History file to read instead of the configured one
    #[arg(long, global = true)]
    history: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected work sessions (default)
    Sessions(SessionsArgs),
    /// Find commands whose text or directory contains a string
    Search {
        /// Text to look for (case-insensitive)
        query: String,

        #[command(flatten)]
        output: JsonArgs,
    },
    /// Show how many commands were run on each day
    Volume(JsonArgs),
    /// Show command and category totals
    Stats(JsonArgs),
    /// Show the most used commands and what they are used with
    Patterns(PatternsArgs),
    /// Print the category a command line falls into
    Classify {
        /// Command line to classify
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args, Default)]
struct SessionsArgs {
    /// Only sessions starting on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = utils::parse_date)]
    from: Option<NaiveDate>,

    /// Only sessions ending on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = utils::parse_date)]
    to: Option<NaiveDate>,

    /// Only sessions containing this category label (e.g. version-control)
    #[arg(long)]
    category: Option<String>,

    /// Only sessions whose description or commands contain this text
    #[arg(long)]
    keyword: Option<String>,

    /// Listing order: asc (oldest first) or desc (newest first)
    #[arg(long, default_value_t = SortOrder::Desc)]
    sort: SortOrder,

    /// List each session's commands
    #[arg(long, default_value_t = false)]
    commands: bool,

    #[command(flatten)]
    output: JsonArgs,
}

#[derive(Args, Default)]
struct JsonArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct PatternsArgs {
    /// Number of commands to show
    #[arg(long, default_value_t = 10)]
    limit: usize,

    #[command(flatten)]
    output: JsonArgs,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (history-file, home-dir, timeout-minutes,
        /// directory-change-breaks-session, category-change-threshold,
        /// min-commands-per-session, max-session-duration-minutes, number-comma, locale)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    // Config problems fall back to defaults rather than blocking read-only commands.
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            utils::warn_once(format!("Ignoring unreadable config: {e:#}"));
            Config::default()
        }
    };

    let history = cli.history;
    match cli.command {
        None => {
            if let Err(e) = run_sessions(SessionsArgs::default(), history, &config) {
                eprintln!("Error listing sessions: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Sessions(args)) => {
            if let Err(e) = run_sessions(args, history, &config) {
                eprintln!("Error listing sessions: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Search { query, output }) => {
            if let Err(e) = run_search(&query, output, history, &config) {
                eprintln!("Error searching history: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Volume(args)) => {
            if let Err(e) = run_volume(args, history, &config) {
                eprintln!("Error computing volume: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Stats(args)) => {
            if let Err(e) = run_stats(args, history, &config) {
                eprintln!("Error computing stats: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Patterns(args)) => {
            if let Err(e) = run_patterns(args, history, &config) {
                eprintln!("Error computing patterns: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Classify { command }) => {
            run_classify(&command.join(" "), &config);
        }
        Some(Commands::Config(config_args)) => {
            handle_config_subcommand(config_args);
        }
    }
}

/// Parse and segment the history selected by `--history` or the config.
fn load_history(
    history: Option<PathBuf>,
    config: &Config,
) -> Result<(Vec<CommandRecord>, Vec<Session>)> {
    let categorizer = Categorizer::with_rules(config.category_rules());
    let segment_config = config.segment_config()?;
    let path = match history {
        Some(path) => path,
        None => config.history_path()?,
    };

    let mut records = parse_history_file(&path, &segment_config.home_dir, &categorizer)
        .context("Failed to load shell history")?;
    let sessions = segment_sessions(&mut records, &segment_config);

    Ok((records, sessions))
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        simd_json::to_string_pretty(value)?
    } else {
        simd_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn run_sessions(args: SessionsArgs, history: Option<PathBuf>, config: &Config) -> Result<()> {
    let (_, sessions) = load_history(history, config)?;

    let filter = SessionFilter {
        start_date: args.from,
        end_date: args.to,
        category: args.category,
        keyword: args.keyword,
        order: args.sort,
    };
    let selected = analysis::filter_sessions(&sessions, &filter);

    if args.output.json {
        return print_json(&selected, args.output.pretty);
    }

    if selected.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    for session in selected {
        println!(
            "#{:<4} {}  {:>7}  {:>4} cmds  {}",
            session.id,
            utils::format_timestamp(&session.start_time),
            utils::format_duration(session.duration_secs),
            session.command_count(),
            session.description
        );

        if args.commands {
            for cmd in &session.commands {
                let first_line = cmd.text.lines().next().unwrap_or("");
                println!(
                    "        {}  {}",
                    cmd.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S"),
                    first_line
                );
            }
        }
    }

    Ok(())
}

fn run_search(
    query: &str,
    output: JsonArgs,
    history: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Search query must not be empty");
    }

    let (records, _) = load_history(history, config)?;
    let matches = analysis::search_commands(&records, query);

    if output.json {
        return print_json(&matches, output.pretty);
    }

    if matches.is_empty() {
        println!("No commands found.");
        return Ok(());
    }

    for record in matches {
        println!(
            "{}  {:<30}  {}",
            utils::format_timestamp(&record.timestamp),
            record.directory,
            record.text.lines().next().unwrap_or("")
        );
    }

    Ok(())
}

fn run_volume(args: JsonArgs, history: Option<PathBuf>, config: &Config) -> Result<()> {
    let (records, _) = load_history(history, config)?;
    let volume = analysis::daily_volume(&records, &chrono::Local);

    if args.json {
        return print_json(&volume, args.pretty);
    }

    let format_options = NumberFormatOptions::from(&config.formatting);
    for day in volume {
        println!(
            "{}  {:>8}",
            day.date,
            utils::format_number(day.count as u64, &format_options)
        );
    }

    Ok(())
}

fn run_stats(args: JsonArgs, history: Option<PathBuf>, config: &Config) -> Result<()> {
    let (records, sessions) = load_history(history, config)?;
    let stats = analysis::compute_stats(&records, &sessions);

    if args.json {
        return print_json(&stats, args.pretty);
    }

    let format_options = NumberFormatOptions::from(&config.formatting);
    println!(
        "Commands: {}",
        utils::format_number(stats.total_commands as u64, &format_options)
    );
    println!(
        "Sessions: {}",
        utils::format_number(stats.total_sessions as u64, &format_options)
    );

    let mut categories: Vec<_> = stats.categories.iter().collect();
    categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    println!("Categories:");
    for (category, count) in categories {
        println!(
            "   {:<20} {:>10}",
            category.display_name(),
            utils::format_number(*count as u64, &format_options)
        );
    }

    Ok(())
}

fn run_patterns(args: PatternsArgs, history: Option<PathBuf>, config: &Config) -> Result<()> {
    let (records, sessions) = load_history(history, config)?;
    let patterns = analysis::command_patterns(&records, &sessions);
    let top = analysis::top_patterns(&patterns, args.limit);

    if args.output.json {
        return print_json(&top, args.output.pretty);
    }

    let format_options = NumberFormatOptions::from(&config.formatting);
    for pattern in top {
        let mut partners: Vec<_> = pattern.co_occurrence.iter().collect();
        partners.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let partners = partners
            .into_iter()
            .take(5)
            .map(|(cmd, n)| format!("{cmd} ({n})"))
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:<20} {:>8}  {}",
            pattern.command,
            utils::format_number(pattern.count as u64, &format_options),
            partners
        );
    }

    Ok(())
}

fn run_classify(command: &str, config: &Config) {
    let categorizer = Categorizer::with_rules(config.category_rules());

    match categorizer.classify_with_origin(command) {
        Some((category, origin)) => {
            let source = match origin {
                RuleOrigin::UserDefined => "user rule",
                RuleOrigin::BuiltIn => "built-in rule",
            };
            println!("{} ({}, {source})", category, category.display_name());
        }
        None => println!("other (Other, no rule matched)"),
    }
}

fn handle_config_subcommand(config_args: ConfigArgs) {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            if let Err(e) = config::create_default_config(overwrite) {
                eprintln!("Error creating config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Show => {
            if let Err(e) = config::show_config() {
                eprintln!("Error showing config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Set { key, value } => {
            if let Err(e) = config::set_config_value(&key, &value) {
                eprintln!("Error setting config: {e:#}");
                std::process::exit(1);
            }
        }
    }
}
