//! Pattern-based command categorization.
//!
//! User rules are evaluated first, in configured order, and the first match
//! wins. Built-in rules are evaluated afterwards in declaration order. A command
//! matching nothing is [`Category::Other`].
//!
//! Concurrency: a [`Categorizer`] may be shared between threads. The user rule
//! set sits behind a read/write lock; [`Categorizer::set_custom_rules`] swaps
//! the whole set under the write lock, so a concurrent [`Categorizer::classify`]
//! sees either the old set or the new one, never a mix.

use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::Regex;

use crate::types::{Category, CategoryRule, RuleOrigin};

/// A category rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub category: Category,
    pub pattern: Regex,
    pub origin: RuleOrigin,
}

impl CompiledRule {
    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

// Each pattern matches whole leading tokens only: the token must be followed by whitespace.
const BUILTIN_PATTERNS: &[(Category, &str)] = &[
    (Category::VersionControl, r"^(git|hg|svn|bzr|cvs)\s"),
    (
        Category::Build,
        r"^(make|cmake|cargo|npm|yarn|pnpm|gradle|mvn|ant|bazel|go build|go test|gcc|g\+\+|clang|rustc|javac)\s",
    ),
    (
        Category::FileOperations,
        r"^(cp|mv|rm|mkdir|rmdir|touch|chmod|chown|ln|cat|head|tail|less|more|dd|rsync|scp)\s",
    ),
    (
        Category::Navigation,
        r"^(cd|ls|pwd|tree|find|locate|which|whereis)\s",
    ),
    (
        Category::DevTools,
        r"^(vim|nvim|emacs|nano|code|subl|idea|pycharm|gdb|lldb|valgrind|strace|ltrace)\s",
    ),
    (
        Category::SystemAdmin,
        r"^(sudo|su|systemctl|service|kill|killall|ps|top|htop|free|df|du|mount|umount|lsof|netstat|ss|iptables|ufw|systemd)\s",
    ),
    (
        Category::Network,
        r"^(curl|wget|ssh|scp|rsync|ping|traceroute|nslookup|dig|host|telnet|nc|netcat|ftp|sftp)\s",
    ),
    (
        Category::Containers,
        r"^(docker|podman|kubectl|k|helm|minikube|kind|k3s|nerdctl|containerd)\s",
    ),
    (
        Category::Database,
        r"^(psql|mysql|sqlite3|mongo|redis-cli|mongosh|clickhouse-client)\s",
    ),
    (Category::Editor, r"^(vim|nvim|emacs|nano|vi|ed|joe|pico)\s"),
    (
        Category::Search,
        r"^(grep|egrep|fgrep|ag|rg|ack|find.*-name|locate)\s",
    ),
    (
        Category::PackageManager,
        r"^(apt|apt-get|yum|dnf|pacman|brew|pip|pip3|npm|yarn|cargo|gem|composer)\s",
    ),
];

static BUILTIN_RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .filter_map(|(category, pattern)| {
            Regex::new(pattern).ok().map(|pattern| CompiledRule {
                category: category.clone(),
                pattern,
                origin: RuleOrigin::BuiltIn,
            })
        })
        .collect()
});

/// The process-independent built-in rules, in evaluation order.
pub fn builtin_rules() -> &'static [CompiledRule] {
    &BUILTIN_RULES
}

/// Compile user rules, dropping (and logging) any whose pattern is invalid.
pub fn compile_rules(rules: &[CategoryRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .filter_map(|rule| match Regex::new(&rule.pattern) {
            Ok(pattern) => {
                log::debug!(
                    "Loaded category rule: category={} pattern={:?}",
                    rule.category,
                    rule.pattern
                );
                Some(CompiledRule {
                    category: Category::from_label(&rule.category),
                    pattern,
                    origin: RuleOrigin::UserDefined,
                })
            }
            Err(e) => {
                log::warn!(
                    "Dropping category rule {:?} with invalid pattern {:?}: {}",
                    rule.category,
                    rule.pattern,
                    e
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct Categorizer {
    user_rules: RwLock<Vec<CompiledRule>>,
}

impl Categorizer {
    /// A categorizer with no user rules.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: &[CategoryRule]) -> Self {
        Self {
            user_rules: RwLock::new(compile_rules(rules)),
        }
    }

    /// Replace the whole user rule set. An empty slice clears it.
    ///
    /// Rules whose pattern fails to compile are skipped; the remaining valid
    /// rules still take effect.
    pub fn set_custom_rules(&self, rules: &[CategoryRule]) {
        let compiled = compile_rules(rules);
        *self.user_rules.write() = compiled;
    }

    /// Number of user rules currently in effect.
    pub fn custom_rule_count(&self) -> usize {
        self.user_rules.read().len()
    }

    pub fn classify(&self, command_text: &str) -> Category {
        self.classify_with_origin(command_text)
            .map(|(category, _)| category)
            .unwrap_or(Category::Other)
    }

    /// Like [`Categorizer::classify`], but also reports which rule set matched.
    /// Returns `None` when nothing matched.
    pub fn classify_with_origin(&self, command_text: &str) -> Option<(Category, RuleOrigin)> {
        let text = command_text.trim();

        let user_rules = self.user_rules.read();
        user_rules
            .iter()
            .chain(builtin_rules().iter())
            .find(|rule| rule.matches(text))
            .map(|rule| (rule.category.clone(), rule.origin))
    }
}

/// First whitespace-delimited token of a command, or `""` for blank input.
pub fn base_command(command_text: &str) -> &str {
    command_text.split_whitespace().next().unwrap_or("")
}
