use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use super::*;

const HOME: &str = "/Users/chris";

fn command(base: &str, text: &str, directory: &str, category: Category) -> CommandRecord {
    CommandRecord {
        sequence_id: 0,
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        duration: 0,
        text: text.to_string(),
        directory: directory.to_string(),
        category,
        base_command: base.to_string(),
        session_id: Some(1),
    }
}

fn commands_from_bases(bases: &[&str]) -> Vec<CommandRecord> {
    bases
        .iter()
        .map(|base| command(base, base, HOME, Category::Other))
        .collect()
}

fn session_from(commands: Vec<CommandRecord>) -> Session {
    let mut directories: Vec<String> = Vec::new();
    let mut categories = BTreeMap::new();
    for cmd in &commands {
        if !directories.contains(&cmd.directory) {
            directories.push(cmd.directory.clone());
        }
        *categories.entry(cmd.category.clone()).or_insert(0) += 1;
    }

    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    Session {
        id: 1,
        start_time: start,
        end_time: start,
        duration_secs: 0,
        commands,
        directories,
        categories,
        description: String::new(),
    }
}

#[test]
fn shorten_directory_table() {
    let cases = [
        ("/Users/chris", "~"),
        ("/Users/chris/code", "code"),
        ("/Users/chris/code/project", "project"),
        ("/Users/chris/code/project/src", "project/src"),
        ("/Users/chris/code/project/src/components", "src/components"),
        (
            "/Users/chris/code/warp_experiments/history_viewer/src/lib/utils",
            "src/lib/utils",
        ),
        ("/", "."),
        ("/usr/local/bin", "local/bin"),
        ("/opt", "opt"),
        ("/a/b/c/d/e", "c/d/e"),
    ];

    for (full_path, want) in cases {
        assert_eq!(shorten_directory(full_path, HOME), want, "path {full_path}");
    }
}

#[test]
fn shorten_directory_does_not_strip_lookalike_home() {
    // "/Users/christopher" only shares a string prefix with the home directory.
    assert_eq!(
        shorten_directory("/Users/christopher/code", HOME),
        "christopher/code"
    );
}

#[test]
fn activities_dominant_command() {
    let commands = commands_from_bases(&["git", "git", "git", "ls"]);
    assert_eq!(extract_top_activities(&commands), "git");
}

#[test]
fn activities_top_two() {
    let commands = commands_from_bases(&["git", "git", "npm", "npm", "ls"]);
    assert_eq!(extract_top_activities(&commands), "git npm");
}

#[test]
fn activities_ties_keep_first_seen_order() {
    let commands = commands_from_bases(&["npm", "git", "git", "npm", "ls"]);
    assert_eq!(extract_top_activities(&commands), "npm git");
}

#[test]
fn activities_strip_local_prefix_and_case() {
    let commands = commands_from_bases(&["./history_viewer", "./History_Viewer"]);
    assert_eq!(extract_top_activities(&commands), "history_viewer");
}

#[test]
fn activities_fall_back_to_work() {
    // Six singletons: none dominates and none reaches a fifth.
    let commands = commands_from_bases(&["a", "b", "c", "d", "e", "f"]);
    assert_eq!(extract_top_activities(&commands), "work");

    assert_eq!(extract_top_activities(&[]), "work");
    assert_eq!(extract_top_activities(&commands_from_bases(&["", ""])), "work");
}

#[test]
fn activities_runner_up_needs_a_full_fifth() {
    // 1 of 9 is below a fifth, even though 9 / 5 rounds down to 1.
    let commands = commands_from_bases(&["git", "git", "git", "git", "npm", "a", "b", "c", "d"]);
    assert_eq!(extract_top_activities(&commands), "work");

    // 2 of 10 is exactly a fifth.
    let commands =
        commands_from_bases(&["git", "git", "git", "git", "npm", "npm", "a", "b", "c", "d"]);
    assert_eq!(extract_top_activities(&commands), "git npm");
}

#[test]
fn activities_rank_long_sessions_by_count_then_first_seen() {
    let mut bases: Vec<&str> = Vec::new();
    for _ in 0..1000 {
        bases.extend(["ls", "cat", "git", "git", "git", "git", "npm", "npm"]);
    }
    let commands = commands_from_bases(&bases);
    // git 4000 of 8000 is not a majority; npm 2000 is exactly a quarter.
    assert_eq!(extract_top_activities(&commands), "git npm");
}

#[test]
fn activities_small_mixed_sessions_keep_two() {
    let commands = commands_from_bases(&["a", "b"]);
    assert_eq!(extract_top_activities(&commands), "a b");
}

#[test]
fn most_active_directory() {
    let project = "/Users/chris/code/project";
    let other = "/Users/chris/code/other";

    let single = session_from(vec![
        command("ls", "ls", project, Category::Other),
        command("ls", "ls", project, Category::Other),
    ]);
    assert_eq!(find_most_active_directory(&single), project);

    let first_wins = session_from(vec![
        command("ls", "ls", project, Category::Other),
        command("ls", "ls", project, Category::Other),
        command("ls", "ls", project, Category::Other),
        command("ls", "ls", other, Category::Other),
    ]);
    assert_eq!(find_most_active_directory(&first_wins), project);

    let second_wins = session_from(vec![
        command("ls", "ls", project, Category::Other),
        command("ls", "ls", other, Category::Other),
        command("ls", "ls", other, Category::Other),
        command("ls", "ls", other, Category::Other),
    ]);
    assert_eq!(find_most_active_directory(&second_wins), other);

    let tie = session_from(vec![
        command("ls", "ls", other, Category::Other),
        command("ls", "ls", project, Category::Other),
    ]);
    assert_eq!(find_most_active_directory(&tie), other);
}

#[test]
fn describes_git_session() {
    let dir = "/Users/chris/code/project";
    let session = session_from(
        ["git status", "git add .", "git commit", "git push", "git log"]
            .iter()
            .map(|text| command("git", text, dir, Category::VersionControl))
            .collect(),
    );

    assert_eq!(
        describe_session(&session, HOME),
        "project: git [Version Control]"
    );
}

#[test]
fn describes_mixed_session_with_two_categories() {
    let dir = "/Users/chris/code/project/src/components";
    let session = session_from(vec![
        command("git", "git status", dir, Category::VersionControl),
        command("git", "git add .", dir, Category::VersionControl),
        command("npm", "npm test", dir, Category::Build),
        command("npm", "npm build", dir, Category::Build),
        command("ls", "ls", dir, Category::FileOperations),
    ]);

    assert_eq!(
        describe_session(&session, HOME),
        "src/components: git npm [Version Control, Build]"
    );
}

#[test]
fn minor_category_is_left_out() {
    let mut commands: Vec<CommandRecord> = (0..9)
        .map(|_| command("git", "git status", HOME, Category::VersionControl))
        .collect();
    commands.push(command("ls", "ls -la", HOME, Category::Navigation));

    let session = session_from(commands);
    assert_eq!(describe_session(&session, HOME), "~: git [Version Control]");
}

#[test]
fn custom_category_display_name() {
    let session = session_from(vec![command(
        "deploy",
        "deploy prod",
        "/srv/app",
        Category::from_label("release-ops"),
    )]);

    assert_eq!(describe_session(&session, HOME), "app: deploy [Release Ops]");
}

#[test]
fn empty_session() {
    let session = session_from(Vec::new());
    assert_eq!(describe_session(&session, HOME), "Empty session");
}
