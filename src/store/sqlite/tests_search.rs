#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::tests::temp_store;
use super::*;
use crate::history::TagSet;

fn commands(records: &[CommandRecord]) -> Vec<&str> {
    records.iter().map(|r| r.command.as_str()).collect()
}

fn seed(store: &SqliteStore, directory: &str, commands: &[&str]) {
    for command in commands {
        store
            .save_command(&CommandRecord::new(*command, directory))
            .expect("seed");
    }
}

#[test]
fn substring_match_in_one_directory() {
    let (_dir, store) = temp_store();
    seed(&store, "/test/directory", &["git status", "git commit", "ls -la"]);

    let found = store.search_commands("git", "/test/directory").unwrap();
    let mut found = commands(&found);
    found.sort_unstable();
    assert_eq!(found, ["git commit", "git status"]);
}

#[test]
fn match_anywhere_in_the_command() {
    let (_dir, store) = temp_store();
    seed(&store, "/p", &["cargo test --release", "make release", "ls"]);
    assert_eq!(store.search_commands("release", "/p").unwrap().len(), 2);
}

#[test]
fn search_is_case_sensitive() {
    let (_dir, store) = temp_store();
    seed(&store, "/p", &["git status", "Git Status"]);

    assert_eq!(commands(&store.search_commands("Git", "/p").unwrap()), ["Git Status"]);
    assert_eq!(commands(&store.search_commands("git", "/p").unwrap()), ["git status"]);
    assert!(store.search_commands("GIT", "/p").unwrap().is_empty());
}

#[test]
fn empty_pattern_matches_every_record() {
    let (_dir, store) = temp_store();
    seed(&store, "/p", &["a", "b", "c"]);
    assert_eq!(
        store.search_commands("", "/p").unwrap(),
        store.get_commands_by_directory("/p").unwrap()
    );
}

#[test]
fn like_wildcards_are_literal() {
    let (_dir, store) = temp_store();
    seed(&store, "/p", &["echo 100%", "echo 1000", "ls a_b", "ls axb"]);

    assert_eq!(commands(&store.search_commands("%", "/p").unwrap()), ["echo 100%"]);
    assert_eq!(commands(&store.search_commands("a_b", "/p").unwrap()), ["ls a_b"]);
}

#[test]
fn search_does_not_leak_other_directories() {
    let (_dir, store) = temp_store();
    seed(&store, "/one", &["git pull"]);
    seed(&store, "/two", &["git push"]);
    seed(&store, "/one/sub", &["git fetch"]);

    assert_eq!(commands(&store.search_commands("git", "/one").unwrap()), ["git pull"]);
}

#[test]
fn results_are_a_subset_of_the_listing_in_the_same_order() {
    let (_dir, store) = temp_store();
    let now = Utc::now();
    for (i, cmd) in ["git a", "ls", "git b", "pwd", "git c"].iter().enumerate() {
        let at = now - chrono::Duration::seconds(i64::try_from(i).unwrap());
        store
            .save_command(&CommandRecord::new(*cmd, "/p").with_timestamp(at))
            .unwrap();
    }

    let all = store.get_commands_by_directory("/p").unwrap();
    let found = store.search_commands("git", "/p").unwrap();

    let expected: Vec<&CommandRecord> = all.iter().filter(|r| r.command.contains("git")).collect();
    let found_refs: Vec<&CommandRecord> = found.iter().collect();
    assert_eq!(found_refs, expected);
    assert_eq!(commands(&found), ["git a", "git b", "git c"]);
}

#[test]
fn search_returns_tags() {
    let (_dir, store) = temp_store();
    let tags: TagSet = ["git", "failed"].into_iter().collect();
    store
        .save_command(&CommandRecord::new("git push", "/p").with_tags(tags.clone()))
        .unwrap();
    store
        .save_command(&CommandRecord::new("ls", "/p").with_tags(["ls"].into_iter().collect()))
        .unwrap();

    let found = store.search_commands("push", "/p").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tags, tags);
}

#[test]
fn search_normalizes_the_directory_argument() {
    let (_dir, store) = temp_store();
    seed(&store, "/test/directory", &["git status"]);
    assert_eq!(
        store.search_commands("git", "/test/./directory/").unwrap().len(),
        1
    );
}

#[test]
fn no_match_is_empty_not_an_error() {
    let (_dir, store) = temp_store();
    seed(&store, "/p", &["ls"]);
    assert!(store.search_commands("nothing", "/p").unwrap().is_empty());
    assert!(store.search_commands("ls", "/elsewhere").unwrap().is_empty());
}
