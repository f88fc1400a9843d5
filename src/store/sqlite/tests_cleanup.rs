#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;

use super::tests::{record_at, temp_store};
use super::*;
use crate::history::TagSet;

fn commands_in(store: &SqliteStore, directory: &str) -> Vec<String> {
    store
        .get_commands_by_directory(directory)
        .unwrap()
        .into_iter()
        .map(|r| r.command)
        .collect()
}

#[test]
fn one_day_retention_keeps_only_recent_records() {
    let (_dir, store) = temp_store();
    let now = Utc::now();
    store.save_command(&record_at("fresh", "/p", now)).unwrap();
    store
        .save_command(&record_at("two days", "/p", now - Duration::hours(48)))
        .unwrap();
    store
        .save_command(&record_at("eight days", "/p", now - Duration::days(8)))
        .unwrap();

    assert_eq!(store.cleanup_old_commands(1).unwrap(), 2);
    assert_eq!(commands_in(&store, "/p"), ["fresh"]);
}

#[test]
fn zero_retention_deletes_everything() {
    let (_dir, store) = temp_store();
    let now = Utc::now();
    store.save_command(&record_at("now", "/a", now)).unwrap();
    store
        .save_command(&record_at("future", "/b", now + Duration::days(3)))
        .unwrap();
    store
        .save_command(&record_at("past", "/c", now - Duration::days(400)))
        .unwrap();

    assert_eq!(store.cleanup_old_commands(0).unwrap(), 3);
    assert!(store.get_directories_with_history().unwrap().is_empty());
}

#[test]
fn positive_retention_keeps_future_timestamps() {
    let (_dir, store) = temp_store();
    store
        .save_command(&record_at("clock skew", "/p", Utc::now() + Duration::hours(1)))
        .unwrap();
    assert_eq!(store.cleanup_old_commands(1).unwrap(), 0);
    assert_eq!(commands_in(&store, "/p"), ["clock skew"]);
}

#[test]
fn records_just_past_the_cutoff_go_and_just_inside_stay() {
    let (_dir, store) = temp_store();
    let now = Utc::now();
    store
        .save_command(&record_at("past", "/p", now - Duration::days(7) - Duration::seconds(30)))
        .unwrap();
    store
        .save_command(&record_at("inside", "/p", now - Duration::days(7) + Duration::minutes(5)))
        .unwrap();

    assert_eq!(store.cleanup_old_commands(7).unwrap(), 1);
    assert_eq!(commands_in(&store, "/p"), ["inside"]);
}

#[test]
fn negative_retention_is_rejected_and_deletes_nothing() {
    let (_dir, store) = temp_store();
    store
        .save_command(&record_at("old", "/p", Utc::now() - Duration::days(30)))
        .unwrap();

    let err = store.cleanup_old_commands(-1).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)), "got {err:?}");
    assert_eq!(commands_in(&store, "/p"), ["old"]);
}

#[test]
fn cleanup_spans_every_directory() {
    let (_dir, store) = temp_store();
    let now = Utc::now();
    store
        .save_command(&record_at("old a", "/a", now - Duration::days(10)))
        .unwrap();
    store
        .save_command(&record_at("old b", "/b", now - Duration::days(10)))
        .unwrap();
    store.save_command(&record_at("new b", "/b", now)).unwrap();

    assert_eq!(store.cleanup_old_commands(5).unwrap(), 2);
    assert_eq!(store.get_directories_with_history().unwrap(), ["/b"]);
    assert_eq!(commands_in(&store, "/b"), ["new b"]);
}

#[test]
fn cleanup_removes_tags_of_deleted_records() {
    let (_dir, store) = temp_store();
    let tags: TagSet = ["git", "failed"].into_iter().collect();
    store
        .save_command(
            &record_at("git push", "/p", Utc::now() - Duration::days(3)).with_tags(tags.clone()),
        )
        .unwrap();
    store
        .save_command(&record_at("git pull", "/p", Utc::now()).with_tags(tags.clone()))
        .unwrap();

    store.cleanup_old_commands(1).unwrap();

    let remaining: i64 = store
        .conn()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM command_tags", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 2);
    assert_eq!(store.get_commands_by_directory("/p").unwrap()[0].tags, tags);
}

#[test]
fn cleanup_on_empty_store_deletes_nothing() {
    let (_dir, store) = temp_store();
    assert_eq!(store.cleanup_old_commands(0).unwrap(), 0);
    assert_eq!(store.cleanup_old_commands(30).unwrap(), 0);
}

#[test]
fn huge_retention_keeps_everything() {
    let (_dir, store) = temp_store();
    store
        .save_command(&record_at("ancient", "/p", Utc::now() - Duration::days(10_000)))
        .unwrap();
    assert_eq!(store.cleanup_old_commands(i64::MAX).unwrap(), 0);
    assert_eq!(commands_in(&store, "/p"), ["ancient"]);
}

fn query_plan(store: &SqliteStore, sql: &str) -> Vec<String> {
    let conn = store.conn().unwrap();
    let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")).unwrap();
    stmt.query_map([0_i64], |row| row.get::<_, String>(3))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap()
}

#[test]
fn cutoff_delete_seeks_the_time_index() {
    let (_dir, store) = temp_store();
    let plan = query_plan(&store, super::queries::DELETE_AT_OR_BEFORE);
    assert!(
        plan.iter().any(|step| step.contains("idx_commands_time")),
        "plan: {plan:?}"
    );
}

#[test]
fn purging_everything_cascades_to_tags() {
    let (_dir, store) = temp_store();
    let tags: TagSet = ["git", "failed"].into_iter().collect();
    store
        .save_command(&record_at("git push", "/p", Utc::now()).with_tags(tags))
        .unwrap();

    assert_eq!(store.cleanup_old_commands(0).unwrap(), 1);

    let remaining: i64 = store
        .conn()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM command_tags", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}
