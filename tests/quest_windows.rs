/// Tests for quest eligibility windows: per-window idempotency, window
/// re-opening at each boundary, and administrative resets.
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use questledger::engine::{
    complete, quests_for, reset, EngineError, GameStore, GameStoreBuilder, QuestKind,
    QuestRecord, ResetCategory, UserRecord,
};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn setup() -> (TempDir, GameStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = GameStoreBuilder::new(dir.path())
        .without_catalog_seed()
        .open()
        .expect("store");
    store
        .put_user(UserRecord::new("u1", "alice", at(2026, 8, 1).date_naive()))
        .expect("user");
    (dir, store)
}

#[test]
fn double_completion_awards_points_once() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 40))
        .expect("quest");

    complete(&store, "u1", "steps", at(2026, 8, 10)).expect("first");
    let err = complete(&store, "u1", "steps", at(2026, 8, 10)).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyCompleted(_)));
    assert_eq!(store.get_user("u1").expect("get").points, 40);
}

#[test]
fn daily_window_reopens_at_midnight() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 40))
        .expect("quest");

    complete(&store, "u1", "steps", at(2026, 8, 10)).expect("day 1");
    complete(&store, "u1", "steps", at(2026, 8, 11)).expect("day 2");
    assert_eq!(store.get_user("u1").expect("get").points, 80);
}

#[test]
fn weekly_window_spans_the_iso_week() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("water", "Water", QuestKind::Weekly, 150))
        .expect("quest");

    // Wednesday.
    complete(&store, "u1", "water", at(2026, 8, 12)).expect("this week");
    // Sunday of the same ISO week: still closed.
    assert!(matches!(
        complete(&store, "u1", "water", at(2026, 8, 16)),
        Err(EngineError::AlreadyCompleted(_))
    ));
    // Monday: new window.
    complete(&store, "u1", "water", at(2026, 8, 17)).expect("next week");
}

#[test]
fn monthly_window_spans_the_calendar_month() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("minutes", "Minutes", QuestKind::Monthly, 500))
        .expect("quest");

    complete(&store, "u1", "minutes", at(2026, 8, 2)).expect("august");
    assert!(matches!(
        complete(&store, "u1", "minutes", at(2026, 8, 31)),
        Err(EngineError::AlreadyCompleted(_))
    ));
    complete(&store, "u1", "minutes", at(2026, 9, 1)).expect("september");
}

#[test]
fn unknown_user_and_quest_are_not_found() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 40))
        .expect("quest");

    assert!(matches!(
        complete(&store, "ghost", "steps", at(2026, 8, 10)),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        complete(&store, "u1", "ghost_quest", at(2026, 8, 10)),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn reset_is_scoped_to_one_category() {
    let (_dir, store) = setup();
    store
        .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 10))
        .expect("daily");
    store
        .put_quest(QuestRecord::new("water", "Water", QuestKind::Weekly, 10))
        .expect("weekly");
    store
        .put_quest(QuestRecord::new("minutes", "Minutes", QuestKind::Monthly, 10))
        .expect("monthly");

    let now = at(2026, 8, 12);
    complete(&store, "u1", "steps", now).expect("c1");
    complete(&store, "u1", "water", now).expect("c2");
    complete(&store, "u1", "minutes", now).expect("c3");

    assert_eq!(reset(&store, "u1", ResetCategory::Weekly).expect("reset"), 1);
    let listed = quests_for(&store, "u1", now).expect("list");
    let completed: Vec<&str> = listed
        .iter()
        .filter(|a| a.completed)
        .map(|a| a.quest.quest_id.as_str())
        .collect();
    assert_eq!(completed, vec!["minutes", "steps"]);

    // Points are never clawed back by a reset.
    assert_eq!(store.get_user("u1").expect("get").points, 30);
}
