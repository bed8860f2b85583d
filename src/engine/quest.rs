//! Quest state machine: recurring (daily/weekly/monthly) and time-boxed
//! community quest completion, with per-window idempotency.
//!
//! A (user, quest) pair moves `pending -> completed` once per eligibility
//! window; a new window re-opens the quest. Completion credits points
//! through the ledger and, for the last pending daily quest of the day,
//! triggers streak evaluation — all inside one per-user record write.

use chrono::{DateTime, Utc};
use log::debug;

use crate::engine::errors::EngineError;
use crate::engine::events::EventStatus;
use crate::engine::ledger;
use crate::engine::storage::GameStore;
use crate::engine::streak;
use crate::engine::types::{AnnotatedQuest, CompletionOutcome, QuestKind};

/// Completion-fact category targeted by an administrative reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCategory {
    Daily,
    Weekly,
    Monthly,
    Community,
}

impl ResetCategory {
    fn window_prefix(&self) -> &'static str {
        match self {
            ResetCategory::Daily => "daily:",
            ResetCategory::Weekly => "weekly:",
            ResetCategory::Monthly => "monthly:",
            ResetCategory::Community => "event:",
        }
    }
}

/// Complete a recurring quest for this user.
///
/// Fails with `AlreadyCompleted` inside an eligibility window that
/// already holds a completion fact, and `NotFound` for unknown or
/// inactive quests. On success the reward is credited, the fact is
/// recorded, and — when this was the last incomplete daily quest of the
/// day — the streak is evaluated.
pub fn complete(
    store: &GameStore,
    user_id: &str,
    quest_id: &str,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, EngineError> {
    let quest = store.get_quest(quest_id)?;
    if !quest.active {
        return Err(EngineError::NotFound(format!("quest: {}", quest_id)));
    }

    // Daily roster snapshot taken outside the critical section; catalog
    // edits are administrative and not raced against gameplay.
    let daily_ids: Vec<String> = store
        .list_quests()?
        .into_iter()
        .filter(|q| q.active && q.kind == QuestKind::Daily)
        .map(|q| q.quest_id)
        .collect();

    let today = now.date_naive();
    store.update_user(user_id, |_, user| {
        let window = quest.kind.window_key(today);
        if user.has_completed(&quest.quest_id, &window) {
            return Err(EngineError::AlreadyCompleted(quest.quest_id.clone()));
        }

        ledger::credit(user, quest.points_reward, today)?;
        user.record_completion(&quest.quest_id, &window, now);

        let mut all_daily_complete = false;
        let mut streak_incremented = false;
        if quest.kind == QuestKind::Daily {
            all_daily_complete = daily_ids.iter().all(|id| user.has_completed(id, &window));
            if all_daily_complete {
                streak_incremented = streak::evaluate(user, today);
            }
        }

        debug!(
            "quest {} completed by {} (+{} pts, window {})",
            quest.quest_id, user.user_id, quest.points_reward, window
        );
        Ok(CompletionOutcome {
            points_added: quest.points_reward,
            all_daily_complete,
            streak_incremented,
        })
    })
}

/// Complete a community quest. Requires membership in the owning
/// community and `event_start <= now <= event_end` (inclusive bounds);
/// at most one completion per event.
pub fn complete_community(
    store: &GameStore,
    user_id: &str,
    quest_id: &str,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, EngineError> {
    let quest = store.get_community_quest(quest_id)?;
    let today = now.date_naive();

    store.update_user(user_id, |_, user| {
        if !user.is_member_of(&quest.community_id) {
            return Err(EngineError::NotAMember(quest.community_id.clone()));
        }
        if EventStatus::classify(quest.event_start, quest.event_end, now) != EventStatus::Live {
            return Err(EngineError::EventNotActive(quest.quest_id.clone()));
        }

        let window = quest.window_key();
        if user.has_completed(&quest.quest_id, &window) {
            return Err(EngineError::AlreadyCompleted(quest.quest_id.clone()));
        }

        ledger::credit(user, quest.points_reward, today)?;
        user.record_completion(&quest.quest_id, &window, now);

        debug!(
            "community quest {} completed by {} (+{} pts)",
            quest.quest_id, user.user_id, quest.points_reward
        );
        Ok(CompletionOutcome {
            points_added: quest.points_reward,
            all_daily_complete: false,
            streak_incremented: false,
        })
    })
}

/// Clear all completion facts in one category for a user. Administrative
/// and test-only; no points are reclaimed.
pub fn reset(
    store: &GameStore,
    user_id: &str,
    category: ResetCategory,
) -> Result<usize, EngineError> {
    store.update_user(user_id, |_, user| {
        let before = user.completions.len();
        user.completions
            .retain(|c| !c.window.starts_with(category.window_prefix()));
        Ok(before - user.completions.len())
    })
}

/// Active quest list annotated with this user's completion state for the
/// current eligibility window of each quest.
pub fn quests_for(
    store: &GameStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<AnnotatedQuest>, EngineError> {
    let user = store.get_user(user_id)?;
    let today = now.date_naive();
    let mut annotated: Vec<AnnotatedQuest> = store
        .list_quests()?
        .into_iter()
        .filter(|q| q.active)
        .map(|quest| {
            let window = quest.kind.window_key(today);
            let completed_at = user
                .completions
                .iter()
                .find(|c| c.quest_id == quest.quest_id && c.window == window)
                .map(|c| c.completed_at);
            AnnotatedQuest {
                completed: completed_at.is_some(),
                completed_at,
                quest,
            }
        })
        .collect();
    annotated.sort_by(|a, b| a.quest.quest_id.cmp(&b.quest.quest_id));
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::storage::GameStoreBuilder;
    use crate::engine::types::{CommunityQuestRecord, CommunityRecord, QuestRecord, UserRecord};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path())
            .without_catalog_seed()
            .open()
            .expect("store");
        (dir, store)
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn put_user(store: &GameStore, id: &str) {
        let user = UserRecord::new(id, id, at(2026, 8, 1, 0).date_naive());
        store.put_user(user).expect("put user");
    }

    #[test]
    fn completion_credits_points_once_per_window() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("steps", "Daily Steps", QuestKind::Daily, 50))
            .expect("put quest");

        let now = at(2026, 8, 10, 9);
        let outcome = complete(&store, "alice", "steps", now).expect("complete");
        assert_eq!(outcome.points_added, 50);

        let err = complete(&store, "alice", "steps", at(2026, 8, 10, 20)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted(_)));
        assert_eq!(store.get_user("alice").unwrap().points, 50);

        // Next day the daily window re-opens.
        complete(&store, "alice", "steps", at(2026, 8, 11, 9)).expect("new window");
        assert_eq!(store.get_user("alice").unwrap().points, 100);
    }

    #[test]
    fn last_daily_completion_triggers_streak() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 10))
            .expect("q1");
        store
            .put_quest(QuestRecord::new("water", "Water", QuestKind::Daily, 10))
            .expect("q2");

        let now = at(2026, 8, 10, 9);
        let first = complete(&store, "alice", "steps", now).expect("first");
        assert!(!first.all_daily_complete);
        assert!(!first.streak_incremented);
        assert_eq!(store.get_user("alice").unwrap().streak, 0);

        let second = complete(&store, "alice", "water", now).expect("second");
        assert!(second.all_daily_complete);
        assert!(second.streak_incremented);
        assert_eq!(store.get_user("alice").unwrap().streak, 1);
    }

    #[test]
    fn weekly_quest_ignores_streak_machinery() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("hydrate", "Hydrate", QuestKind::Weekly, 75))
            .expect("quest");

        let outcome = complete(&store, "alice", "hydrate", at(2026, 8, 12, 9)).expect("complete");
        assert!(!outcome.all_daily_complete);
        assert!(!outcome.streak_incremented);

        // Same ISO week: still closed.
        let err = complete(&store, "alice", "hydrate", at(2026, 8, 14, 9)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted(_)));

        // Next ISO week re-opens it.
        complete(&store, "alice", "hydrate", at(2026, 8, 17, 9)).expect("next week");
    }

    #[test]
    fn inactive_quest_is_invisible() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("old", "Retired", QuestKind::Daily, 10).inactive())
            .expect("quest");
        let err = complete(&store, "alice", "old", at(2026, 8, 10, 9)).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(quests_for(&store, "alice", at(2026, 8, 10, 9))
            .expect("list")
            .is_empty());
    }

    #[test]
    fn community_quest_requires_membership_and_live_event() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_community(CommunityRecord::new("runners", "Runners", ""))
            .expect("community");
        store
            .put_community_quest(CommunityQuestRecord::new(
                "marathon",
                "runners",
                "Marathon Month",
                200,
                at(2026, 8, 10, 0),
                at(2026, 8, 20, 0),
            ))
            .expect("quest");

        // Not a member yet.
        let err = complete_community(&store, "alice", "marathon", at(2026, 8, 12, 0)).unwrap_err();
        assert!(matches!(err, EngineError::NotAMember(_)));

        store
            .update_user("alice", |_, user| {
                user.communities.push("runners".to_string());
                Ok(())
            })
            .expect("join");

        // Before the window opens.
        let err = complete_community(&store, "alice", "marathon", at(2026, 8, 9, 23)).unwrap_err();
        assert!(matches!(err, EngineError::EventNotActive(_)));

        // Exactly at event_start: inclusive.
        let outcome =
            complete_community(&store, "alice", "marathon", at(2026, 8, 10, 0)).expect("live");
        assert_eq!(outcome.points_added, 200);

        // Once per event.
        let err = complete_community(&store, "alice", "marathon", at(2026, 8, 15, 0)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted(_)));
    }

    #[test]
    fn reset_clears_only_the_requested_category() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 10))
            .expect("q1");
        store
            .put_quest(QuestRecord::new("hydrate", "Hydrate", QuestKind::Weekly, 10))
            .expect("q2");

        let now = at(2026, 8, 10, 9);
        complete(&store, "alice", "steps", now).expect("daily");
        complete(&store, "alice", "hydrate", now).expect("weekly");

        let cleared = reset(&store, "alice", ResetCategory::Daily).expect("reset");
        assert_eq!(cleared, 1);

        let user = store.get_user("alice").expect("get");
        assert_eq!(user.completions.len(), 1);
        assert!(user.completions[0].window.starts_with("weekly:"));

        // Daily quest can be completed again; points accrue a second time
        // only because the fact was administratively cleared.
        complete(&store, "alice", "steps", now).expect("re-complete");
    }

    #[test]
    fn listing_annotates_completion_state() {
        let (_dir, store) = setup();
        put_user(&store, "alice");
        store
            .put_quest(QuestRecord::new("steps", "Steps", QuestKind::Daily, 10))
            .expect("q1");
        store
            .put_quest(QuestRecord::new("workout", "Workout", QuestKind::Monthly, 30))
            .expect("q2");

        let now = at(2026, 8, 10, 9);
        complete(&store, "alice", "steps", now).expect("complete");

        let listed = quests_for(&store, "alice", now).expect("list");
        assert_eq!(listed.len(), 2);
        let steps = listed.iter().find(|a| a.quest.quest_id == "steps").unwrap();
        assert!(steps.completed);
        assert!(steps.completed_at.is_some());
        let workout = listed.iter().find(|a| a.quest.quest_id == "workout").unwrap();
        assert!(!workout.completed);
    }
}
