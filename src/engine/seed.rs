//! Starter catalog: the quests, store products, rewards and communities
//! a fresh deployment ships with. Seeding is idempotent; a non-empty
//! catalog is never touched.

use chrono::{Duration, Utc};
use log::info;

use crate::engine::errors::EngineError;
use crate::engine::storage::GameStore;
use crate::engine::types::{
    CommunityQuestRecord, CommunityRecord, QuestKind, QuestRecord, RewardRecord,
    StoreProductRecord,
};

/// Insert the starter catalog if no catalog records exist yet. Returns
/// the number of records inserted (0 when the catalog was already
/// populated).
pub fn seed_catalog_if_needed(store: &GameStore) -> Result<usize, EngineError> {
    if !store.catalog_is_empty()? {
        return Ok(0);
    }

    let mut inserted = 0usize;

    for quest in starter_quests() {
        store.put_quest(quest)?;
        inserted += 1;
    }
    for product in starter_products() {
        store.put_product(product)?;
        inserted += 1;
    }
    for reward in starter_rewards() {
        store.put_reward(reward)?;
        inserted += 1;
    }
    for community in starter_communities() {
        store.put_community(community)?;
        inserted += 1;
    }
    for quest in starter_community_quests() {
        store.put_community_quest(quest)?;
        inserted += 1;
    }

    info!("seeded starter catalog ({} records)", inserted);
    Ok(inserted)
}

pub fn starter_quests() -> Vec<QuestRecord> {
    vec![
        QuestRecord::new("daily_steps", "Daily Challenge", QuestKind::Daily, 50)
            .with_description("Take 10,000 steps today"),
        QuestRecord::new("daily_water", "Hydration Check", QuestKind::Daily, 25)
            .with_description("Drink 8 glasses of water"),
        QuestRecord::new("weekly_water", "Weekly Challenge", QuestKind::Weekly, 150)
            .with_description("Drink 56 glasses of water this week"),
        QuestRecord::new("monthly_exercise", "Monthly Challenge", QuestKind::Monthly, 500)
            .with_description("Exercise for 900 minutes this month"),
    ]
}

pub fn starter_products() -> Vec<StoreProductRecord> {
    vec![
        StoreProductRecord::new("yoga_mat", "Yoga Mat", "gear", 1200),
        StoreProductRecord::new("water_bottle", "Insulated Bottle", "gear", 800),
        StoreProductRecord::new("workout_tee", "Workout Tee", "apparel", 600),
        StoreProductRecord::new("running_socks", "Running Socks", "apparel", 300),
        StoreProductRecord::new("protein_bar_box", "Protein Bar Box", "nutrition", 450),
        StoreProductRecord::new("smoothie_voucher", "Smoothie Voucher", "nutrition", 250),
    ]
}

pub fn starter_rewards() -> Vec<RewardRecord> {
    vec![
        RewardRecord::new("bronze_badge", "Bronze Badge", 100),
        RewardRecord::new("week_off_shield", "Rest Day Shield", 250),
        RewardRecord::new("founders_title", "Founders Title", 1000),
    ]
}

pub fn starter_communities() -> Vec<CommunityRecord> {
    vec![
        CommunityRecord::new("morning_runners", "Morning Runners", "Early birds logging miles"),
        CommunityRecord::new("yoga_circle", "Yoga Circle", "Daily stretch and balance"),
    ]
}

/// Community events open a week-long window starting at seed time, so a
/// fresh install has something live to complete.
pub fn starter_community_quests() -> Vec<CommunityQuestRecord> {
    let now = Utc::now();
    vec![
        CommunityQuestRecord::new(
            "group_5k",
            "morning_runners",
            "Group 5K",
            300,
            now,
            now + Duration::days(7),
        )
        .with_description("Run 5 kilometers together this week"),
        CommunityQuestRecord::new(
            "sunrise_flow",
            "yoga_circle",
            "Sunrise Flow",
            200,
            now,
            now + Duration::days(7),
        )
        .with_description("Join the sunrise session"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::storage::GameStoreBuilder;
    use tempfile::TempDir;

    #[test]
    fn seeding_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = GameStoreBuilder::new(dir.path()).open().expect("store");
            assert!(!store.catalog_is_empty().expect("catalog check"));
            store.get_quest("daily_steps").expect("seeded quest");
            store.get_product("yoga_mat").expect("seeded product");
            store.get_reward("bronze_badge").expect("seeded reward");
            store.get_community("morning_runners").expect("seeded community");
        }

        let store = GameStoreBuilder::new(dir.path())
            .without_catalog_seed()
            .open()
            .expect("reopen");
        let count = seed_catalog_if_needed(&store).expect("seed check");
        assert_eq!(count, 0, "should not reseed a populated catalog");
    }

    #[test]
    fn starter_community_quests_are_live_at_seed_time() {
        let now = Utc::now();
        for quest in starter_community_quests() {
            assert!(quest.event_start <= now + Duration::seconds(1));
            assert!(quest.event_end > now);
        }
    }
}
