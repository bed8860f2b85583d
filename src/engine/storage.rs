use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use chrono::Utc;
use sled::IVec;

use crate::engine::errors::EngineError;
use crate::engine::types::{
    CommunityQuestRecord, CommunityRecord, PurchaseRecord, QuestRecord, RankSnapshot, RewardRecord,
    StoreProductRecord, UserRecord, COMMUNITY_QUEST_SCHEMA_VERSION, COMMUNITY_SCHEMA_VERSION,
    PRODUCT_SCHEMA_VERSION, PURCHASE_SCHEMA_VERSION, QUEST_SCHEMA_VERSION, REWARD_SCHEMA_VERSION,
    SNAPSHOT_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_USERS: &str = "ql_users";
const TREE_CATALOG: &str = "ql_catalog";
const TREE_PURCHASES: &str = "ql_purchases";
const TREE_SNAPSHOTS: &str = "ql_snapshots";

/// Default per-user lock acquisition budget.
const DEFAULT_LOCK_RETRIES: u32 = 50;
const DEFAULT_LOCK_BACKOFF_MS: u64 = 5;

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom
/// paths and without the starter catalog.
pub struct GameStoreBuilder {
    path: PathBuf,
    ensure_catalog_seed: bool,
    lock_retries: u32,
    lock_backoff: Duration,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_catalog_seed: true,
            lock_retries: DEFAULT_LOCK_RETRIES,
            lock_backoff: Duration::from_millis(DEFAULT_LOCK_BACKOFF_MS),
        }
    }

    /// Opt out of seeding the starter catalog during initialization
    /// (useful for targeted tests).
    pub fn without_catalog_seed(mut self) -> Self {
        self.ensure_catalog_seed = false;
        self
    }

    /// Override the per-user lock retry budget and backoff.
    pub fn lock_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.lock_retries = retries;
        self.lock_backoff = backoff;
        self
    }

    pub fn open(self) -> Result<GameStore, EngineError> {
        GameStore::open_with_options(
            self.path,
            self.ensure_catalog_seed,
            self.lock_retries,
            self.lock_backoff,
        )
    }
}

type LockRegistry = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Sled-backed persistence for engine state: user records, catalog
/// definitions, the purchase audit trail, and rank snapshots.
pub struct GameStore {
    _db: sled::Db,
    users: sled::Tree,
    catalog: sled::Tree,
    purchases: sled::Tree,
    snapshots: sled::Tree,
    locks: LockRegistry,
    lock_retries: u32,
    lock_backoff: Duration,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`. When `seed_catalog`
    /// is true the starter quests/products/rewards are inserted if the
    /// catalog is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::open_with_options(
            path,
            true,
            DEFAULT_LOCK_RETRIES,
            Duration::from_millis(DEFAULT_LOCK_BACKOFF_MS),
        )
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        seed_catalog: bool,
        lock_retries: u32,
        lock_backoff: Duration,
    ) -> Result<Self, EngineError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let users = db.open_tree(TREE_USERS)?;
        let catalog = db.open_tree(TREE_CATALOG)?;
        let purchases = db.open_tree(TREE_PURCHASES)?;
        let snapshots = db.open_tree(TREE_SNAPSHOTS)?;
        let store = Self {
            _db: db,
            users,
            catalog,
            purchases,
            snapshots,
            locks: Mutex::new(HashMap::new()),
            lock_retries,
            lock_backoff,
        };

        if seed_catalog {
            crate::engine::seed::seed_catalog_if_needed(&store)?;
        }

        Ok(store)
    }

    fn user_key(user_id: &str) -> Vec<u8> {
        format!("users:{}", user_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EngineError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    // ------------------------------------------------------------------
    // Per-user exclusivity
    // ------------------------------------------------------------------

    /// Run `f` while holding this user's mutation lock. Acquisition is
    /// bounded: after the retry budget is exhausted the call fails with
    /// `Conflict` instead of blocking indefinitely. Cross-user calls use
    /// distinct locks and never contend.
    pub fn with_user_lock<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let cell = {
            let mut registry = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            registry
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let mut attempts = 0u32;
        loop {
            match cell.try_lock() {
                Ok(_guard) => return f(self),
                Err(TryLockError::Poisoned(poisoned)) => {
                    let _guard = poisoned.into_inner();
                    return f(self);
                }
                Err(TryLockError::WouldBlock) => {
                    attempts += 1;
                    if attempts > self.lock_retries {
                        return Err(EngineError::Conflict(user_id.to_string()));
                    }
                    std::thread::sleep(self.lock_backoff);
                }
            }
        }
    }

    /// Read-modify-write a user record under its lock. The record is
    /// written back only if `f` succeeds, so a failed operation leaves no
    /// partial mutation behind.
    pub fn update_user<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&Self, &mut UserRecord) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.with_user_lock(user_id, |store| {
            let mut user = store.get_user(user_id)?;
            let out = f(store, &mut user)?;
            store.put_user(user)?;
            Ok(out)
        })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert or update a user record.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), EngineError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let key = Self::user_key(&user.user_id);
        let bytes = Self::serialize(&user)?;
        self.users.insert(key, bytes)?;
        self.users.flush()?;
        Ok(())
    }

    /// Fetch a user record by identifier.
    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, EngineError> {
        let key = Self::user_key(user_id);
        let Some(bytes) = self.users.get(&key)? else {
            return Err(EngineError::NotFound(format!("user: {}", user_id)));
        };
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn user_exists(&self, user_id: &str) -> Result<bool, EngineError> {
        Ok(self.users.contains_key(Self::user_key(user_id))?)
    }

    /// List all user identifiers currently stored.
    pub fn list_user_ids(&self) -> Result<Vec<String>, EngineError> {
        let mut ids = Vec::new();
        for entry in self.users.scan_prefix(b"users:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(user_id) = text.strip_prefix("users:") {
                ids.push(user_id.to_string());
            }
        }
        Ok(ids)
    }

    /// Load every user record (consistent read for leaderboard scans).
    pub fn list_users(&self) -> Result<Vec<UserRecord>, EngineError> {
        let mut users = Vec::new();
        for entry in self.users.scan_prefix(b"users:") {
            let (_, bytes) = entry?;
            users.push(Self::deserialize(bytes)?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Quest catalog
    // ------------------------------------------------------------------

    pub fn put_quest(&self, mut quest: QuestRecord) -> Result<(), EngineError> {
        if quest.points_reward <= 0 {
            return Err(EngineError::InvalidRecord(format!(
                "quest {} has non-positive reward",
                quest.quest_id
            )));
        }
        quest.schema_version = QUEST_SCHEMA_VERSION;
        let key = format!("quests:{}", quest.quest_id).into_bytes();
        let bytes = Self::serialize(&quest)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_quest(&self, quest_id: &str) -> Result<QuestRecord, EngineError> {
        let key = format!("quests:{}", quest_id).into_bytes();
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EngineError::NotFound(format!("quest: {}", quest_id)));
        };
        let record: QuestRecord = Self::deserialize(bytes)?;
        if record.schema_version != QUEST_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "quest",
                expected: QUEST_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn list_quests(&self) -> Result<Vec<QuestRecord>, EngineError> {
        let mut quests = Vec::new();
        for entry in self.catalog.scan_prefix(b"quests:") {
            let (_, bytes) = entry?;
            quests.push(Self::deserialize(bytes)?);
        }
        Ok(quests)
    }

    // ------------------------------------------------------------------
    // Community quests and communities
    // ------------------------------------------------------------------

    pub fn put_community_quest(&self, mut quest: CommunityQuestRecord) -> Result<(), EngineError> {
        if quest.points_reward <= 0 {
            return Err(EngineError::InvalidRecord(format!(
                "community quest {} has non-positive reward",
                quest.quest_id
            )));
        }
        if quest.event_start >= quest.event_end {
            return Err(EngineError::InvalidRecord(format!(
                "community quest {} has event_start >= event_end",
                quest.quest_id
            )));
        }
        quest.schema_version = COMMUNITY_QUEST_SCHEMA_VERSION;
        let key = format!("cquests:{}", quest.quest_id).into_bytes();
        let bytes = Self::serialize(&quest)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_community_quest(&self, quest_id: &str) -> Result<CommunityQuestRecord, EngineError> {
        let key = format!("cquests:{}", quest_id).into_bytes();
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EngineError::NotFound(format!("community quest: {}", quest_id)));
        };
        let record: CommunityQuestRecord = Self::deserialize(bytes)?;
        if record.schema_version != COMMUNITY_QUEST_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "community_quest",
                expected: COMMUNITY_QUEST_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Community quests owned by one community.
    pub fn list_community_quests(
        &self,
        community_id: &str,
    ) -> Result<Vec<CommunityQuestRecord>, EngineError> {
        let mut quests = Vec::new();
        for entry in self.catalog.scan_prefix(b"cquests:") {
            let (_, bytes) = entry?;
            let record: CommunityQuestRecord = Self::deserialize(bytes)?;
            if record.community_id == community_id {
                quests.push(record);
            }
        }
        Ok(quests)
    }

    pub fn put_community(&self, mut community: CommunityRecord) -> Result<(), EngineError> {
        community.schema_version = COMMUNITY_SCHEMA_VERSION;
        let key = format!("communities:{}", community.community_id).into_bytes();
        let bytes = Self::serialize(&community)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_community(&self, community_id: &str) -> Result<CommunityRecord, EngineError> {
        let key = format!("communities:{}", community_id).into_bytes();
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EngineError::NotFound(format!("community: {}", community_id)));
        };
        let record: CommunityRecord = Self::deserialize(bytes)?;
        if record.schema_version != COMMUNITY_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "community",
                expected: COMMUNITY_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn list_communities(&self) -> Result<Vec<CommunityRecord>, EngineError> {
        let mut communities = Vec::new();
        for entry in self.catalog.scan_prefix(b"communities:") {
            let (_, bytes) = entry?;
            communities.push(Self::deserialize(bytes)?);
        }
        Ok(communities)
    }

    // ------------------------------------------------------------------
    // Rewards and store products
    // ------------------------------------------------------------------

    pub fn put_reward(&self, mut reward: RewardRecord) -> Result<(), EngineError> {
        if reward.cost <= 0 {
            return Err(EngineError::InvalidRecord(format!(
                "reward {} has non-positive cost",
                reward.reward_id
            )));
        }
        reward.schema_version = REWARD_SCHEMA_VERSION;
        let key = format!("rewards:{}", reward.reward_id).into_bytes();
        let bytes = Self::serialize(&reward)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_reward(&self, reward_id: &str) -> Result<RewardRecord, EngineError> {
        let key = format!("rewards:{}", reward_id).into_bytes();
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EngineError::NotFound(format!("reward: {}", reward_id)));
        };
        let record: RewardRecord = Self::deserialize(bytes)?;
        if record.schema_version != REWARD_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "reward",
                expected: REWARD_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn list_rewards(&self) -> Result<Vec<RewardRecord>, EngineError> {
        let mut rewards = Vec::new();
        for entry in self.catalog.scan_prefix(b"rewards:") {
            let (_, bytes) = entry?;
            rewards.push(Self::deserialize(bytes)?);
        }
        Ok(rewards)
    }

    pub fn put_product(&self, mut product: StoreProductRecord) -> Result<(), EngineError> {
        if product.base_price <= 0 {
            return Err(EngineError::InvalidRecord(format!(
                "product {} has non-positive price",
                product.product_id
            )));
        }
        product.schema_version = PRODUCT_SCHEMA_VERSION;
        let key = format!("products:{}", product.product_id).into_bytes();
        let bytes = Self::serialize(&product)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_product(&self, product_id: &str) -> Result<StoreProductRecord, EngineError> {
        let key = format!("products:{}", product_id).into_bytes();
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EngineError::NotFound(format!("product: {}", product_id)));
        };
        let record: StoreProductRecord = Self::deserialize(bytes)?;
        if record.schema_version != PRODUCT_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "product",
                expected: PRODUCT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn list_products(&self) -> Result<Vec<StoreProductRecord>, EngineError> {
        let mut products = Vec::new();
        for entry in self.catalog.scan_prefix(b"products:") {
            let (_, bytes) = entry?;
            products.push(Self::deserialize(bytes)?);
        }
        Ok(products)
    }

    /// True if any catalog record exists (used to decide whether to seed).
    pub fn catalog_is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.catalog.iter().next().is_none())
    }

    // ------------------------------------------------------------------
    // Purchase audit trail
    // ------------------------------------------------------------------

    /// Append an immutable purchase receipt. Keys embed a nanosecond
    /// timestamp so a prefix scan returns receipts in purchase order,
    /// plus the receipt id so same-tick appends can never collide.
    pub fn append_purchase(&self, mut purchase: PurchaseRecord) -> Result<(), EngineError> {
        purchase.schema_version = PURCHASE_SCHEMA_VERSION;
        let key = format!(
            "purchases:{}:{:020}:{}",
            purchase.user_id,
            next_timestamp_nanos(),
            purchase.purchase_id
        )
        .into_bytes();
        let bytes = Self::serialize(&purchase)?;
        self.purchases.insert(key, bytes)?;
        self.purchases.flush()?;
        Ok(())
    }

    /// Purchase history for one user, newest first.
    pub fn list_purchases(&self, user_id: &str) -> Result<Vec<PurchaseRecord>, EngineError> {
        let prefix = format!("purchases:{}:", user_id);
        let mut purchases = Vec::new();
        for entry in self.purchases.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            purchases.push(Self::deserialize(bytes)?);
        }
        purchases.reverse();
        Ok(purchases)
    }

    // ------------------------------------------------------------------
    // Rank snapshots
    // ------------------------------------------------------------------

    pub fn put_snapshot(
        &self,
        scope_key: &str,
        metric_key: &str,
        mut snapshot: RankSnapshot,
    ) -> Result<(), EngineError> {
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION;
        let key = format!("ranks:{}:{}", scope_key, metric_key).into_bytes();
        let bytes = Self::serialize(&snapshot)?;
        self.snapshots.insert(key, bytes)?;
        self.snapshots.flush()?;
        Ok(())
    }

    pub fn get_snapshot(
        &self,
        scope_key: &str,
        metric_key: &str,
    ) -> Result<Option<RankSnapshot>, EngineError> {
        let key = format!("ranks:{}:{}", scope_key, metric_key).into_bytes();
        match self.snapshots.get(&key)? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }
}
