use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const QUEST_SCHEMA_VERSION: u8 = 1;
pub const COMMUNITY_QUEST_SCHEMA_VERSION: u8 = 1;
pub const COMMUNITY_SCHEMA_VERSION: u8 = 1;
pub const REWARD_SCHEMA_VERSION: u8 = 1;
pub const PRODUCT_SCHEMA_VERSION: u8 = 1;
pub const PURCHASE_SCHEMA_VERSION: u8 = 1;
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// Recurrence category of a quest. Each kind defines its own eligibility
/// window: a quest can be completed at most once per window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Daily,
    Weekly,
    Monthly,
}

impl QuestKind {
    /// Key identifying the eligibility window containing `today`.
    /// Daily windows roll at midnight, weekly windows at the ISO week
    /// boundary (Monday), monthly windows at the first of the month.
    pub fn window_key(&self, today: NaiveDate) -> String {
        match self {
            QuestKind::Daily => format!("daily:{}", today.format("%Y-%m-%d")),
            QuestKind::Weekly => {
                let iso = today.iso_week();
                format!("weekly:{}-W{:02}", iso.year(), iso.week())
            }
            QuestKind::Monthly => format!("monthly:{}", today.format("%Y-%m")),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestKind::Daily => "daily",
            QuestKind::Weekly => "weekly",
            QuestKind::Monthly => "monthly",
        }
    }
}

/// Discount bracket derived purely from streak length. Never persisted;
/// always recomputed via [`Tier::from_streak`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    /// Lower streak bound of each bracket, inclusive.
    pub fn min_streak(&self) -> u32 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 7,
            Tier::Gold => 30,
            Tier::Platinum => 90,
            Tier::Diamond => 180,
        }
    }

    pub fn from_streak(streak: u32) -> Self {
        match streak {
            0..=6 => Tier::Bronze,
            7..=29 => Tier::Silver,
            30..=89 => Tier::Gold,
            90..=179 => Tier::Platinum,
            _ => Tier::Diamond,
        }
    }

    /// Store discount in whole percent.
    pub fn discount_percent(&self) -> u8 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 5,
            Tier::Gold => 10,
            Tier::Platinum => 15,
            Tier::Diamond => 20,
        }
    }

    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Bronze => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Gold),
            Tier::Gold => Some(Tier::Platinum),
            Tier::Platinum => Some(Tier::Diamond),
            Tier::Diamond => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
        }
    }
}

/// A per-(user, quest) completion fact, scoped to one eligibility window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestCompletion {
    pub quest_id: String,
    /// Window key from [`QuestKind::window_key`], or `event:<quest_id>`
    /// for community quests (one completion per event).
    pub window: String,
    pub completed_at: DateTime<Utc>,
}

/// Authoritative per-user accounting record. All balances, streak state
/// and completion facts live on this one record so a single store write
/// commits a multi-field update atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    /// Spendable balance, never negative.
    pub points: i64,
    /// Total ever earned; only increases.
    pub lifetime_points: i64,
    /// Earned since `week_start`; zeroed at the week boundary.
    pub weekly_points: i64,
    /// Consecutive qualifying days (all daily quests completed).
    pub streak: u32,
    /// One-time token forgiving a single missed day.
    #[serde(default)]
    pub streak_freeze_available: bool,
    pub last_daily_completion: Option<NaiveDate>,
    /// Monday anchor of the current weekly-points window.
    pub week_start: NaiveDate,
    /// Communities this user has joined.
    #[serde(default)]
    pub communities: Vec<String>,
    /// Completion facts for current (and recently expired) windows.
    #[serde(default)]
    pub completions: Vec<QuestCompletion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(user_id: &str, username: &str, today: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            points: 0,
            lifetime_points: 0,
            weekly_points: 0,
            streak: 0,
            streak_freeze_available: false,
            last_daily_completion: None,
            week_start: week_start_of(today),
            communities: Vec::new(),
            completions: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Current discount tier, derived from streak on every read.
    pub fn tier(&self) -> Tier {
        Tier::from_streak(self.streak)
    }

    pub fn is_member_of(&self, community_id: &str) -> bool {
        self.communities.iter().any(|c| c == community_id)
    }

    pub fn has_completed(&self, quest_id: &str, window: &str) -> bool {
        self.completions
            .iter()
            .any(|c| c.quest_id == quest_id && c.window == window)
    }

    pub fn record_completion(&mut self, quest_id: &str, window: &str, at: DateTime<Utc>) {
        // A new window supersedes any stale fact for the same quest.
        self.completions
            .retain(|c| !(c.quest_id == quest_id && c.window != window));
        self.completions.push(QuestCompletion {
            quest_id: quest_id.to_string(),
            window: window.to_string(),
            completed_at: at,
        });
    }
}

/// Monday anchor of the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Quest template definition. Completion is a per-(user, quest) fact on
/// the [`UserRecord`], never a mutable field here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub quest_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: QuestKind,
    /// Points credited on completion; always positive.
    pub points_reward: i64,
    /// Inactive quests are hidden and cannot be completed.
    #[serde(default = "default_true")]
    pub active: bool,
    pub schema_version: u8,
}

fn default_true() -> bool {
    true
}

impl QuestRecord {
    pub fn new(quest_id: &str, name: &str, kind: QuestKind, points_reward: i64) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            kind,
            points_reward,
            active: true,
            schema_version: QUEST_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// One-off quest tied to a community event window. Only members of the
/// owning community may complete it, and only while the event is live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityQuestRecord {
    pub quest_id: String,
    pub community_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_reward: i64,
    /// Inclusive event bounds; `event_start < event_end` is enforced at
    /// insert time.
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub schema_version: u8,
}

impl CommunityQuestRecord {
    pub fn new(
        quest_id: &str,
        community_id: &str,
        name: &str,
        points_reward: i64,
        event_start: DateTime<Utc>,
        event_end: DateTime<Utc>,
    ) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            community_id: community_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            points_reward,
            event_start,
            event_end,
            schema_version: COMMUNITY_QUEST_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Window key for the per-event completion fact.
    pub fn window_key(&self) -> String {
        format!("event:{}", self.quest_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityRecord {
    pub community_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema_version: u8,
}

impl CommunityRecord {
    pub fn new(community_id: &str, name: &str, description: &str) -> Self {
        Self {
            community_id: community_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            schema_version: COMMUNITY_SCHEMA_VERSION,
        }
    }
}

/// Claimable reward: a flat points debit with no tier discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardRecord {
    pub reward_id: String,
    pub name: String,
    pub cost: i64,
    pub schema_version: u8,
}

impl RewardRecord {
    pub fn new(reward_id: &str, name: &str, cost: i64) -> Self {
        Self {
            reward_id: reward_id.to_string(),
            name: name.to_string(),
            cost,
            schema_version: REWARD_SCHEMA_VERSION,
        }
    }
}

/// Store catalog entry. Prices are in currency minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreProductRecord {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub base_price: i64,
    pub schema_version: u8,
}

impl StoreProductRecord {
    pub fn new(product_id: &str, name: &str, category: &str, base_price: i64) -> Self {
        Self {
            product_id: product_id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            base_price,
            schema_version: PRODUCT_SCHEMA_VERSION,
        }
    }
}

/// Immutable purchase receipt, appended to the audit trail at the moment
/// of sale. Captures the tier and discount actually applied, not whatever
/// the client last saw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    pub purchase_id: String,
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    pub original_price: i64,
    pub discount_applied: u8,
    pub final_price: i64,
    pub tier_at_purchase: Tier,
    pub purchased_at: DateTime<Utc>,
    pub schema_version: u8,
}

/// Leaderboard metric tabs exposed to the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Points,
    WeeklyPoints,
    Streak,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Points => "points",
            Metric::WeeklyPoints => "weekly_points",
            Metric::Streak => "streak",
        }
    }
}

/// Which population a leaderboard ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardScope {
    Global,
    Community(String),
}

impl LeaderboardScope {
    pub fn key(&self) -> String {
        match self {
            LeaderboardScope::Global => "global".to_string(),
            LeaderboardScope::Community(id) => format!("community:{}", id),
        }
    }
}

/// Directional rank movement since the start of the scoring period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RankChange {
    Up,
    Down,
    Same,
}

/// Derived standings row; recomputed from user records on every read and
/// never persisted (previous_rank comes from the period snapshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub score: i64,
    pub streak: u32,
    pub rank: u32,
    pub previous_rank: Option<u32>,
    pub change: RankChange,
}

/// Baseline ranks captured at the first read of a scoring period, kept
/// only so standings can show directional movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankSnapshot {
    /// Period key, e.g. `2026-08-30` or `2026-W35`.
    pub period: String,
    pub ranks: Vec<(String, u32)>,
    pub captured_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl RankSnapshot {
    pub fn rank_of(&self, user_id: &str) -> Option<u32> {
        self.ranks
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, r)| *r)
    }
}

/// Client projection of a user: the dashboard fields, tier included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub lifetime_points: i64,
    pub weekly_points: i64,
    pub streak: u32,
    pub tier: Tier,
    pub streak_freeze_available: bool,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            points: user.points,
            lifetime_points: user.lifetime_points,
            weekly_points: user.weekly_points,
            streak: user.streak,
            tier: user.tier(),
            streak_freeze_available: user.streak_freeze_available,
        }
    }
}

/// Tier panel projection: current bracket plus distance to the next one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierInfo {
    pub tier: Tier,
    pub discount_percentage: u8,
    pub current_streak: u32,
    pub next_tier: Option<Tier>,
    pub streaks_to_next_tier: Option<u32>,
}

/// A quest annotated with one user's completion state for the current
/// eligibility window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotatedQuest {
    pub quest: QuestRecord,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of a quest completion, surfaced to the client so it can decide
/// whether to show milestone/streak notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    pub points_added: i64,
    pub all_daily_complete: bool,
    pub streak_incremented: bool,
}
