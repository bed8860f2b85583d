//! Gamification accounting engine.
//!
//! Owns points balances, quest completion state, streak and tier
//! derivation, leaderboard ranking, community event windows, and store
//! purchase pricing. The [`service::GameService`] facade is the surface
//! clients consume; the submodules hold the logic behind it.

pub mod errors;
pub mod events;
pub mod leaderboard;
pub mod ledger;
pub mod quest;
pub mod seed;
pub mod service;
pub mod shop;
pub mod storage;
pub mod streak;
pub mod types;

pub use errors::EngineError;
pub use events::{countdown_label, EventStatus};
pub use leaderboard::{rank, standings};
pub use ledger::{credit, debit, roll_week};
pub use quest::{complete, complete_community, quests_for, reset, ResetCategory};
pub use seed::seed_catalog_if_needed;
pub use service::GameService;
pub use shop::{claim_reward, products_for, purchase, quote, PricedProduct, Quote};
pub use storage::{GameStore, GameStoreBuilder};
pub use streak::{evaluate, tier_info};
pub use types::*;
