//! # Questledger - Gamification Accounting Engine
//!
//! Questledger is the accounting core behind a multi-screen gamified
//! client: it owns points balances, quest completion state, streak and
//! tier computation, leaderboard ranking, time-boxed community events,
//! and store purchase pricing. UI, transport encoding, and
//! authentication live elsewhere; callers hand the engine a stable user
//! identifier and consume plain request/response calls.
//!
//! ## Features
//!
//! - **Points Ledger**: spendable balance plus earn-only lifetime and
//!   weekly totals, with lazy weekly rollover at the ISO week boundary.
//! - **Quest State Machine**: daily/weekly/monthly quests completable
//!   once per eligibility window, plus community quests gated on
//!   membership and a live event window.
//! - **Streaks & Tiers**: consecutive-day streak with a one-time freeze
//!   token; discount tier derived purely from streak length.
//! - **Leaderboards**: pure on-demand ranking with deterministic
//!   tie-breaks and per-period rank-delta snapshots.
//! - **Store Pricing**: tier-adjusted quotes re-computed at purchase
//!   time, half-up rounding, immutable purchase audit trail.
//! - **Concurrency**: per-user mutation locks with a bounded retry
//!   budget; cross-user reads never block.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use questledger::engine::GameService;
//!
//! fn main() -> Result<(), questledger::engine::EngineError> {
//!     let service = GameService::open("data/questledger")?;
//!     service.register_user("user-42", "alice")?;
//!     let outcome = service.complete_quest("user-42", "daily_steps")?;
//!     println!("+{} points", outcome.points_added);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - the accounting engine: storage, ledger, quests,
//!   streaks, leaderboards, store pricing, and the service facade
//! - [`config`] - configuration management and validation
//! - [`logutil`] - log sanitization helpers for user-supplied strings

pub mod config;
pub mod engine;
pub mod logutil;
