//! Binary entrypoint for the questledger CLI.
//!
//! Commands:
//! - `init` - create a starter `questledger.toml` and seed the catalog
//! - `status` - print user and catalog counts
//! - `register --user <id> --name <username>` - create a user record
//! - `profile --user <id>` - print the user projection as JSON
//! - `complete --user <id> --quest <id>` - drive a quest completion
//! - `leaderboard [--metric points|weekly|streak]` - print standings
//!
//! See the library crate docs for module-level details: `questledger::`.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use questledger::config::Config;
use questledger::engine::{
    GameService, GameStoreBuilder, LeaderboardScope, Metric, RankChange,
};

#[derive(Parser)]
#[command(name = "questledger")]
#[command(about = "Gamification accounting engine: points, quests, streaks, and leaderboards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "questledger.toml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default config file and seed the starter catalog
    Init,
    /// Show store status and record counts
    Status,
    /// Register a user record for an authenticated identity
    Register {
        /// Stable user identifier from the identity provider
        #[arg(short, long)]
        user: String,
        /// Display username
        #[arg(short, long)]
        name: String,
    },
    /// Print a user's dashboard projection as JSON
    Profile {
        #[arg(short, long)]
        user: String,
    },
    /// Complete a quest for a user
    Complete {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        quest: String,
    },
    /// Print current standings
    Leaderboard {
        #[arg(short, long, value_enum, default_value_t = MetricArg::Points)]
        metric: MetricArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Points,
    Weekly,
    Streak,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Points => Metric::Points,
            MetricArg::Weekly => Metric::WeeklyPoints,
            MetricArg::Streak => Metric::Streak,
        }
    }
}

fn open_service(config: &Config) -> Result<GameService> {
    let store = GameStoreBuilder::new(&config.storage.data_dir)
        .lock_policy(config.locking.max_retries, config.locking.backoff())
        .open()
        .with_context(|| format!("opening store at {}", config.storage.data_dir))?;
    Ok(GameService::new(store))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => Config::default(),
        _ => Config::load(&cli.config)
            .with_context(|| format!("loading {} (run `questledger init` first)", cli.config))?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config)?;
            let service = open_service(&config)?;
            let users = service.store().list_user_ids()?.len();
            info!("initialized store at {} ({} users)", config.storage.data_dir, users);
            println!("Wrote {} and seeded catalog at {}", cli.config, config.storage.data_dir);
        }
        Commands::Status => {
            let service = open_service(&config)?;
            let users = service.store().list_user_ids()?.len();
            let quests = service.store().list_quests()?.len();
            let products = service.store().list_products()?.len();
            let rewards = service.fetch_rewards()?.len();
            let communities = service.list_communities()?.len();
            println!("Users:       {}", users);
            println!("Quests:      {}", quests);
            println!("Products:    {}", products);
            println!("Rewards:     {}", rewards);
            println!("Communities: {}", communities);
        }
        Commands::Register { user, name } => {
            let service = open_service(&config)?;
            let profile = service.register_user(&user, &name)?;
            println!("Registered {} ({})", profile.user_id, profile.username);
        }
        Commands::Profile { user } => {
            let service = open_service(&config)?;
            let profile = service.fetch_user(&user)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Complete { user, quest } => {
            let service = open_service(&config)?;
            let outcome = service.complete_quest(&user, &quest)?;
            println!(
                "+{} points{}{}",
                outcome.points_added,
                if outcome.all_daily_complete {
                    " | all dailies complete"
                } else {
                    ""
                },
                if outcome.streak_incremented {
                    " | streak +1"
                } else {
                    ""
                }
            );
        }
        Commands::Leaderboard { metric } => {
            let service = open_service(&config)?;
            let board = service.fetch_leaderboard(&LeaderboardScope::Global, metric.into())?;
            for entry in board {
                let arrow = match entry.change {
                    RankChange::Up => "↑",
                    RankChange::Down => "↓",
                    RankChange::Same => "−",
                };
                println!(
                    "{:>3}. {:<20} {:>8}  {}",
                    entry.rank, entry.username, entry.score, arrow
                );
            }
        }
    }

    Ok(())
}
