//! `tidemark` -- command line front-end for the achievement checklist and
//! the ship upgrade calculator.
//!
//! # Environment variables
//!
//! | Variable               | Default                 | Description                         |
//! |------------------------|-------------------------|-------------------------------------|
//! | `TIDEMARK_API_URL`     | `http://localhost:3000` | Checklist backend base URL          |
//! | `TIDEMARK_DATA_DIR`    | `.tidemark`             | Directory of the local state files  |
//! | `FLUSH_DEBOUNCE_MS`    | `3000`                  | Quiet period before auto-flush      |
//! | `REQUEST_TIMEOUT_SECS` | `30`                    | Per-request HTTP timeout            |
//! | `RUST_LOG`             | `tidemark=info`         | Log filter; logs go to stderr       |

mod admin;
mod checklist;
mod ship;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tidemark_client::api::ChecklistApi;
use tidemark_client::config::ClientConfig;
use tidemark_client::store::FileStore;
use tidemark_core::achievement::ChecklistFilter;
use tidemark_core::resources::Currency;
use tidemark_core::types::AchievementId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tidemark", version)]
#[command(about = "Hidden achievement checklist and ship upgrade calculator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with nickname and password
    Login {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        password: String,
        /// Password confirmation (defaults to --password)
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Add a password to an existing nickname-only account
    SetPassword {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Forget the stored token and nickname
    Logout,
    /// Show the active identity
    Whoami,
    /// Track progress under a nickname without signing in
    Use { nickname: String },
    /// Show the checklist
    List {
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        /// Case-insensitive search over name and content
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        json: bool,
    },
    /// Flip the completion state of achievements and sync
    Toggle {
        #[arg(required = true)]
        ids: Vec<AchievementId>,
    },
    /// Send any progress left over from an earlier run
    Sync,
    /// Ship upgrade calculator
    Ship {
        #[command(subcommand)]
        command: ShipCommand,
    },
    /// Achievement administration
    Admin {
        /// Admin key sent as bearer token
        #[arg(long)]
        key: String,
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ShipCommand {
    /// Toggle whether ships are part of the plan
    Select {
        #[arg(required = true)]
        ships: Vec<String>,
    },
    /// Set a ship's current level
    Level { ship: String, level: u32 },
    /// Set the common target level
    Target { level: u32 },
    /// Set the owned quantity of a resource
    Own { resource: String, quantity: u64 },
    /// Show required resources, shortfall and prices
    Show {
        /// Price every shortfall in this currency
        #[arg(long)]
        currency: Option<Currency>,
        /// Price one resource in a currency (`key=currency`, `key=none`
        /// to leave it unpriced); applied after --currency
        #[arg(long = "price", value_name = "KEY=CURRENCY", value_parser = parse_price)]
        prices: Vec<(String, Option<Currency>)>,
        #[arg(long)]
        json: bool,
    },
    /// Restore the default selection
    Reset,
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    /// Check the admin key
    Verify,
    /// Create an achievement
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value_t = tidemark_core::achievement::DEFAULT_ACHIEVEMENT_POINT)]
        point: i32,
        #[arg(long)]
        discord_url: Option<String>,
        #[arg(long)]
        legacy: bool,
    },
    /// Update fields of an achievement
    Update {
        id: AchievementId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        point: Option<i32>,
        /// Empty string clears the URL
        #[arg(long)]
        discord_url: Option<String>,
        #[arg(long)]
        legacy: Option<bool>,
    },
    /// Delete an achievement
    Delete { id: AchievementId },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Completed,
    Incomplete,
}

impl From<FilterArg> for ChecklistFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => Self::All,
            FilterArg::Completed => Self::Completed,
            FilterArg::Incomplete => Self::Incomplete,
        }
    }
}

fn parse_price(raw: &str) -> Result<(String, Option<Currency>), String> {
    let (key, currency) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=CURRENCY, got `{raw}`"))?;
    let currency = match currency.trim() {
        "none" => None,
        other => Some(other.parse::<Currency>().map_err(|e| e.to_string())?),
    };
    Ok((key.trim().to_string(), currency))
}

/// Shared handles every command needs.
pub struct App {
    pub config: ClientConfig,
    pub api: ChecklistApi,
    pub store: FileStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidemark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let api = ChecklistApi::from_config(&config).context("Failed to build HTTP client")?;
    let store = FileStore::new(&config.data_dir);
    tracing::debug!(
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        "Configuration loaded",
    );

    let app = App { config, api, store };

    match args.command {
        Command::Login { nickname, password } => checklist::login(&app, &nickname, &password).await,
        Command::Register {
            nickname,
            password,
            confirm,
        } => {
            let confirm = confirm.unwrap_or_else(|| password.clone());
            checklist::register(&app, &nickname, &password, &confirm).await
        }
        Command::SetPassword {
            nickname,
            password,
            confirm,
        } => {
            let confirm = confirm.unwrap_or_else(|| password.clone());
            checklist::set_password(&app, &nickname, &password, &confirm).await
        }
        Command::Logout => checklist::logout(&app),
        Command::Whoami => checklist::whoami(&app).await,
        Command::Use { nickname } => checklist::use_nickname(&app, &nickname),
        Command::List {
            filter,
            search,
            json,
        } => checklist::list(&app, filter.into(), &search, json).await,
        Command::Toggle { ids } => checklist::toggle(&app, &ids).await,
        Command::Sync => checklist::sync(&app).await,
        Command::Ship { command } => ship::run(&app, command),
        Command::Admin { key, command } => admin::run(&app, &key, command).await,
    }
}
