//! repocache CLI - keeps the local repository cache fresh.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use repocache::entity::platform::Platform;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repocache")]
#[command(version)]
#[command(about = "A local cache of participants' repositories on GitHub, GitLab and Gitea")]
#[command(
    long_about = "repocache keeps a local table of the repositories participants own on \
remote forges. Each refetch picks the linked account whose cached listing is oldest, \
re-reads it page by page, and reconciles renames, transfers and deletions into the table."
)]
#[command(after_long_help = r#"EXAMPLES
    Link a GitHub account to participant 42:
        $ repocache account link 42 github 583231 --user-name octocat

    Refetch the stalest account once:
        $ repocache refetch

    Refetch every minute until Ctrl+C:
        $ repocache schedule --interval 60

    Generate shell completions:
        $ repocache completions bash > ~/.local/share/bash-completion/completions/repocache

CONFIGURATION
    repocache reads configuration from:
      1. ~/.config/repocache/config.toml (or $XDG_CONFIG_HOME/repocache/config.toml)
      2. ./repocache.toml
      3. Environment variables (REPOCACHE_* prefix, e.g., REPOCACHE_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOCACHE_DATABASE_URL    Database connection string (default: ~/.local/state/repocache/repocache.db)
    REPOCACHE_GITHUB_TOKEN    GitHub personal access token
    REPOCACHE_GITLAB_TOKEN    GitLab personal access token
    REPOCACHE_GITEA_TOKEN     Gitea/Forgejo personal access token
    RUST_LOG                  Log filter (default: repocache=info,repocache_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Refetch the account with the stalest cached listing, once
    Refetch {
        /// Abort and roll back the run after this many seconds (default from config or 300)
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Refetch repeatedly on a fixed interval until Ctrl+C
    Schedule {
        /// Seconds between runs (default from config or 60)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Refetch one participant's account now, whether or not it is stale
    Fetch {
        /// Participant id
        participant: i64,
        /// Platform (github, gitlab, gitea)
        platform: Platform,
    },
    /// Manage linked accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// List a participant's cached repositories
    Repos {
        /// Participant id
        participant: i64,
        /// Only show this platform
        #[arg(short, long)]
        platform: Option<Platform>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Link a remote account to a participant
    Link {
        /// Participant id
        participant: i64,
        /// Platform (github, gitlab, gitea)
        platform: Platform,
        /// Account id on the platform
        user_id: String,
        /// Login name on the platform (required to list GitHub and Gitea repos without a token)
        #[arg(short = 'u', long)]
        user_name: Option<String>,
        /// Display name
        #[arg(short, long)]
        display_name: Option<String>,
    },
    /// List a participant's linked accounts
    List {
        /// Participant id
        participant: i64,
    },
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    if !repocache::db::is_sqlite_file_url(database_url) {
        return Ok(());
    }

    let db_path = database_url.trim_start_matches("sqlite://");
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("repocache=info,repocache_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle commands that don't require database access first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();
    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set REPOCACHE_DATABASE_URL")?;
    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Refetch { timeout } => {
            commands::refetch::handle_refetch(&config, &database_url, timeout).await?;
        }
        Commands::Schedule { interval } => {
            commands::refetch::handle_schedule(&config, &database_url, interval).await?;
        }
        Commands::Fetch {
            participant,
            platform,
        } => {
            commands::refetch::handle_fetch(&config, &database_url, participant, platform).await?;
        }
        Commands::Account { action } => {
            commands::accounts::handle_account(action, &database_url).await?;
        }
        Commands::Repos {
            participant,
            platform,
        } => {
            commands::accounts::handle_repos(&database_url, participant, platform).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
