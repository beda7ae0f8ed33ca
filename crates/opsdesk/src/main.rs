//! `opsdesk` - back office email and credential tool
//!
//! Reads the shared inbox and sent folders through the automation backend
//! with local caching, and keeps marketplace and carrier API tokens fresh.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::Context;
use commands::mail::ListArgs;
use config::AppConfig;

#[derive(Parser)]
#[command(name = "opsdesk")]
#[command(about = "Back office email cache and API token upkeep")]
#[command(version)]
#[command(after_help = "Examples:
  opsdesk inbox --search invoice --range last-7   Recent invoice emails
  opsdesk sent --count 100                        Load two pages of sent mail
  opsdesk show inbox 18c2f0a9d4e                  Read one email
  opsdesk tokens watch                            Keep API tokens fresh")]
struct Cli {
    /// Config file (defaults to <config dir>/opsdesk/config.json)
    #[arg(long, global = true, env = "OPSDESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FolderArg {
    Inbox,
    Sent,
}

impl From<FolderArg> for opsdesk_core::Folder {
    fn from(folder: FolderArg) -> Self {
        match folder {
            FolderArg::Inbox => Self::Inbox,
            FolderArg::Sent => Self::Sent,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the inbox
    Inbox(ListArgs),

    /// List sent mail
    Sent(ListArgs),

    /// Show one email with its body
    #[command(after_help = "Example: opsdesk show sent 18c2f0a9d4e")]
    Show {
        /// Folder the email lives in
        folder: FolderArg,
        /// Provider message id
        id: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or refresh API tokens
    Tokens {
        #[command(subcommand)]
        action: TokenCommands,
    },

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Show each token's state and expiry
    Status,
    /// Refresh tokens that are absent or stale
    Refresh {
        /// Refresh even if the current token is still valid
        #[arg(short, long)]
        force: bool,
    },
    /// Refresh on a timer until Ctrl-C; press Enter to trigger a staleness check
    Watch,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Drop cached emails and lists
    Clear {
        /// Only this folder
        #[arg(long)]
        folder: Option<FolderArg>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdesk=info,opsdesk_core=info,opsdesk_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run(Cli::parse()).await {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            1
        }
    };
    // Exit explicitly: a pending stdin read from `tokens watch` would
    // otherwise hold the runtime open.
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).await?;
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Inbox(args) => commands::mail::list(&ctx, opsdesk_core::Folder::Inbox, &args).await,
        Commands::Sent(args) => commands::mail::list(&ctx, opsdesk_core::Folder::Sent, &args).await,
        Commands::Show { folder, id, json } => {
            commands::mail::show(&ctx, folder.into(), &id, json).await
        }
        Commands::Tokens { action } => match action {
            TokenCommands::Status => commands::tokens::status(&ctx),
            TokenCommands::Refresh { force } => commands::tokens::refresh(&ctx, force).await,
            TokenCommands::Watch => {
                info!("Starting token watch");
                commands::tokens::watch(&ctx).await
            }
        },
        Commands::Cache { action } => match action {
            CacheCommands::Clear { folder } => {
                commands::cache::clear(&ctx, folder.map(Into::into));
                Ok(())
            }
        },
    }
}

/// Prints a failure. Expired sessions get a hint instead of an error chain.
fn report(err: &anyhow::Error) {
    let session_expired = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<opsdesk_core::Error>())
        .any(opsdesk_core::Error::is_auth_error);
    if session_expired {
        eprintln!("Email backend session expired; sign in to the automation backend again.");
    } else {
        eprintln!("error: {err:#}");
    }
}
