use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plw")]
#[command(about = "Playlist watch operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Inspect stored subscriptions
    Subs {
        #[command(subcommand)]
        cmd: SubsCmd,
    },

    /// Manage one subscriber's tracked playlist
    Track {
        #[command(subcommand)]
        cmd: TrackCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum SubsCmd {
    /// Print every subscription, one per line.
    List {
        /// Only this platform (e.g. telegram)
        #[arg(long)]
        platform: Option<String>,
    },
}

#[derive(Subcommand)]
enum TrackCmd {
    /// Start tracking a playlist for a chat. Records a silent baseline.
    Set {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,

        /// Playlist URL, spotify:playlist: URI or bare id
        #[arg(long)]
        playlist: String,

        #[arg(long, default_value = "telegram")]
        platform: String,
    },

    /// Stop tracking and drop the chat's stored snapshots.
    Stop {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,

        #[arg(long, default_value = "telegram")]
        platform: String,
    },

    /// Print the chat's tracked playlist and stored track count.
    Status {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,

        #[arg(long, default_value = "telegram")]
        platform: String,
    },

    /// Run one reconcile for the chat and print the changes. Nothing is sent
    /// to the chat.
    Check {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,

        #[arg(long, default_value = "telegram")]
        platform: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = plw_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = plw_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_subscriptions_table={} has_snapshots_table={}",
                        s.ok, s.has_subscriptions_table, s.has_snapshots_table
                    );
                }
                DbCmd::Migrate => {
                    plw_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => commands::config_hash(&paths)?,

        Commands::Subs { cmd } => match cmd {
            SubsCmd::List { platform } => commands::subs::list(platform.as_deref()).await?,
        },

        Commands::Track { cmd } => match cmd {
            TrackCmd::Set {
                chat_id,
                playlist,
                platform,
            } => commands::track::set(&platform, chat_id, &playlist).await?,
            TrackCmd::Stop { chat_id, platform } => {
                commands::track::stop(&platform, chat_id).await?
            }
            TrackCmd::Status { chat_id, platform } => {
                commands::track::status(&platform, chat_id).await?
            }
            TrackCmd::Check { chat_id, platform } => {
                commands::track::check(&platform, chat_id).await?
            }
        },
    }

    Ok(())
}
