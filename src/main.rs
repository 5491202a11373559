use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use todust::commands::*;
use todust::config;
use todust::network::ShareOptions;
use todust::render::ListFilter;
use todust::{Result, TaskStore};

#[derive(Parser)]
#[command(name = "todust")]
#[command(about = "A tiny todo list you can share with friends on the LAN", long_about = None)]
struct Cli {
    /// Path to the task file (overrides TODUST_DB and the config file)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// List all tasks
    List {
        /// Show done tasks only
        #[arg(long, conflicts_with = "undone")]
        done: bool,
        /// Show undone tasks only
        #[arg(long)]
        undone: bool,
    },
    /// Mark a task as done
    Done { id: u64 },
    /// Mark a task as not done
    Undone { id: u64 },
    /// Delete a task
    Delete { id: u64 },
    /// Clear all tasks
    Clear {
        /// Confirm clearing all tasks
        #[arg(long)]
        yes: bool,
    },
    /// Configure todust settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Share todo lists with friends
    Friend {
        #[command(subcommand)]
        command: FriendCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a permanent database path
    SetDb { path: PathBuf },
}

#[derive(Subcommand)]
enum FriendCommands {
    /// Start a friend server to share your todo list
    Serve {
        /// Address to listen on (IP, or IP:port; port defaults to 8088)
        addr: String,
        /// Per-connection timeout in seconds
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,
    },
    /// Connect to a friend and fetch their todo list
    Connect {
        /// Friend's address (IP or host, optionally with :port)
        addr: String,
        /// Timeout in seconds
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,
    },
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "todust", &mut io::stdout());
        return Ok(());
    }

    // Only commands that touch the local store resolve its path.
    if let Commands::Friend {
        command: FriendCommands::Connect { addr, timeout },
    } = &cli.command
    {
        let options = ShareOptions {
            io_timeout: Duration::from_secs(*timeout),
        };
        return cmd_connect(addr, options).await;
    }

    let (db_path, source) = config::resolve_db_path(cli.db)?;
    debug!(path = %db_path.display(), %source, "using database");
    let store = TaskStore::new(&db_path);

    match cli.command {
        Commands::Add { words } => cmd_add(&store, &words, false),
        Commands::List { done, undone } => {
            let filter = if done {
                ListFilter::Done
            } else if undone {
                ListFilter::Undone
            } else {
                ListFilter::All
            };
            cmd_list(&store, filter)
        }
        Commands::Done { id } => cmd_set_done(&store, id, true, false),
        Commands::Undone { id } => cmd_set_done(&store, id, false, false),
        Commands::Delete { id } => cmd_delete(&store, id, false),
        Commands::Clear { yes } => cmd_clear(&store, yes, false),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cmd_config_show(&config::config_path(), &db_path, source),
            ConfigCommands::SetDb { path } => cmd_config_set_db(&config::config_path(), path, false),
        },
        Commands::Friend { command } => match command {
            FriendCommands::Serve { addr, timeout } => {
                let options = ShareOptions {
                    io_timeout: Duration::from_secs(timeout),
                };
                cmd_serve(store, &addr, options).await
            }
            FriendCommands::Connect { .. } => Ok(()),
        },
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = match &cli.command {
        Commands::Friend { command: FriendCommands::Serve { .. } } => "info",
        _ => "warn",
    };
    init_logging(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
