//! CLI parser and dispatch to command-specific modules.

mod config_cmd;
mod init;
mod seed;
mod serve;
mod site;
mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use asap_pdf::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "asap-pdf")]
#[command(about = "Track and triage PDF documents published on government websites")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing asap-pdf.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Apply pending database migrations
    Migrate,

    /// Start the web server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config, else 127.0.0.1:3000)
        bind: Option<String>,

        /// Skip automatic database migration on startup
        #[arg(long)]
        no_migrate: bool,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Inspect monitored sites
    Site {
        #[command(subcommand)]
        command: SiteCommands,
    },

    /// Create the development admin user
    Seed,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// Email address used to sign in
        email: String,
        /// Password (falls back to ASAP_PASSWORD)
        #[arg(long, env = "ASAP_PASSWORD")]
        password: String,
    },
    /// List users
    List,
    /// Delete a user and everything they own
    Delete {
        /// Email address of the user
        email: String,
        /// Skip confirmation
        #[arg(short, long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum SiteCommands {
    /// List every site with its document count
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective settings
    Show,
    /// Print the path of the loaded config file
    Path,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.target,
    };
    let (settings, config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Migrate => init::cmd_migrate(&settings).await,
        Commands::Serve { bind, no_migrate } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind, no_migrate).await
        }
        Commands::User { command } => match command {
            UserCommands::Add { email, password } => {
                user::cmd_user_add(&settings, &email, &password).await
            }
            UserCommands::List => user::cmd_user_list(&settings).await,
            UserCommands::Delete { email, confirm } => {
                user::cmd_user_delete(&settings, &email, confirm).await
            }
        },
        Commands::Site { command } => match command {
            SiteCommands::List => site::cmd_site_list(&settings).await,
        },
        Commands::Seed => seed::cmd_seed(&settings).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings, &config),
            ConfigCommands::Path => config_cmd::cmd_config_path(&config),
        },
    }
}
