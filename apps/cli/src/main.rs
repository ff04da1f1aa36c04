//! swift-browser - terminal file manager for OpenStack Swift.

mod app;
mod commands;
mod output;
mod prompt;
mod views;

use app::{App, AppOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swift_config_and_utils::{init_logging, AuthProtocol, Config, Paths};
use tracing::debug;
use views::{SortColumn, SortState};

/// swift-browser - Browse and manage an OpenStack Swift account.
#[derive(Parser)]
#[command(name = "swift-browser")]
#[command(about = "Terminal file manager for OpenStack Swift")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Auth endpoint, e.g. http://127.0.0.1:8080/auth/v1.0
    #[arg(long, global = true, env = "SWIFT_BROWSER_AUTH_URL")]
    auth_url: Option<String>,

    /// Login protocol (token or keystone)
    #[arg(long, global = true)]
    protocol: Option<String>,

    /// User (account:user for token auth)
    #[arg(short, long, global = true, env = "SWIFT_BROWSER_USER")]
    user: Option<String>,

    /// Key or password
    #[arg(short, long, global = true, env = "SWIFT_BROWSER_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Keystone tenant
    #[arg(long, global = true, env = "SWIFT_BROWSER_TENANT")]
    tenant: Option<String>,

    /// Use an in-memory demo account instead of a real Swift proxy
    #[arg(long, global = true)]
    simulate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and check the credentials
    Login,

    /// Show configuration and auth state
    Status,

    /// List containers
    Containers {
        /// Sort column
        #[arg(short, long, value_enum, default_value = "name")]
        sort: SortColumn,
        /// Reverse the order
        #[arg(short, long)]
        reverse: bool,
    },

    /// List a container or pseudo-directory (container[/dir])
    Ls {
        /// Path to list; empty lists containers
        #[arg(default_value = "")]
        path: String,
        /// List every object below the path
        #[arg(short = 'R', long)]
        recursive: bool,
        /// Sort column
        #[arg(short, long, value_enum, default_value = "name")]
        sort: SortColumn,
        /// Reverse the order
        #[arg(short, long)]
        reverse: bool,
    },

    /// Download an object (container/object)
    Get {
        path: String,
        /// Destination file, or - for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show an object's headers (container/object)
    Head { path: String },

    /// Upload a file to container[/dir/] or container/object
    Put {
        file: PathBuf,
        target: String,
        /// Content-Type of the object
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Edit object metadata (container/object)
    Meta {
        path: String,
        /// Set key=value (plain keys become X-Object-Meta-*)
        #[arg(long = "set")]
        set: Vec<String>,
        /// Remove a key
        #[arg(long = "unset")]
        unset: Vec<String>,
    },

    /// Delete objects (container/object ...)
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Empty and delete a container
    Rmdir { container: String },

    /// Server-side copy to container[/dir/] or container/object
    Cp { source: String, target: String },

    /// Create a container
    Mkdir { container: String },

    /// Interactive shell over one session
    Shell,
}

fn sort_state(column: SortColumn, reverse: bool) -> SortState {
    SortState {
        column,
        descending: reverse,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(log_level, config.log_format);
    debug!(config_file = %paths.config_file().display(), "Configuration loaded");

    let protocol = match cli.protocol.as_deref() {
        Some(protocol) => protocol.parse::<AuthProtocol>()?,
        None => config.auth_protocol,
    };
    let auth_url = match cli.auth_url {
        Some(url) => url,
        None => config.auth_url()?.to_string(),
    };

    let app = App::start(AppOptions {
        auth_url,
        protocol,
        user: cli.user,
        key: cli.key,
        tenant: cli.tenant,
        request_timeout: config.request_timeout(),
        simulate: cli.simulate,
    })?;
    let client = &app.client;
    let format = &cli.format;

    match cli.command {
        Commands::Login => commands::login(&app, format).await,
        Commands::Status => commands::status(&app, format),
        Commands::Containers { sort, reverse } => {
            commands::containers(client, sort_state(sort, reverse), format).await
        }
        Commands::Ls {
            path,
            recursive,
            sort,
            reverse,
        } => commands::ls(client, &path, recursive, sort_state(sort, reverse), format).await,
        Commands::Get { path, output } => {
            commands::get(client, &path, output.as_deref(), &paths.downloads_dir(), format).await
        }
        Commands::Head { path } => commands::head(client, &path, format).await,
        Commands::Put {
            file,
            target,
            content_type,
        } => commands::put(client, &file, &target, content_type.as_deref(), format).await,
        Commands::Meta { path, set, unset } => {
            commands::meta(client, &path, &set, &unset, format).await
        }
        Commands::Rm { paths: targets } => commands::rm(client, &targets, format).await,
        Commands::Rmdir { container } => commands::rmdir(client, &container, format).await,
        Commands::Cp { source, target } => commands::cp(client, &source, &target, format).await,
        Commands::Mkdir { container } => commands::mkdir(client, &container, format).await,
        Commands::Shell => commands::shell(&app, &paths.downloads_dir(), format).await,
    }
}
