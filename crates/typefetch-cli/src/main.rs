#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]

mod client;
mod commands;
mod logging;

use clap::Parser;
use commands::libs::LibsOp;
use miette::Result;
use typefetch_core::config::Channel;
use typefetch_core::Config;

#[derive(Parser, Debug)]
#[command(name = "typefetch")]
#[command(author, version, about = "Resolve and cache TypeScript declaration libraries", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Serve libs requests in-process instead of through the daemon
    #[arg(long, global = true)]
    local: bool,

    /// Release channel namespacing cache and IPC paths
    #[arg(long, global = true, env = "TYPEFETCH_CHANNEL", default_value = "stable")]
    channel: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Start the daemon (foreground)
    Daemon,

    /// Stop the running daemon
    Stop,

    /// Ping the daemon to check if it's running
    Ping,

    /// Resolve a module's declaration files and cache them
    Fetch {
        /// Module name (e.g. "react", "@scope/name", "lodash/fp")
        name: String,

        /// Exact version or dist-tag
        #[arg(default_value = "latest")]
        version: String,

        /// Resolve again even if an exact version is already cached
        #[arg(long)]
        refresh: bool,
    },

    /// Check whether a module version is cached
    Exists {
        name: String,
        version: String,
    },

    /// Print a cached module's files without resolving
    Cached {
        name: String,
        version: String,
    },

    /// List the virtual paths cached for a module version
    Paths {
        name: String,
        version: String,
    },

    /// Remove a module version from the cache
    Remove {
        name: String,
        version: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let channel = Channel::parse(&cli.channel);
    let config = Config::from_env()
        .with_channel(channel)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    let (op, name, version) = match cli.command {
        Some(Commands::Version) | None => return commands::version::run(),
        Some(Commands::Daemon) => return commands::daemon::run(&config),
        Some(Commands::Stop) => return commands::stop::run(channel, cli.json),
        Some(Commands::Ping) => return commands::ping::run(channel, cli.json),
        Some(Commands::Fetch {
            name,
            version,
            refresh,
        }) => (LibsOp::Fetch { refresh }, name, version),
        Some(Commands::Exists { name, version }) => (LibsOp::Exists, name, version),
        Some(Commands::Cached { name, version }) => (LibsOp::Cached, name, version),
        Some(Commands::Paths { name, version }) => (LibsOp::Paths, name, version),
        Some(Commands::Remove { name, version }) => (LibsOp::Remove, name, version),
    };

    commands::libs::run(&config, op, &name, &version, cli.local, cli.json)
}
