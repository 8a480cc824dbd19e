use clap::{Parser, Subcommand};

/// Defines the command-line interface for `serverbox`.
/// `#[derive(Parser)]` generates the argument parsing code via `clap`.
#[derive(Parser)]
#[command(name = "serverbox")]
#[command(about = "Provision Lucee server instances from lucee.json", long_about = None)]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read or change values in a server config file.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// List installable runtime versions.
    Versions {
        /// Ignore the cached list and ask the registry.
        #[arg(long, conflicts_with = "clear_cache")]
        refresh: bool,
        /// Delete the cached version list and exit.
        #[arg(long)]
        clear_cache: bool,
    },
    /// Write an instance's server.xml (and keystore/rewrite rules) from the config.
    Provision {
        /// Vendor server.xml to start from.
        #[arg(long)]
        base: String,
        /// Server config file (defaults to <project>/lucee.json).
        #[arg(long)]
        config: Option<String>,
        /// Project directory the webroot is relative to (defaults to the current directory).
        #[arg(long)]
        project: Option<String>,
        /// Instance directory (defaults to ~/.serverbox/servers/<name>).
        #[arg(long)]
        instance: Option<String>,
        /// Print the patched server.xml instead of writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

/// `serverbox config ...`
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a key, e.g. `jvm.maxMemory`.
    Get {
        key: String,
        /// Server config file (defaults to ./lucee.json).
        #[arg(long)]
        config: Option<String>,
    },
    /// Set a key and save the config file.
    Set {
        key: String,
        value: String,
        /// Server config file (defaults to ./lucee.json).
        #[arg(long)]
        config: Option<String>,
    },
    /// List every known key with a short description.
    Keys,
}
