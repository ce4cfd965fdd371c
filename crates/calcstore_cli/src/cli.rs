//! Command-line surface and configuration.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "calcstore")]
#[command(about = "Evaluate arithmetic expressions and keep the results")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

/// Runtime configuration, from flags or environment.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database file.
    #[arg(long, env = "CALCSTORE_DB", default_value = "calcstore.sqlite3", global = true)]
    pub db: PathBuf,

    /// Directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "CALCSTORE_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "CALCSTORE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored calculations.
    List {
        /// Only calculations owned by this user.
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Evaluate and store an expression.
    Create {
        expression: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one calculation.
    Get { id: String },
    /// Re-evaluate a calculation with a new expression.
    Update { id: String, expression: String },
    /// Delete a calculation.
    Delete { id: String },
    /// Evaluate without storing.
    Eval { expression: String },
}
