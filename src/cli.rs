use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "feedcache")]
#[command(about = "Inspect and manage a cached feed snapshot")]
#[command(version)]
pub struct Cli {
    /// Store file (overrides store_path from the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log store operations to stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the cached feed
    Show(ShowArgs),

    /// Replace the cached feed with items from a JSON file
    Import(ImportArgs),

    /// Delete the cached feed
    Clear,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// JSON file holding an array of feed items
    pub file: PathBuf,

    /// Snapshot timestamp in RFC 3339 (defaults to now)
    #[arg(long)]
    pub timestamp: Option<String>,
}
