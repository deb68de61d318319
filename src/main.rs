use std::sync::mpsc;

use chrono::{DateTime, Utc};
use clap::Parser;
use feedcache::cli::{Cli, Command, ImportArgs};
use feedcache::config::Config;
use feedcache::{logging, report, CacheStore, FeedItem};

/// Block until the store delivers a completion on `rx`.
fn wait<T>(rx: mpsc::Receiver<T>) -> T {
    rx.recv().unwrap_or_else(|_| {
        eprintln!("store worker exited without completing the operation");
        std::process::exit(1);
    })
}

fn read_items(args: &ImportArgs) -> Result<(Vec<FeedItem>, DateTime<Utc>), String> {
    let contents = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("failed to read {}: {e}", args.file.display()))?;
    let items: Vec<FeedItem> = serde_json::from_str(&contents)
        .map_err(|e| format!("invalid feed items in {}: {e}", args.file.display()))?;

    let timestamp = match &args.timestamp {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map_err(|e| format!("invalid timestamp '{value}': {e}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    Ok((items, timestamp))
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let store = match config
        .schema()
        .and_then(|schema| CacheStore::open_with(&config.store_path, &schema, &config.store_options()))
    {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening store: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Show(args) => {
            let (tx, rx) = mpsc::channel();
            store.retrieve(move |result| {
                let _ = tx.send(result);
            });

            match wait(rx) {
                Ok(feed) => report::print(&feed, args.json),
                Err(e) => {
                    eprintln!("Error reading cache: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Import(args) => {
            let (items, timestamp) = read_items(&args).unwrap_or_else(|e| {
                eprintln!("{e}");
                std::process::exit(1);
            });
            let count = items.len();

            let (tx, rx) = mpsc::channel();
            store.insert(items, timestamp, move |result| {
                let _ = tx.send(result);
            });

            match wait(rx) {
                Ok(()) => println!("cached {count} items at {}", timestamp.to_rfc3339()),
                Err(e) => {
                    eprintln!("Error writing cache: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Clear => {
            let (tx, rx) = mpsc::channel();
            store.delete(move |result| {
                let _ = tx.send(result);
            });

            match wait(rx) {
                Ok(()) => println!("cache cleared"),
                Err(e) => {
                    eprintln!("Error clearing cache: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
