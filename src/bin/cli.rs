//! JournalKV CLI
//!
//! Command-line interface for inspecting and editing a journal file.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use journalkv::wal::{LogReader, Recovery};
use journalkv::{Config, JournalError, Store, SyncStrategy};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// JournalKV CLI
#[derive(Parser, Debug)]
#[command(name = "journalkv-cli")]
#[command(about = "CLI for JournalKV journal files")]
#[command(version)]
struct Args {
    /// Journal file
    #[arg(short, long, default_value = "./journalkv.log")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value as JSON (plain text is stored as a string)
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List all entries
    List,

    /// Rewrite the journal as a single snapshot
    Compact,

    /// Replay the journal without modifying it and report what was found
    Verify,

    /// Print every record in the journal as one JSON line
    Dump,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> journalkv::Result<()> {
    match args.command {
        Commands::Verify => {
            let result = Recovery::verify(&args.path)?;
            println!("frames:    {}", result.frames_replayed);
            println!("snapshots: {}", result.snapshots_applied);
            println!("entries:   {}", result.live_entries);
            println!("bytes:     {}", result.bytes_replayed);
            println!("truncated: {}", result.was_truncated);
            Ok(())
        }
        Commands::Dump => {
            let mut reader = LogReader::open(&args.path)?;
            while let Some(record) = reader.next_record::<Value>()? {
                println!("{}", String::from_utf8_lossy(&record.encode()?));
            }
            if reader.was_truncated() {
                eprintln!("(truncated tail after offset {})", reader.offset());
            }
            Ok(())
        }
        command => {
            let config = Config::builder()
                .path(&args.path)
                .sync_strategy(SyncStrategy::OnFlush)
                .build();
            let store: Store<Value> = Store::open(config)?;
            edit(&store, command)?;
            store.close()
        }
    }
}

fn edit(store: &Store<Value>, command: Commands) -> journalkv::Result<()> {
    match command {
        Commands::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", render(&value)?),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store.set(key, value)?;
            println!("OK");
        }
        Commands::Del { key } => match store.delete(&key)? {
            Some(_) => println!("1"),
            None => println!("0"),
        },
        Commands::List => {
            for (key, value) in store.all_entries() {
                println!("{}\t{}", key, render(&value)?);
            }
        }
        Commands::Compact => {
            // open() has already compacted; report the result
            println!(
                "compacted {} frames into 1 snapshot ({} entries)",
                store.recovery().frames_replayed,
                store.len()
            );
        }
        Commands::Verify | Commands::Dump => {}
    }
    Ok(())
}

fn render(value: &Value) -> journalkv::Result<String> {
    serde_json::to_string(value).map_err(|e| JournalError::Serialization(e.to_string()))
}
