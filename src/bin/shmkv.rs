//! shmkv CLI
//!
//! Inspect and modify a store file from the shell. Mutating commands attach
//! as the writer, everything else attaches as a reader.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shmkv::{Result, Store, StoreConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// shmkv CLI
#[derive(Parser, Debug)]
#[command(name = "shmkv")]
#[command(about = "Shared-memory key-value store")]
#[command(version)]
struct Args {
    /// Backing file of the store
    #[arg(short, long, default_value = "./shmkv.store")]
    path: PathBuf,

    /// Maximum number of keys
    #[arg(short = 'n', long, default_value = "1024")]
    capacity: u32,

    /// Per-value size bound in bytes
    #[arg(short = 'v', long, default_value = "1024")]
    value_size: u32,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the store, or reset its header
    Init {
        /// Delete the backing file first
        #[arg(long)]
        fresh: bool,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys in index order
    Keys,

    /// Print the header
    Header,

    /// Print the published index
    Index {
        /// Print both item buffers
        #[arg(long)]
        all: bool,
    },

    /// Compact the key and value arenas
    Compact,
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("shmkv v{}", shmkv::VERSION);

    if let Err(e) = run(&args) {
        tracing::error!("{} failed: {}", command_name(&args.command), e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Commands::Init { fresh } => {
            let config = StoreConfig::builder()
                .path(&args.path)
                .key_capacity(args.capacity)
                .value_size_bound(args.value_size)
                .mode(shmkv::AccessMode::Write)
                .init_header(true)
                .init_disk(*fresh)
                .build();
            let store = Store::init(config)?;
            writeln!(
                out,
                "initialized {} ({} bytes)",
                store.path().display(),
                store.layout().total_size()
            )?;
            store.close()?;
        }
        Commands::Set { key, value } => {
            let mut store = writer(args)?;
            store.set(key.as_bytes(), value.as_bytes())?;
            store.close()?;
            writeln!(out, "OK")?;
        }
        Commands::Get { key } => {
            let mut store = reader(args)?;
            let value = store.get(key.as_bytes())?;
            out.write_all(&value)?;
            writeln!(out)?;
        }
        Commands::Del { key } => {
            let mut store = writer(args)?;
            store.del(key.as_bytes())?;
            store.close()?;
            writeln!(out, "OK")?;
        }
        Commands::Keys => {
            let mut store = reader(args)?;
            for key in store.list_keys()? {
                out.write_all(&key)?;
                writeln!(out)?;
            }
        }
        Commands::Header => {
            let store = reader(args)?;
            writeln!(out, "{}", store.dump_header()?)?;
        }
        Commands::Index { all } => {
            let store = reader(args)?;
            if *all {
                let [a, b] = store.dump_all_indexes()?;
                for (name, entries) in [("A", a), ("B", b)] {
                    writeln!(out, "item buffer {}:", name)?;
                    for entry in entries {
                        writeln!(out, "{}", entry)?;
                    }
                }
            } else {
                for entry in store.dump_index()? {
                    writeln!(out, "{}", entry)?;
                }
            }
        }
        Commands::Compact => {
            let mut store = writer(args)?;
            let keys = store.compact_keys()?;
            let values = store.compact_values()?;
            store.close()?;
            writeln!(out, "keys: {} bytes live, values: {} bytes live", keys, values)?;
        }
    }
    Ok(())
}

fn writer(args: &Args) -> Result<Store> {
    Store::open_writer(&args.path, args.capacity, args.value_size)
}

fn reader(args: &Args) -> Result<Store> {
    Store::open_reader(&args.path, args.capacity, args.value_size)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init { .. } => "init",
        Commands::Set { .. } => "set",
        Commands::Get { .. } => "get",
        Commands::Del { .. } => "del",
        Commands::Keys => "keys",
        Commands::Header => "header",
        Commands::Index { .. } => "index",
        Commands::Compact => "compact",
    }
}
