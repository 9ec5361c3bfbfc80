//! PageStore inspection tool
//!
//! Lists and dumps the contents of a store folder. Opening the store
//! replays any backup left behind by an interrupted commit.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagestore::{Config, Store, StoreRead, StorageBackend};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// PageStore inspection tool
#[derive(Parser, Debug)]
#[command(name = "pagestore")]
#[command(about = "Inspect and recover a PageStore folder")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./pagestore_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List table names
    Tables,

    /// List page numbers of a table
    Pages {
        /// The table name
        table: String,
    },

    /// Print the records of one page
    Dump {
        /// The table name
        table: String,

        /// The page number
        page: u64,
    },

    /// Print the last issued sequence value(s)
    Sequence {
        /// Only this table
        table: Option<String>,
    },

    /// Replay a leftover backup, if any
    Recover,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pagestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> pagestore::Result<()> {
    let config = Config::builder().data_dir(&args.data_dir).build();

    let store = Store::open(config)?;

    if let Commands::Recover = args.command {
        let recovery = store.recovery();
        if recovery.backup_found {
            println!(
                "replayed {}: {} page(s), sequence {}",
                StorageBackend::BACKUP_FILE,
                recovery.pages_restored,
                if recovery.sequence_restored { "restored" } else { "untouched" }
            );
        } else {
            println!("nothing to recover");
        }
        return Ok(());
    }

    let reader = store.read()?;

    match args.command {
        Commands::Tables => {
            for table in reader.list_tables()? {
                println!("{}", table);
            }
        }
        Commands::Pages { table } => {
            for page in reader.list_pages(&table)? {
                println!("{}", page);
            }
        }
        Commands::Dump { table, page } => {
            for (id, record) in reader.load(&table, page)? {
                println!("{}\t{}", id, record);
            }
        }
        Commands::Sequence { table: Some(table) } => {
            println!("{}", reader.sequence(&table)?);
        }
        Commands::Sequence { table: None } => {
            let sequence: Value = store.backend().read_sequence()?;
            println!("{}", serde_json::to_string_pretty(&sequence)?);
        }
        Commands::Recover => {}
    }

    Ok(())
}
