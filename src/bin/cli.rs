//! mergelog CLI
//!
//! Command-line access to a merged store on local files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mergelog::{Config, MergeError, MergedStore, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// mergelog CLI
#[derive(Parser, Debug)]
#[command(name = "mergelog")]
#[command(about = "Read and write a byte store merged from append-only shards")]
#[command(version)]
struct Args {
    /// Base path of the shard files (shard i is {base}-{i})
    #[arg(short, long, default_value = "./mergelog")]
    base: PathBuf,

    /// Number of shards
    #[arg(short, long, default_value = "2")]
    shards: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a file (or stdin with "-") at a logical offset
    Write {
        /// Logical offset
        offset: u64,

        /// Input file, "-" for stdin
        input: PathBuf,

        /// Sync every shard append
        #[arg(long)]
        sync: bool,
    },

    /// Read bytes at a logical offset to stdout
    Read {
        /// Logical offset
        offset: u64,

        /// Number of bytes
        len: usize,
    },

    /// Print the frame index of every shard
    Inspect,

    /// Delete all shard files
    Remove,
}

fn main() {
    // Logs go to stderr; stdout carries data for `read`
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,mergelog=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> mergelog::Result<()> {
    match args.command {
        Commands::Write { offset, input, sync } => {
            let data = if input.as_os_str() == "-" {
                let mut data = Vec::new();
                io::stdin().read_to_end(&mut data)?;
                data
            } else {
                fs::read(&input)?
            };

            let sync_strategy = if sync {
                SyncStrategy::EveryWrite
            } else {
                SyncStrategy::Never
            };
            let config = Config::builder()
                .base_path(&args.base)
                .shard_count(args.shards)
                .sync_strategy(sync_strategy)
                .build();

            let mut store = MergedStore::open(config)?;
            let written = store.write_at(&data, offset)?;
            store.close()?;

            tracing::info!(offset, written, "Write complete");
        }

        Commands::Read { offset, len } => {
            let mut store = MergedStore::open_path(&args.base, args.shards)?;

            let mut buf = vec![0u8; len];
            let n = match store.read_at(&mut buf, offset) {
                Ok(n) => n,
                Err(MergeError::EndOfData) => 0,
                Err(e) => return Err(e),
            };
            store.close()?;

            let mut stdout = io::stdout().lock();
            stdout.write_all(&buf[..n])?;
            stdout.flush()?;
        }

        Commands::Inspect => {
            let mut store = MergedStore::open_path(&args.base, args.shards)?;

            println!("extent: {}", store.extent());
            for (index, shard) in store.shards().iter().enumerate() {
                println!(
                    "shard {} ({}): {} frames, extent {}, next position {}",
                    index,
                    store.config().shard_path(index).display(),
                    shard.frame_count(),
                    shard.extent(),
                    shard.next_position()
                );
                for frame in shard.frames() {
                    println!(
                        "  offset {:>12}  length {:>10}  position {:>12}",
                        frame.offset, frame.length, frame.position
                    );
                }
            }

            store.close()?;
        }

        Commands::Remove => {
            mergelog::remove(&args.base, args.shards)?;
            tracing::info!(base = %args.base.display(), "Shards removed");
        }
    }

    Ok(())
}
