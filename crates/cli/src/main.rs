use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use psf::{Document, Options};

mod lookup;

#[derive(Parser)]
#[command(name = "psfctl", about = "Inspect Pair Sorted Format files", version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print file info, room paths and every key with its type.
    Inspect {
        /// Path to a .psf file.
        file: PathBuf,
    },
    /// List room paths in stored order.
    Rooms {
        /// Path to a .psf file.
        file: PathBuf,
    },
    /// Print the type and value stored at `room/…/key`.
    Get {
        /// Path to a .psf file.
        file: PathBuf,
        /// Slash-separated room path ending in the key.
        key: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn open(file: &Path) -> Result<Document> {
    Document::open_path(file, Options::default())
        .with_context(|| format!("failed to open {}", file.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Inspect { file } => {
            let doc = open(&file)?;
            doc.print_data(&mut out)?;
        }
        Command::Rooms { file } => {
            let doc = open(&file)?;
            for path in lookup::room_paths(&doc) {
                writeln!(out, "{path}")?;
            }
        }
        Command::Get { file, key } => {
            let doc = open(&file)?;
            let object = lookup::lookup(&doc, &key)?;
            writeln!(out, "{} {}", object.tag(), object.value())?;
        }
    }
    Ok(())
}
