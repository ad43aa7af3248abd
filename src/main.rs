use clap::{Parser, Subcommand};
use shoebox::embedded::EmbeddedDates;
use shoebox::{config, output, store, sync};
use std::io::BufRead;
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "shoebox")]
#[command(about = "Content-addressed photo archive")]
#[command(long_about = "\
Content-addressed photo archive

Every ingested file is stored once, keyed by the SHA-1 of its content,
and linked into secondary indexes by capture date and by tag. Content is
never copied: the canonical object is a symlink to the original file.

Archive layout:

  archive/
  ├── by_sha/
  │   └── ab/
  │       ├── c123…                # canonical object (symlink to original)
  │       └── c123….meta           # sidecar: one `key: value` per line
  ├── by_date/
  │   └── 2021/06/01/photo.jpg     # relative symlink to the canonical object
  └── by_tag/
      └── vacation/photo.jpg       # relative symlink, one per tag

Capture dates come from the file's own EXIF/IPTC timestamps on first
ingest and are never recomputed afterwards. Re-ingesting identical
content merges metadata (e.g. new tags) instead of storing a copy.

Feed `sync` one file path per line on stdin, or run it with no input to
resync every object the archive already knows.

Run 'shoebox gen-config' to generate a documented shoebox.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Archive base directory (overrides the config file)
    #[arg(long, global = true)]
    base: Option<String>,

    /// Config file (default: shoebox.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest file paths read from stdin (or --from-file), one per line
    Sync {
        /// Read input paths from a file instead of stdin
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Tag to attach to every ingested file (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Write the batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Reprocess every object the archive already knows
    Resync,
    /// Print every known content hash
    List {
        /// Emit a JSON array instead of one hash per line
        #[arg(long)]
        json: bool,
    },
    /// Print a stock shoebox.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(base) = cli.base {
        config.store.root = base;
    }
    config.validate()?;

    match cli.command {
        Command::Sync {
            from_file,
            tags,
            report,
        } => {
            let inputs = read_inputs(from_file.as_deref())?;
            let summary = sync::sync_paths(&config, &EmbeddedDates, inputs, &tags)?;
            eprintln!("{}", output::format_report(&summary));
            if let Some(path) = report {
                std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
            }
        }
        Command::Resync => {
            let summary = sync::resync(&config)?;
            eprintln!("{}", output::format_report(&summary));
        }
        Command::List { json } => {
            let hashes = store::Store::new(&config).list_all()?;
            if json {
                let strings: Vec<&str> = hashes.iter().map(|h| h.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&strings)?);
            } else {
                for hash in hashes {
                    println!("{hash}");
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Collect input lines from a file or from stdin.
///
/// Every line is one ingest attempt — including empty ones, which fail
/// per item downstream rather than being filtered here.
fn read_inputs(from_file: Option<&std::path::Path>) -> std::io::Result<Vec<String>> {
    match from_file {
        Some(path) => Ok(std::fs::read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect()),
        None => std::io::stdin().lock().lines().collect(),
    }
}
