//! langpack command line
//!
//! Usage:
//!   langpack compare --translated zh.json --reference en.json [--out-dir temp_dir]
//!   langpack compare --translated-dir zh/ --reference-dir en/
//!   langpack compare-keys a.json b.json [--out1 ..] [--out2 ..]
//!   langpack split -i zh.json -o split/ [--size 500]
//!   langpack merge -i split/ -o zh.json
//!   langpack format -i en.json [-o sorted_en.json]
//!   langpack download [--output-dir lang/en]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use langpack_tools::{
    chunk::{merge_dir, split_file, DEFAULT_CHUNK_SIZE},
    compare::{compare_dirs, compare_files},
    download::{Downloader, DEFAULT_ASSET_PATTERN, DEFAULT_PAGE_URL},
    format::{default_output_path, sort_by_string_length, to_line_json},
    io::{read_json_object, to_pretty_json, write_all_atomic, write_atomic},
    tree::{top_level_diff, LeafMode},
};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "langpack")]
#[command(author, version, about = "Maintain JSON language packs")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Leaves are `string` fields holding a string
    StringField,
    /// Leaves are any string values
    PlainString,
}

impl From<Mode> for LeafMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::StringField => LeafMode::StringField,
            Mode::PlainString => LeafMode::PlainString,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare translated files against reference files by leaf path
    Compare {
        /// Translated file
        #[arg(long, requires = "reference", conflicts_with_all = ["translated_dir", "reference_dir"])]
        translated: Option<PathBuf>,

        /// Reference file
        #[arg(long, requires = "translated")]
        reference: Option<PathBuf>,

        /// Directory of translated files
        #[arg(long, requires = "reference_dir")]
        translated_dir: Option<PathBuf>,

        /// Directory of reference files, matched by file name
        #[arg(long, requires = "translated_dir")]
        reference_dir: Option<PathBuf>,

        /// Output directory for derived files and the report
        #[arg(short, long, default_value = "temp_dir")]
        out_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = Mode::StringField)]
        mode: Mode,
    },

    /// Extract top-level keys present in only one of two files
    CompareKeys {
        first: PathBuf,
        second: PathBuf,

        #[arg(long, default_value = "only_in_json1.json")]
        out1: PathBuf,

        #[arg(long, default_value = "only_in_json2.json")]
        out2: PathBuf,
    },

    /// Split a flat JSON object into part_NNN.json chunks
    Split {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Top-level pairs per chunk
        #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: usize,
    },

    /// Merge part_*.json chunks back into one file
    Merge {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Sort entries by `string` length and write one pair per line
    Format {
        #[arg(short, long)]
        input: PathBuf,

        /// Defaults to sorted_<name> next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download the reference language pack
    Download {
        #[arg(long, default_value = DEFAULT_PAGE_URL)]
        page_url: String,

        #[arg(long, default_value = DEFAULT_ASSET_PATTERN)]
        pattern: String,

        #[arg(short, long, default_value = "lang/en")]
        output_dir: PathBuf,

        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Compare {
            translated,
            reference,
            translated_dir,
            reference_dir,
            out_dir,
            mode,
        } => {
            let report = match (translated, reference, translated_dir, reference_dir) {
                (Some(translated), Some(reference), _, _) => {
                    compare_files(&translated, &reference, &out_dir, mode.into())?
                }
                (_, _, Some(translated_dir), Some(reference_dir)) => {
                    compare_dirs(&translated_dir, &reference_dir, &out_dir, mode.into())?
                }
                _ => bail!("pass --translated/--reference or --translated-dir/--reference-dir"),
            };

            for path in report.write(&out_dir)? {
                println!("Wrote {}", path.display());
            }
            println!(
                "{} pairs compared, {} differ",
                report.comparisons.len(),
                report.differing()
            );
        }

        Command::CompareKeys {
            first,
            second,
            out1,
            out2,
        } => {
            let a = read_json_object(&first)?;
            let b = read_json_object(&second)?;
            let (only_a, only_b) = top_level_diff(&a, &b);

            write_all_atomic(&[
                (out1.clone(), to_pretty_json(&Value::Object(only_a))?),
                (out2.clone(), to_pretty_json(&Value::Object(only_b))?),
            ])?;
            println!("Wrote {} (keys only in {})", out1.display(), first.display());
            println!("Wrote {} (keys only in {})", out2.display(), second.display());
        }

        Command::Split {
            input,
            output,
            size,
        } => {
            let written = split_file(&input, &output, size)?;
            println!("Wrote {} chunks to {}", written.len(), output.display());
        }

        Command::Merge { input, output } => {
            let pairs = merge_dir(&input, &output)?;
            println!("Merged {} pairs into {}", pairs, output.display());
        }

        Command::Format { input, output } => {
            let output = output.unwrap_or_else(|| default_output_path(&input));
            let sorted = sort_by_string_length(&read_json_object(&input)?);
            write_atomic(&output, &to_line_json(&sorted))?;
            println!("Sorted {} entries into {}", sorted.len(), output.display());
        }

        Command::Download {
            page_url,
            pattern,
            output_dir,
            timeout_secs,
        } => {
            let downloader = Downloader::new(&pattern, Duration::from_secs(timeout_secs))?;
            let path = downloader
                .download(&page_url, &output_dir)
                .await
                .context("Download failed")?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
