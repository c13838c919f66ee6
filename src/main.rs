mod batch;
mod config;
mod db;
mod error;
mod parser;
mod report;
mod styles;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;

use crate::batch::{DocumentStore, RunOptions};
use crate::config::Settings;
use crate::db::SqliteStore;
use crate::parser::rules::CATALOG;
use crate::parser::{Converter, Tally};

#[derive(Parser)]
#[command(name = "slgb_converter", about = "Convert SLGB custom blocks into core editor blocks")]
struct Cli {
    /// Config file (default: optional slgb-converter.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database holding the posts
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert custom blocks in every candidate post
    Convert {
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
        /// Max posts to convert (default: all candidates)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count custom blocks per type without converting
    Scan,
    /// Convert a single serialized document
    File {
        /// Input file, or - for stdin
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List recorded conversion runs
    Runs {
        /// Max runs to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Restore the posts a run saved
    Revert { run_id: String },
    /// List supported conversions
    Supported,
    /// Print the stylesheet for converted blocks
    Css,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Convert { dry_run, limit, json } => {
            let store = SqliteStore::open(&settings.db_path, &settings)?;
            let converter = Converter::new(&settings.namespace).with_lookup(&store);
            let tx = store.conn().unchecked_transaction()?;

            let pb = progress_bar();
            let report = batch::run(&store, &converter, &RunOptions { dry_run, limit }, &pb)?;
            pb.finish_and_clear();

            if !dry_run {
                store.record_run(&report)?;
                tx.commit()?;
            }
            if json {
                println!("{}", report::format_report_json(&report)?);
            } else {
                report::print_report(&report);
                if !dry_run && report.updated > 0 {
                    println!("Run id:    {}", report.run_id);
                }
            }
            Ok(())
        }
        Commands::Scan => {
            let store = SqliteStore::open(&settings.db_path, &settings)?;
            let converter = Converter::new(&settings.namespace);
            let docs = store.find(&settings.marker(), None)?;
            if docs.is_empty() {
                println!("No posts contain {} blocks.", settings.marker());
                return Ok(());
            }
            let mut tally = Tally::default();
            for doc in &docs {
                tally.merge(&converter.census(&doc.content));
            }
            println!("{} block(s) in {} post(s):", tally.total(), docs.len());
            for (name, n) in tally.entries() {
                let status = if CATALOG.iter().any(|r| r.handles(name)) {
                    ""
                } else {
                    " (not converted)"
                };
                println!("  {:<20} {:>5}{}", name, n, status);
            }
            Ok(())
        }
        Commands::File { input, output } => {
            let text = read_input(&input)?;
            let conversion = Converter::new(&settings.namespace).convert(&text);
            match output {
                Some(path) => fs::write(&path, &conversion.text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", conversion.text),
            }
            if conversion.changed() {
                eprint!("{}", report::format_tally(&conversion.tally));
            } else {
                eprintln!("No custom blocks were converted.");
            }
            Ok(())
        }
        Commands::Runs { limit } => {
            let store = SqliteStore::open(&settings.db_path, &settings)?;
            let runs = store.fetch_runs(limit)?;
            if runs.is_empty() {
                println!("No runs recorded.");
                return Ok(());
            }
            print!("{}", report::format_runs(&runs));
            Ok(())
        }
        Commands::Revert { run_id } => {
            let store = SqliteStore::open(&settings.db_path, &settings)?;
            let restored = store.revert(&run_id)?;
            println!("Restored {} post(s) saved by {}", restored, run_id);
            Ok(())
        }
        Commands::Supported => {
            for rule in CATALOG {
                let sources = rule
                    .blocks
                    .iter()
                    .map(|b| format!("{}/{}", settings.namespace, b))
                    .join(", ");
                println!("{:<40} → {}", sources, rule.target);
            }
            Ok(())
        }
        Commands::Css => {
            print!("{}", styles::CONVERTED_BLOCKS_CSS);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn read_input(input: &Path) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
