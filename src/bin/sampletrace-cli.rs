//! Command-line front end for `sampletrace`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sampletrace::output::{OutputFormat, RecognitionOutput};
use sampletrace::{Library, Settings};

#[derive(Parser)]
#[command(name = "sampletrace-cli", version = sampletrace::VERSION, about = "Local audio sample identification")]
struct Cli {
    /// Path to a TOML settings file; falls back to built-in defaults.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory for audio files without fingerprinting them.
    Scan { root: PathBuf },

    /// Scan and fingerprint a directory, then save the cache.
    Process {
        root: PathBuf,
        #[arg(long, default_value = "library.kpsf")]
        cache: PathBuf,
        #[arg(long)]
        force: bool,
    },

    /// Load a cache and print a summary.
    Inspect {
        cache: PathBuf,
        root: PathBuf,
    },

    /// Match a query file against a fingerprinted library.
    Match {
        cache: PathBuf,
        root: PathBuf,
        query: PathBuf,
        #[arg(long, value_enum, default_value = "simple")]
        format: CliFormat,
        #[arg(long, default_value_t = 10)]
        topn: usize,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum CliFormat {
    Simple,
    Json,
    Csv,
}

fn load_settings(path: &Option<PathBuf>) -> Result<Settings> {
    match path {
        Some(p) => Settings::from_file(p).with_context(|| format!("loading settings from {}", p.display())),
        None => Ok(Settings::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = load_settings(&cli.settings)?;

    match cli.command {
        Command::Scan { root } => {
            let library = Library::new(settings);
            library.load_blocking(&root);
            println!("found {} audio file(s) under {}", library.len(), root.display());
        }

        Command::Process { root, cache, force } => {
            let library = Arc::new(Library::new(settings));
            library.load(&root);
            library.join_load();
            log::info!("scanned {} file(s), fingerprinting...", library.len());
            library.process(force);
            library.join_process();
            library.save(&cache).context("saving cache")?;
            println!(
                "fingerprinted {} of {} file(s), cache written to {}",
                library.fingerprinted_entries().len(),
                library.len(),
                cache.display()
            );
        }

        Command::Inspect { cache, root } => {
            let library = Library::new(settings);
            library.load_cache(&cache, &root).context("loading cache")?;
            println!(
                "{} entries, avg length {:.1}s",
                library.len(),
                library.avg_length_seconds()
            );
        }

        Command::Match {
            cache,
            root,
            query,
            format,
            topn,
        } => {
            let library = Library::new(settings);
            library.load_cache(&cache, &root).context("loading cache")?;

            let (query_fp, _) = sampletrace::fingerprint::fingerprint_file(&query, sampletrace::EntryId(0), &settings)
                .context("fingerprinting query")?;

            let results = sampletrace::matcher::find_matches(&library, &query, &query_fp);
            let songs = sampletrace::matcher::align_matches(&library, &query_fp, &results, &settings, topn);

            let output_format = match format {
                CliFormat::Simple => OutputFormat::Simple,
                CliFormat::Json => OutputFormat::Json,
                CliFormat::Csv => OutputFormat::Csv,
            };
            let rendered = RecognitionOutput::format_results(&songs, output_format);
            println!("{}", rendered);
        }
    }

    Ok(())
}
