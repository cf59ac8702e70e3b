mod args;

use anyhow::{Context, Result};
use args::split_known_args;
use clap::builder::BoolishValueParser;
use clap::{Arg, ArgAction, Command, CommandFactory, FromArgMatches, Parser, ValueEnum};
use raw_sorter_core::{
    load_config, load_config_from, resolve_exiftool, run_batch, AppConfig, BatchReport,
    ExifToolReader, FileOutcome, OutcomeStatus, SortOptions,
};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, Parser)]
#[command(name = "sorter", version)]
#[command(
    about = "Renames camera raw files (CR2, CR3, NEF) after their focal length, capture time, exposure, aperture, ISO and sensor temperature"
)]
struct Cli {
    /// Folder holding the raw files.
    #[arg(long)]
    path: PathBuf,
    /// Camera name written into every new file name.
    #[arg(long)]
    camera_prefix: String,
    /// Move files into `<exposure>s_ISO<iso>` subfolders.
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    subfolder: Option<bool>,
    /// Print the new names without touching any file.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// File name template, e.g. `{camera_prefix}_{date}_{suffix}`.
    #[arg(long)]
    template: Option<String>,
    /// ExifTool executable to use instead of the one on PATH.
    #[arg(long)]
    exiftool: Option<PathBuf>,
    /// Config file to read instead of the per-user one.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-file table or the whole report as JSON.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Log filter, overridden by RUST_LOG.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let (cli, ignored) = parse_cli(std::env::args_os());
    init_tracing(&cli.log_level);

    if !ignored.is_empty() {
        warn!(?ignored, "ignoring unrecognised arguments");
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let exiftool = cli.exiftool.clone().or_else(|| config.exiftool_path.clone());
    let options = build_options(&cli, config)?;

    let executable = resolve_exiftool(exiftool.as_deref(), &options.input_dir);
    let mut reader = ExifToolReader::new(executable);
    let report = match cli.output {
        OutputFormat::Table => {
            println!("Reading EXIF: {}", options.input_dir.display());
            let report = run_batch(&options, &mut reader, |outcome| {
                print_outcome(&options.input_dir, outcome)
            })?;
            print_summary(&report);
            report
        }
        OutputFormat::Json => {
            let report = run_batch(&options, &mut reader, |_| {})?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            report
        }
    };

    exit_status(&report)
}

fn exit_status(report: &BatchReport) -> Result<()> {
    if report.has_failures() {
        anyhow::bail!("{} file(s) could not be renamed", report.stats.failed);
    }
    Ok(())
}

fn parse_cli<I, T>(raw: I) -> (Cli, Vec<OsString>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let (known, ignored) = split_known_args(command(), raw);
    let cli = try_parse_known(known).unwrap_or_else(|err| err.exit());
    (cli, ignored)
}

// `-v` instead of clap's default `-V`.
fn command() -> Command {
    Cli::command().disable_version_flag(true).arg(
        Arg::new("version")
            .short('v')
            .long("version")
            .action(ArgAction::Version)
            .help("Print version"),
    )
}

fn try_parse_known(known: Vec<OsString>) -> Result<Cli, clap::Error> {
    let matches = command().try_get_matches_from(known)?;
    Cli::from_arg_matches(&matches)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_options(cli: &Cli, config: AppConfig) -> Result<SortOptions> {
    let input_dir = fs::canonicalize(&cli.path)
        .with_context(|| format!("input folder is not accessible: {}", cli.path.display()))?;

    Ok(SortOptions {
        input_dir,
        camera_prefix: cli.camera_prefix.clone(),
        use_subfolders: cli.subfolder.unwrap_or(config.use_subfolders),
        dry_run: cli.dry_run,
        template: cli.template.clone().unwrap_or(config.template),
        subfolder_template: config.subfolder_template,
        extensions: config.extensions,
    })
}

fn print_outcome(input_dir: &Path, outcome: &FileOutcome) {
    println!("{}", outcome.original_name);
    match (&outcome.destination, &outcome.error) {
        (Some(destination), _) => {
            let shown = destination.strip_prefix(input_dir).unwrap_or(destination);
            println!("{}", shown.display());
        }
        (None, Some(error)) => println!("FAILED: {error}"),
        (None, None) => println!("FAILED"),
    }
    println!("{SEPARATOR}");
}

fn print_summary(report: &BatchReport) {
    let stats = &report.stats;
    println!(
        "\nsummary: files={} renamed={} planned={} failed={} empty_skip={} other_skip={}",
        stats.raw_files,
        stats.renamed,
        stats.planned,
        stats.failed,
        stats.skipped_empty,
        stats.skipped_other
    );

    let failed: Vec<&FileOutcome> = report
        .outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::Failed)
        .collect();
    for outcome in failed {
        eprintln!("failed: {}", outcome.source.display());
    }

    if report.dry_run {
        eprintln!("dry-run: no files were changed. Run without --dry-run to rename.");
    }
    println!("Done reading EXIF");
}
