use crate::exif_reader::{parse_capture_metadata, MetadataReader};
use crate::planner::{
    collect_raw_files, plan_rename, CandidateFile, RenamePlan, SortOptions, SortStats,
};
use crate::template::{parse_template, TemplatePart};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutcomeStatus {
    Renamed,
    Planned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub original_name: String,
    pub destination: Option<PathBuf>,
    pub new_name: Option<String>,
    pub status: OutcomeStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
    pub stats: SortStats,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }
}

/// Moves one file to its planned destination, creating the subfolder first.
/// An existing destination is never overwritten.
pub fn place_file(plan: &RenamePlan) -> Result<PathBuf> {
    let destination = plan.destination();
    if destination != plan.source && destination.exists() {
        return Err(PlacementError::DestinationExists(destination).into());
    }

    if plan.subfolder.is_some() {
        fs::create_dir_all(&plan.destination_dir).with_context(|| {
            format!(
                "could not create subfolder: {}",
                plan.destination_dir.display()
            )
        })?;
    }

    fs::rename(&plan.source, &destination).with_context(|| {
        format!(
            "rename failed: {} -> {}",
            plan.source.display(),
            destination.display()
        )
    })?;
    Ok(destination)
}

/// Processes every raw file in `options.input_dir` one after another. A
/// failure on one file is recorded in the report and the loop moves on;
/// only setup errors (templates, unreadable folder, a reader that cannot
/// start) abort the run.
pub fn run_batch<R, F>(
    options: &SortOptions,
    reader: &mut R,
    mut on_outcome: F,
) -> Result<BatchReport>
where
    R: MetadataReader + ?Sized,
    F: FnMut(&FileOutcome),
{
    let name_parts = parse_template(&options.template)
        .with_context(|| format!("invalid filename template: {}", options.template))?;
    let subfolder_parts = parse_template(&options.subfolder_template).with_context(|| {
        format!(
            "invalid subfolder template: {}",
            options.subfolder_template
        )
    })?;

    let mut stats = SortStats::default();
    let files = collect_raw_files(&options.input_dir, &options.extensions, &mut stats)?;
    info!(
        folder = %options.input_dir.display(),
        files = files.len(),
        dry_run = options.dry_run,
        "starting batch"
    );
    if !files.is_empty() {
        reader.start().context("metadata tool is unavailable")?;
    }

    let mut reserved = HashSet::<PathBuf>::new();
    let mut outcomes = Vec::with_capacity(files.len());
    for file in &files {
        let outcome = match process_file(
            file,
            options,
            reader,
            &name_parts,
            &subfolder_parts,
            &mut reserved,
        ) {
            Ok((destination, status)) => {
                match status {
                    OutcomeStatus::Renamed => stats.renamed += 1,
                    _ => stats.planned += 1,
                }
                FileOutcome {
                    source: file.path.clone(),
                    original_name: file.name.clone(),
                    new_name: file_name_of(&destination),
                    destination: Some(destination),
                    status,
                    error: None,
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(file = %file.path.display(), error = %message, "file skipped");
                stats.failed += 1;
                FileOutcome {
                    source: file.path.clone(),
                    original_name: file.name.clone(),
                    destination: None,
                    new_name: None,
                    status: OutcomeStatus::Failed,
                    error: Some(message),
                }
            }
        };
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    info!(
        renamed = stats.renamed,
        planned = stats.planned,
        failed = stats.failed,
        "batch finished"
    );

    Ok(BatchReport {
        input_dir: options.input_dir.clone(),
        dry_run: options.dry_run,
        outcomes,
        stats,
    })
}

fn process_file<R>(
    file: &CandidateFile,
    options: &SortOptions,
    reader: &mut R,
    name_parts: &[TemplatePart],
    subfolder_parts: &[TemplatePart],
    reserved: &mut HashSet<PathBuf>,
) -> Result<(PathBuf, OutcomeStatus)>
where
    R: MetadataReader + ?Sized,
{
    let tags = reader.read_tags(&file.path)?;
    let metadata = parse_capture_metadata(&tags)
        .with_context(|| format!("unusable metadata in {}", file.name))?;
    let plan = plan_rename(file, &metadata, options, name_parts, subfolder_parts);

    if options.dry_run {
        let destination = reserve_destination(&plan, reserved)?;
        return Ok((destination, OutcomeStatus::Planned));
    }

    let destination = place_file(&plan)?;
    Ok((destination, OutcomeStatus::Renamed))
}

// Dry runs leave the folder untouched, so collisions between files of the
// same batch have to be tracked by hand.
fn reserve_destination(plan: &RenamePlan, reserved: &mut HashSet<PathBuf>) -> Result<PathBuf> {
    let destination = plan.destination();
    let taken = destination != plan.source && destination.exists();
    if taken || !reserved.insert(destination.clone()) {
        return Err(PlacementError::DestinationExists(destination).into());
    }
    Ok(destination)
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|v| v.to_string_lossy().to_string())
}
