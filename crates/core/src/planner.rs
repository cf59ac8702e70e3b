use crate::metadata::CaptureMetadata;
use crate::template::{render_template, RenderContext, TemplatePart};
use crate::{DEFAULT_SUBFOLDER_TEMPLATE, DEFAULT_TEMPLATE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Matched case-sensitively, as the cameras write them.
pub const DEFAULT_EXTENSIONS: &[&str] = &["cr2", "CR2", "cr3", "CR3", "nef", "NEF"];
pub const KNOWN_RAW_EXTENSIONS: &[&str] =
    &["cr2", "CR2", "cr3", "CR3", "nef", "NEF", "dng", "DNG"];

#[derive(Debug, Clone)]
pub struct SortOptions {
    pub input_dir: PathBuf,
    pub camera_prefix: String,
    pub use_subfolders: bool,
    pub dry_run: bool,
    pub template: String,
    pub subfolder_template: String,
    pub extensions: Vec<String>,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            camera_prefix: String::new(),
            use_subfolders: false,
            dry_run: false,
            template: DEFAULT_TEMPLATE.to_string(),
            subfolder_template: DEFAULT_SUBFOLDER_TEMPLATE.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SortStats {
    pub scanned_entries: usize,
    pub raw_files: usize,
    pub skipped_empty: usize,
    pub skipped_other: usize,
    pub renamed: usize,
    pub planned: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenamePlan {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub destination_name: String,
    pub subfolder: Option<String>,
}

impl RenamePlan {
    pub fn destination(&self) -> PathBuf {
        self.destination_dir.join(&self.destination_name)
    }
}

pub fn collect_raw_files(
    root: &Path,
    extensions: &[String],
    stats: &mut SortStats,
) -> Result<Vec<CandidateFile>> {
    if !root.is_dir() {
        anyhow::bail!("input folder does not exist: {}", root.display());
    }

    for ext in extensions {
        if !KNOWN_RAW_EXTENSIONS.contains(&ext.trim_start_matches('.')) {
            warn!(extension = %ext, "extension is not a known raw format");
        }
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("could not read folder: {}", root.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        stats.scanned_entries += 1;

        let path = entry.path();
        if !has_extension(path, extensions) {
            stats.skipped_other += 1;
            continue;
        }

        let size_bytes = entry
            .metadata()
            .with_context(|| format!("could not stat {}", path.display()))?
            .len();
        if size_bytes == 0 {
            debug!(file = %path.display(), "skipping empty file");
            stats.skipped_empty += 1;
            continue;
        }

        stats.raw_files += 1;
        out.push(CandidateFile {
            path: path.to_path_buf(),
            name: entry.file_name().to_string_lossy().to_string(),
            size_bytes,
        });
    }

    Ok(out)
}

pub fn plan_rename(
    candidate: &CandidateFile,
    metadata: &CaptureMetadata,
    options: &SortOptions,
    name_parts: &[TemplatePart],
    subfolder_parts: &[TemplatePart],
) -> RenamePlan {
    let ctx = RenderContext {
        metadata,
        camera_prefix: &options.camera_prefix,
        original_name: &candidate.name,
    };
    let destination_name = render_template(name_parts, &ctx);

    let subfolder = options
        .use_subfolders
        .then(|| render_template(subfolder_parts, &ctx));
    let destination_dir = match &subfolder {
        Some(name) => options.input_dir.join(name),
        None => options.input_dir.clone(),
    };

    RenamePlan {
        source: candidate.path.clone(),
        destination_dir,
        destination_name,
        subfolder,
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.') == ext)
        })
        .unwrap_or(false)
}
