mod apply;
mod config;
mod exif_reader;
mod metadata;
mod planner;
mod sanitize;
mod template;

pub const DEFAULT_TEMPLATE: &str = "TSE_{camera_prefix}_{focal_length}mm_{date}_{time}_{exposure}s_f{aperture}_ISO{iso}_{temperature}C_{suffix}";
pub const DEFAULT_SUBFOLDER_TEMPLATE: &str = "{exposure}s_ISO{iso}";

pub use apply::{
    place_file, run_batch, BatchReport, FileOutcome, OutcomeStatus, PlacementError,
};
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths};
pub use exif_reader::{
    parse_capture_metadata, resolve_exiftool, ExifToolReader, MetadataReader, REQUESTED_TAGS,
};
pub use metadata::{CaptureMetadata, Exposure, MetadataError, TEMPERATURE_SENTINEL};
pub use planner::{
    collect_raw_files, plan_rename, CandidateFile, RenamePlan, SortOptions, SortStats,
    DEFAULT_EXTENSIONS, KNOWN_RAW_EXTENSIONS,
};
pub use template::{parse_template, render_template, RenderContext, TemplateError, TemplatePart};
