use crate::metadata::{CaptureMetadata, Exposure, MetadataError};
use anyhow::{Context, Result};
use exiftool::ExifTool;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REQUESTED_TAGS: &[&str] = &[
    "-FocalLength",
    "-DateTimeOriginal",
    "-ExposureTime",
    "-FNumber",
    "-ISO",
    "-CameraTemperature",
];

const TAG_FOCAL_LENGTH: &str = "FocalLength";
const TAG_DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
const TAG_EXPOSURE_TIME: &str = "ExposureTime";
const TAG_F_NUMBER: &str = "FNumber";
const TAG_ISO: &str = "ISO";
const TAG_CAMERA_TEMPERATURE: &str = "CameraTemperature";

/// Source of the raw tag values for one file, as ExifTool's `-json` object.
pub trait MetadataReader {
    /// Called once before the first file. An error here ends the run.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_tags(&mut self, path: &Path) -> Result<Value>;
}

/// Talks to a single `-stay_open` ExifTool process.
pub struct ExifToolReader {
    executable: Option<PathBuf>,
    process: Option<ExifTool>,
}

impl ExifToolReader {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self {
            executable,
            process: None,
        }
    }

    fn process(&mut self) -> Result<&mut ExifTool> {
        self.process
            .as_mut()
            .context("ExifTool was not started before reading files")
    }

    fn spawn(&self) -> Result<ExifTool> {
        match &self.executable {
            Some(path) => {
                info!(executable = %path.display(), "starting ExifTool");
                ExifTool::with_executable(path)
                    .with_context(|| format!("could not start ExifTool at {}", path.display()))
            }
            None => {
                info!("starting ExifTool from PATH");
                ExifTool::new().context("could not start ExifTool; is it installed and on PATH?")
            }
        }
    }
}

impl MetadataReader for ExifToolReader {
    fn start(&mut self) -> Result<()> {
        if self.process.is_none() {
            self.process = Some(self.spawn()?);
        }
        Ok(())
    }

    fn read_tags(&mut self, path: &Path) -> Result<Value> {
        debug!(file = %path.display(), "reading EXIF");
        self.process()?
            .json(path, REQUESTED_TAGS)
            .with_context(|| format!("ExifTool failed to read {}", path.display()))
    }
}

/// An explicitly configured executable wins. On Windows an `exiftool.exe`
/// placed next to the photos is picked up before falling back to `PATH`.
pub fn resolve_exiftool(configured: Option<&Path>, input_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }

    if cfg!(windows) {
        let local = input_dir.join("exiftool.exe");
        if local.is_file() {
            return Some(local);
        }
    }

    None
}

pub fn parse_capture_metadata(value: &Value) -> Result<CaptureMetadata, MetadataError> {
    let fields = as_object(value).ok_or(MetadataError::EmptyResponse)?;

    let focal_raw = required_text(fields, TAG_FOCAL_LENGTH)?;
    let focal_length_mm = strip_unit(&focal_raw, "mm")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(TAG_FOCAL_LENGTH, &focal_raw))?;

    let date_raw = required_text(fields, TAG_DATE_TIME_ORIGINAL)?;
    let (date, time) =
        parse_capture_date(&date_raw).ok_or_else(|| invalid(TAG_DATE_TIME_ORIGINAL, &date_raw))?;

    let exposure_raw = required_text(fields, TAG_EXPOSURE_TIME)?;
    let exposure =
        Exposure::parse(&exposure_raw).ok_or_else(|| invalid(TAG_EXPOSURE_TIME, &exposure_raw))?;

    let aperture = required_text(fields, TAG_F_NUMBER)?;
    let iso = required_text(fields, TAG_ISO)?;

    let temperature = find_tag(fields, TAG_CAMERA_TEMPERATURE)
        .and_then(text_value)
        .map(|raw| strip_unit(&raw, "C").to_string())
        .filter(|v| !v.is_empty());

    Ok(CaptureMetadata {
        focal_length_mm,
        date,
        time,
        exposure,
        aperture,
        iso,
        temperature,
    })
}

fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    let object = match value {
        Value::Array(items) => items.first()?.as_object()?,
        Value::Object(object) => object,
        _ => return None,
    };
    (!object.is_empty()).then_some(object)
}

fn find_tag<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.iter().find_map(|(key, value)| {
        let tag_name = key.rsplit(':').next().unwrap_or(key);
        tag_name.eq_ignore_ascii_case(name).then_some(value)
    })
}

fn required_text(fields: &Map<String, Value>, tag: &'static str) -> Result<String, MetadataError> {
    find_tag(fields, tag)
        .and_then(text_value)
        .ok_or(MetadataError::MissingTag(tag))
}

// ExifTool prints "-" for tags a camera does not write.
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty() && text != "-").then_some(text)
}

fn strip_unit<'a>(raw: &'a str, unit: &str) -> &'a str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(unit).unwrap_or(trimmed).trim()
}

fn invalid(tag: &'static str, value: &str) -> MetadataError {
    MetadataError::InvalidTag {
        tag,
        value: value.to_string(),
    }
}

// "YYYY:MM:DD HH:MM:SS", possibly followed by sub-seconds or an offset.
// Unset camera clocks report all zeros, which is kept as-is.
fn parse_capture_date(input: &str) -> Option<(String, String)> {
    let (date, time) = input.trim().split_once(' ')?;
    let time = time.trim_start().get(..8)?;
    if date.is_empty() {
        return None;
    }
    Some((date.replace(':', "-"), time.replace(':', "-")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon_response() -> Value {
        json!([{
            "SourceFile": "IMG_0042.CR2",
            "FocalLength": "500.0 mm",
            "DateTimeOriginal": "2024:04:08 12:30:01",
            "ExposureTime": "1/60",
            "FNumber": 7.1,
            "ISO": 100,
            "CameraTemperature": "39 C"
        }])
    }

    #[test]
    fn parses_full_canon_response_by_tag_name() {
        let meta = parse_capture_metadata(&canon_response()).expect("must parse");
        assert_eq!(meta.focal_length_mm, 500.0);
        assert_eq!(meta.date, "2024-04-08");
        assert_eq!(meta.time, "12-30-01");
        assert_eq!(meta.exposure.to_fixed(), "0.016667");
        assert_eq!(meta.aperture, "7.1");
        assert_eq!(meta.iso, "100");
        assert_eq!(meta.temperature.as_deref(), Some("39"));
    }

    #[test]
    fn dash_placeholder_counts_as_missing() {
        let response = json!({
            "SourceFile": "DSC_0007.NEF",
            "FocalLength": "24.0 mm",
            "DateTimeOriginal": "2024:04:08 18:02:44",
            "ExposureTime": "0.5",
            "FNumber": "-",
            "ISO": "200"
        });
        let err = parse_capture_metadata(&response).expect_err("FNumber is a dash");
        assert_eq!(err, MetadataError::MissingTag("FNumber"));
    }

    #[test]
    fn missing_temperature_leaves_other_fields_alone() {
        let response = json!({
            "FocalLength": "24.0 mm",
            "DateTimeOriginal": "2024:04:08 18:02:44",
            "ExposureTime": 0.5,
            "FNumber": 2.8,
            "ISO": 200,
            "CameraTemperature": "-"
        });
        let meta = parse_capture_metadata(&response).expect("must parse");
        assert_eq!(meta.temperature, None);
        assert_eq!(meta.temperature_label(), "x");
        assert_eq!(meta.exposure.to_fixed(), "0.500000");
        assert_eq!(meta.aperture, "2.8");
    }

    #[test]
    fn negative_temperature_is_kept_verbatim() {
        let mut response = canon_response();
        response[0]["CameraTemperature"] = json!("-3 C");
        let meta = parse_capture_metadata(&response).expect("must parse");
        assert_eq!(meta.temperature.as_deref(), Some("-3"));
    }

    #[test]
    fn accepts_group_prefixed_and_numeric_values() {
        let response = json!({
            "EXIF:FocalLength": 35,
            "EXIF:DateTimeOriginal": "2023:12:31 23:59:59.25+01:00",
            "EXIF:ExposureTime": "1/250",
            "EXIF:FNumber": 4,
            "EXIF:ISO": 1600,
            "MakerNotes:CameraTemperature": 21
        });
        let meta = parse_capture_metadata(&response).expect("must parse");
        assert_eq!(meta.focal_length_label(), "35");
        assert_eq!(meta.date, "2023-12-31");
        assert_eq!(meta.time, "23-59-59");
        assert_eq!(meta.exposure.to_fixed(), "0.004000");
        assert_eq!(meta.aperture, "4");
        assert_eq!(meta.temperature.as_deref(), Some("21"));
    }

    #[test]
    fn reports_missing_and_invalid_tags() {
        let mut response = canon_response();
        response[0]
            .as_object_mut()
            .expect("object")
            .remove("FocalLength");
        assert_eq!(
            parse_capture_metadata(&response).expect_err("must fail"),
            MetadataError::MissingTag("FocalLength")
        );

        let mut response = canon_response();
        response[0]["ExposureTime"] = json!("1/0");
        assert!(matches!(
            parse_capture_metadata(&response).expect_err("must fail"),
            MetadataError::InvalidTag { tag: "ExposureTime", .. }
        ));

        let mut response = canon_response();
        response[0]["DateTimeOriginal"] = json!("2024:04:08");
        assert!(matches!(
            parse_capture_metadata(&response).expect_err("must fail"),
            MetadataError::InvalidTag { tag: "DateTimeOriginal", .. }
        ));

        let mut response = canon_response();
        response[0]["DateTimeOriginal"] = json!("2024:04:08 12:30");
        assert!(matches!(
            parse_capture_metadata(&response).expect_err("must fail"),
            MetadataError::InvalidTag { tag: "DateTimeOriginal", .. }
        ));
    }

    #[test]
    fn unset_camera_clock_keeps_zero_date() {
        let mut response = canon_response();
        response[0]["DateTimeOriginal"] = json!("0000:00:00 00:00:00");
        let meta = parse_capture_metadata(&response).expect("zero date is still a date");
        assert_eq!(meta.date, "0000-00-00");
        assert_eq!(meta.time, "00-00-00");
    }

    #[test]
    fn empty_response_is_rejected() {
        assert_eq!(
            parse_capture_metadata(&json!([])).expect_err("must fail"),
            MetadataError::EmptyResponse
        );
        assert_eq!(
            parse_capture_metadata(&json!({})).expect_err("must fail"),
            MetadataError::EmptyResponse
        );
    }

    #[test]
    fn missing_executable_fails_at_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("no-exiftool");
        let mut reader = ExifToolReader::new(Some(missing.clone()));

        let err = reader.start().expect_err("nothing to run");
        assert!(err.to_string().contains("could not start ExifTool"), "{err:#}");
        assert!(err.to_string().contains(&missing.display().to_string()));

        let err = reader
            .read_tags(&temp.path().join("IMG_0001.CR2"))
            .expect_err("reader never started");
        assert!(err.to_string().contains("not started"), "{err:#}");
    }

    #[test]
    fn configured_exiftool_path_wins() {
        let configured = PathBuf::from("/opt/exiftool/exiftool");
        let resolved = resolve_exiftool(Some(&configured), Path::new("/photos"));
        assert_eq!(resolved, Some(configured));
    }

    #[cfg(not(windows))]
    #[test]
    fn falls_back_to_path_lookup_off_windows() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("exiftool.exe"), b"x").expect("write exe");
        assert_eq!(resolve_exiftool(None, temp.path()), None);
    }
}
