use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendered in place of the sensor temperature when the camera does not report one.
pub const TEMPERATURE_SENTINEL: &str = "x";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("ExifTool returned no metadata")]
    EmptyResponse,
    #[error("missing tag {0}")]
    MissingTag(&'static str),
    #[error("tag {tag} has an unusable value: {value}")]
    InvalidTag { tag: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Exposure {
    Decimal(f64),
    Rational { numerator: f64, denominator: f64 },
}

impl Exposure {
    /// Accepts a plain decimal (`0.5`) or a rational (`1/60`).
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            return value.is_finite().then_some(Self::Decimal(value));
        }

        let (num, denom) = trimmed.split_once('/')?;
        let numerator = num.trim().parse::<f64>().ok()?;
        let denominator = denom.trim().parse::<f64>().ok()?;
        if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
            return None;
        }
        Some(Self::Rational {
            numerator,
            denominator,
        })
    }

    pub fn seconds(&self) -> f64 {
        match *self {
            Self::Decimal(value) => value,
            Self::Rational {
                numerator,
                denominator,
            } => numerator / denominator,
        }
    }

    pub fn to_fixed(&self) -> String {
        format!("{:.6}", self.seconds())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureMetadata {
    pub focal_length_mm: f64,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH-MM-SS`
    pub time: String,
    pub exposure: Exposure,
    pub aperture: String,
    pub iso: String,
    pub temperature: Option<String>,
}

impl CaptureMetadata {
    pub fn focal_length_label(&self) -> String {
        (self.focal_length_mm.trunc() as i64).to_string()
    }

    pub fn temperature_label(&self) -> &str {
        self.temperature
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(TEMPERATURE_SENTINEL)
    }
}
