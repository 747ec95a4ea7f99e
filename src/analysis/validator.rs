//! Input Validators
//!
//! Both validators answer "can this input be sent to inference?" and never
//! fail: the answer is a `Check` with an operator-facing issue string.

use crate::config::ImageQualityConfig;
use crate::types::SensorReading;

/// Validation verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub usable: bool,
    pub issue: Option<String>,
}

impl Check {
    pub fn pass() -> Self {
        Self {
            usable: true,
            issue: None,
        }
    }

    pub fn fail(issue: impl Into<String>) -> Self {
        Self {
            usable: false,
            issue: Some(issue.into()),
        }
    }

    /// Issue text, or an empty string when the check passed
    pub fn issue_text(&self) -> &str {
        self.issue.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Sensor Validator
// =============================================================================

/// Requires all four sensors. Ranges are already enforced when the reading
/// is constructed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SensorValidator;

impl SensorValidator {
    pub fn validate(reading: &SensorReading) -> Check {
        Self::validate_with_rejected(reading, &[])
    }

    /// Like `validate`, naming `rejected` sensors as invalid rather than missing
    pub fn validate_with_rejected(reading: &SensorReading, rejected: &[&str]) -> Check {
        let missing = reading.missing_fields();
        if missing.is_empty() && rejected.is_empty() {
            return Check::pass();
        }

        let issues: Vec<String> = missing
            .iter()
            .map(|field| {
                if rejected.contains(field) {
                    format!("{}_invalid", field)
                } else {
                    format!("{}_missing", field)
                }
            })
            .chain(
                rejected
                    .iter()
                    .filter(|field| !missing.iter().any(|m| m == *field))
                    .map(|field| format!("{}_invalid", field)),
            )
            .collect();
        Check::fail(format!(
            "Missing/invalid sensor readings: {}",
            issues.join(", ")
        ))
    }
}

// =============================================================================
// Image Quality Validator
// =============================================================================

/// Size, brightness and sharpness heuristics over raw image bytes
#[derive(Debug, Clone, Default)]
pub struct ImageQualityValidator {
    config: ImageQualityConfig,
}

impl ImageQualityValidator {
    pub fn new(config: ImageQualityConfig) -> Self {
        Self { config }
    }

    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    /// Absent bytes are valid since the image is optional
    pub fn validate(&self, bytes: Option<&[u8]>) -> Check {
        let Some(bytes) = bytes else {
            return Check::pass();
        };

        if bytes.len() > self.config.max_bytes {
            return Check::fail(format!(
                "Image too large (max {}MB)",
                self.config.max_bytes / (1024 * 1024)
            ));
        }

        match self.assess(bytes) {
            Ok(()) => Check::pass(),
            Err(issue) => Check::fail(issue),
        }
    }

    #[cfg(feature = "image-quality")]
    fn assess(&self, bytes: &[u8]) -> std::result::Result<(), String> {
        use image::imageops::{self, FilterType};

        let img =
            image::load_from_memory(bytes).map_err(|e| format!("Invalid image file: {}", e))?;

        let min = self.config.min_dimension;
        if img.width() < min || img.height() < min {
            return Err(format!("Image too small (min {}x{} pixels)", min, min));
        }

        let side = self.config.sample_size;
        let gray = imageops::resize(&img.to_luma8(), side, side, FilterType::CatmullRom);

        let brightness = mean(gray.as_raw());
        if brightness < self.config.min_brightness {
            return Err("Image too dark for reliable visual assessment".to_string());
        }

        let edges = edge_filter(&gray);
        let edge_mean = mean(edges.as_raw());
        tracing::debug!(brightness, edge_mean, "Image heuristics");
        if edge_mean < self.config.min_edge_mean {
            return Err("Image appears blurry/low-detail for reliable assessment".to_string());
        }

        Ok(())
    }

    #[cfg(not(feature = "image-quality"))]
    fn assess(&self, _bytes: &[u8]) -> std::result::Result<(), String> {
        Err("Image validation unavailable (built without image support)".to_string())
    }
}

#[cfg(feature = "image-quality")]
fn mean(pixels: &[u8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().map(|&p| p as u64).sum::<u64>() as f64 / pixels.len() as f64
}

/// 3x3 edge kernel (8 centre, -1 neighbours), clamped to 0..=255.
/// Border pixels are copied from the source.
#[cfg(feature = "image-quality")]
fn edge_filter(src: &image::GrayImage) -> image::GrayImage {
    let (w, h) = src.dimensions();
    let mut out = src.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = 8 * src.get_pixel(x, y)[0] as i32;
            for (dx, dy) in [
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ] {
                let nx = (x as i32 + dx) as u32;
                let ny = (y as i32 + dy) as u32;
                acc -= src.get_pixel(nx, ny)[0] as i32;
            }
            out.put_pixel(x, y, image::Luma([acc.clamp(0, 255) as u8]));
        }
    }
    out
}
