//! Global Constants
//!
//! Centralized thresholds for the analysis pipeline.
//! Values that operators may need to tune are mirrored in `config` and
//! only serve as defaults there.

/// Accepted sensor ranges (inclusive), enforced when a reading is constructed
pub mod sensor_range {
    pub const TEMPERATURE_C: (f64, f64) = (-20.0, 60.0);
    pub const HUMIDITY_PCT: (f64, f64) = (0.0, 100.0);
    pub const CO2_PPM: (f64, f64) = (0.0, 10_000.0);
    pub const SOIL_MOISTURE_PCT: (f64, f64) = (0.0, 100.0);
}

/// Fallback rule thresholds
pub mod fallback {
    pub const HIGH_TEMPERATURE_C: f64 = 35.0;
    pub const LOW_TEMPERATURE_C: f64 = 15.0;
    pub const HIGH_HUMIDITY_PCT: f64 = 85.0;
    pub const LOW_CO2_PPM: f64 = 350.0;
    pub const LOW_SOIL_MOISTURE_PCT: f64 = 30.0;

    /// Confidence reported when at least one rule fires
    pub const ANOMALY_CONFIDENCE: f64 = 0.65;
    /// Confidence reported when no rule fires
    pub const NORMAL_CONFIDENCE: f64 = 0.90;
}

/// Result invariants
pub mod result {
    /// Below this confidence the status is always `uncertain`
    pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;

    /// Maximum reasoning length in characters
    pub const MAX_REASONING_CHARS: usize = 500;

    /// Confidence for readings with missing sensors
    pub const MISSING_SENSOR_CONFIDENCE: f64 = 0.1;

    /// Confidence for images that fail quality checks
    pub const IMAGE_QUALITY_CONFIDENCE: f64 = 0.2;

    /// Confidence when the model output could not be parsed
    pub const PARSE_FAILURE_CONFIDENCE: f64 = 0.1;

    /// Confidence when the endpoint could not be reached
    pub const TRANSPORT_FAILURE_CONFIDENCE: f64 = 0.0;

    /// Cost string for paths that never call the model
    pub const ZERO_COST: &str = "0.000000";
}

/// Historical context constants
pub mod history {
    /// Default look-back window
    pub const WINDOW_HOURS: i64 = 24;

    /// A reading at or above this temperature counts as an alert
    pub const ALERT_HIGH_C: f64 = 35.0;

    /// A reading at or below this temperature counts as an alert
    pub const ALERT_LOW_C: f64 = 15.0;

    /// First/last delta below which the trend is `stable`
    pub const STABLE_DELTA_C: f64 = 1.0;
}

/// Image quality heuristics
pub mod image {
    /// Maximum accepted upload (10MB)
    pub const MAX_BYTES: usize = 10 * 1024 * 1024;

    /// Minimum width and height in pixels
    pub const MIN_DIMENSION: u32 = 100;

    /// Side of the grayscale square used for heuristics
    pub const SAMPLE_SIZE: u32 = 256;

    /// Mean brightness (0-255) below which the image is too dark
    pub const MIN_BRIGHTNESS: f64 = 25.0;

    /// Mean edge intensity below which the image is blurry
    pub const MIN_EDGE_MEAN: f64 = 6.0;

    /// Mime type assumed when none is supplied
    pub const DEFAULT_MIME: &str = "image/jpeg";
}

/// Inference pricing (USD per 1M tokens)
pub mod pricing {
    pub const INPUT_PER_MILLION: f64 = 0.15;
    pub const OUTPUT_PER_MILLION: f64 = 0.60;

    /// Assumed share of input tokens in a call's total
    pub const ASSUMED_INPUT_RATIO: f64 = 0.70;
}

/// Daily inference limit constants
pub mod limits {
    /// One call every 10 minutes if evenly spread
    pub const DEFAULT_DAILY_CALLS: u32 = 144;
}

/// Model output parsing constants
pub mod parsing {
    /// Upper bound on the text scanned during brace-matching recovery
    pub const MAX_RECOVERY_SCAN_BYTES: usize = 64 * 1024;
}

/// HTTP/Network constants
pub mod network {
    /// Default inference request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Default bind address for the HTTP surface
    pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

    /// Largest `sensor_data` form field accepted
    pub const MAX_SENSOR_DATA_BYTES: usize = 64 * 1024;
}
