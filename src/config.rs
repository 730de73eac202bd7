//! Editor configuration.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names. Values are validated after parsing.

use std::time::Duration;

use callico_geometry::{
    DEFAULT_IMAGE_SIZE_TOLERANCE, DEFAULT_MIN_POLYGON_SIZE, MAX_POLYGON_POINTS, PolygonRules,
};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HANDLE_HIT_RADIUS, DEFAULT_NAVIGATION_MARGIN_PERCENT, DEFAULT_TRANSITION_DURATION_MS,
    DEFAULT_ZOOM_FACTORS,
};
use crate::view::ViewSettings;

/// Log level setting for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Settings of one image annotator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Minimum width and height of a region, in image pixels
    pub min_polygon_size: f64,

    /// Maximum number of distinct polygon vertices
    pub max_polygon_points: usize,

    /// Zoom percentages, ascending
    pub zoom_factors: Vec<u32>,

    /// Accepted deviation between served and declared image size
    pub image_size_tolerance: f64,

    /// Allowed drift outside the viewport, in percent
    pub navigation_margin_percent: f64,

    /// Zoom and recenter animation duration
    pub transition_duration_ms: u64,

    /// Vertex handle hit radius in screen pixels
    pub handle_hit_radius: f64,

    /// Log verbosity level
    pub log_level: LogLevel,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            min_polygon_size: DEFAULT_MIN_POLYGON_SIZE,
            max_polygon_points: MAX_POLYGON_POINTS,
            zoom_factors: DEFAULT_ZOOM_FACTORS.to_vec(),
            image_size_tolerance: DEFAULT_IMAGE_SIZE_TOLERANCE,
            navigation_margin_percent: DEFAULT_NAVIGATION_MARGIN_PERCENT,
            transition_duration_ms: DEFAULT_TRANSITION_DURATION_MS,
            handle_hit_radius: DEFAULT_HANDLE_HIT_RADIUS,
            log_level: LogLevel::default(),
        }
    }
}

impl EditorConfig {
    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zoom_factors.is_empty() {
            return Err(ConfigError::invalid("zoom_factors", "must not be empty"));
        }
        if self.zoom_factors.contains(&0) {
            return Err(ConfigError::invalid("zoom_factors", "must be positive"));
        }
        if !self.zoom_factors.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::invalid("zoom_factors", "must be strictly ascending"));
        }
        if !(self.min_polygon_size.is_finite() && self.min_polygon_size >= 0.0) {
            return Err(ConfigError::invalid("min_polygon_size", "must be a non-negative number"));
        }
        if self.max_polygon_points < 3 {
            return Err(ConfigError::invalid("max_polygon_points", "must be at least 3"));
        }
        if !(0.0..1.0).contains(&self.image_size_tolerance) {
            return Err(ConfigError::invalid("image_size_tolerance", "must be within [0, 1)"));
        }
        if !(self.navigation_margin_percent.is_finite() && self.navigation_margin_percent >= 0.0) {
            return Err(ConfigError::invalid(
                "navigation_margin_percent",
                "must be a non-negative number",
            ));
        }
        if !(self.handle_hit_radius.is_finite() && self.handle_hit_radius > 0.0) {
            return Err(ConfigError::invalid("handle_hit_radius", "must be positive"));
        }
        Ok(())
    }

    /// Polygon validation rules derived from this configuration.
    pub fn polygon_rules(&self) -> PolygonRules {
        PolygonRules {
            min_size: self.min_polygon_size,
            max_points: self.max_polygon_points,
        }
    }

    /// View transform settings derived from this configuration.
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            zoom_factors: self.zoom_factors.clone(),
            navigation_margin_percent: self.navigation_margin_percent,
            transition_duration: Duration::from_millis(self.transition_duration_ms),
        }
    }

    /// Load configuration from a JSON file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of its accepted range
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// I/O error when reading config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
