//! Scanner configuration.
//!
//! Field names follow the camelCase option object (`numOfWorkers`,
//! `locator.halfSample`, `decoder.readers`, ...). Every field has a default,
//! so a partial JSON document is enough. Visualization flags are parsed and
//! carried along for the debug collaborator but never read by the core.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ScanError};

/// Locator patch granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchSize {
    /// Finest grid
    XSmall,
    /// Fine grid
    Small,
    /// Default grid
    #[default]
    Medium,
    /// Coarse grid
    Large,
    /// Coarsest grid
    XLarge,
}

impl PatchSize {
    /// Number of patches along the wider raster side
    pub fn patches_across(&self) -> usize {
        match self {
            PatchSize::XSmall => 60,
            PatchSize::Small => 32,
            PatchSize::Medium => 20,
            PatchSize::Large => 15,
            PatchSize::XLarge => 10,
        }
    }

    /// Patch edge in pixels for a raster of the given size (at least 8)
    pub fn pixels_for(&self, width: usize, height: usize) -> usize {
        (width.max(height) / self.patches_across()).max(8)
    }
}

impl std::str::FromStr for PatchSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x-small" => Ok(PatchSize::XSmall),
            "small" => Ok(PatchSize::Small),
            "medium" => Ok(PatchSize::Medium),
            "large" => Ok(PatchSize::Large),
            "x-large" => Ok(PatchSize::XLarge),
            other => Err(format!(
                "unknown patch size {other:?} (x-small, small, medium, large, x-large)"
            )),
        }
    }
}

/// Requested stream shape; consumed by the external frame source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputStreamConfig {
    /// Stream name
    pub name: String,
    /// Stream type (`LiveStream`, `ImageStream`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Requested dimensions and facing
    pub constraints: StreamConstraints,
}

impl Default for InputStreamConfig {
    fn default() -> Self {
        Self {
            name: "Live".to_string(),
            kind: "LiveStream".to_string(),
            constraints: StreamConstraints::default(),
        }
    }
}

/// Requested frame dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamConstraints {
    /// Frame width
    pub width: usize,
    /// Frame height
    pub height: usize,
    /// Camera facing (`environment` / `user`)
    pub facing: String,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: "environment".to_string(),
        }
    }
}

/// Frame-to-frame tracking thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingConfig {
    /// Consecutive sightings needed to confirm (K)
    pub confirm_after: u32,
    /// Frames without a sighting before a track expires (M)
    pub expire_after: u32,
    /// Max center displacement (frame pixels) for two sightings to correlate
    pub max_center_distance: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            confirm_after: 3,
            expire_after: 5,
            max_center_distance: 80.0,
        }
    }
}

/// Decoder options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecoderConfig {
    /// Enabled readers, tried in order
    pub readers: Vec<String>,
    /// Scanlines sampled per candidate box
    pub scanlines: usize,
    /// Visualization only
    pub draw_bounding_box: bool,
    /// Visualization only
    pub show_frequency: bool,
    /// Visualization only
    pub draw_scanline: bool,
    /// Visualization only
    pub show_pattern: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            readers: vec!["code_128_reader".to_string()],
            scanlines: 3,
            draw_bounding_box: false,
            show_frequency: false,
            draw_scanline: true,
            show_pattern: false,
        }
    }
}

/// Visualization flags for the box-fitting step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxFromPatchesFlags {
    /// Visualization only
    pub show_transformed: bool,
    /// Visualization only
    pub show_transformed_box: bool,
    /// Visualization only
    #[serde(rename = "showBB")]
    pub show_bb: bool,
}

/// Locator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocatorConfig {
    /// Downsample by 2x per axis before locating
    pub half_sample: bool,
    /// Patch granularity
    pub patch_size: PatchSize,
    /// Components with fewer patches are discarded
    pub min_patches: usize,
    /// Minimum max-min intensity inside a patch
    pub min_contrast: u8,
    /// Minimum candidate confidence
    pub min_confidence: f32,
    /// Overlap fraction above which the weaker candidate is dropped
    pub max_overlap: f32,
    /// Maximum angle between neighbouring patches of one component, degrees
    pub max_angle_difference: f32,
    /// Upper bound on analysed patches; the grid coarsens to respect it
    pub max_patches: usize,
    /// Visualization only
    pub show_canvas: bool,
    /// Visualization only
    pub show_patches: bool,
    /// Visualization only
    pub show_found_patches: bool,
    /// Visualization only
    pub show_skeleton: bool,
    /// Visualization only
    pub show_labels: bool,
    /// Visualization only
    pub show_patch_labels: bool,
    /// Visualization only
    pub show_remaining_patch_labels: bool,
    /// Visualization flags for box fitting
    pub box_from_patches: BoxFromPatchesFlags,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            half_sample: true,
            patch_size: PatchSize::Medium,
            min_patches: 3,
            min_contrast: 40,
            min_confidence: 0.25,
            max_overlap: 0.5,
            max_angle_difference: 15.0,
            max_patches: 4096,
            show_canvas: false,
            show_patches: false,
            show_found_patches: false,
            show_skeleton: false,
            show_labels: false,
            show_patch_labels: false,
            show_remaining_patch_labels: false,
            box_from_patches: BoxFromPatchesFlags::default(),
        }
    }
}

/// Visual overlay toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Visualization only; decoding ignores it
    pub show: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self { show: true }
    }
}

/// Top-level scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Image path or data URL for single-shot decoding
    pub src: Option<String>,
    /// Stream shape
    pub input_stream: InputStreamConfig,
    /// Enable frame-to-frame tracking
    pub tracking: bool,
    /// Tracking thresholds
    pub tracking_options: TrackingConfig,
    /// Forwarded to the debug sink
    pub debug: bool,
    /// Visualization only
    pub controls: bool,
    /// Run the locator; when false, scanlines cross the middle of the frame
    pub locate: bool,
    /// Worker pool size
    pub num_of_workers: usize,
    /// Visualization only
    pub visual: VisualConfig,
    /// Decoder options
    pub decoder: DecoderConfig,
    /// Locator options
    pub locator: LocatorConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            src: None,
            input_stream: InputStreamConfig::default(),
            tracking: false,
            tracking_options: TrackingConfig::default(),
            debug: false,
            controls: false,
            locate: true,
            num_of_workers: 4,
            visual: VisualConfig::default(),
            decoder: DecoderConfig::default(),
            locator: LocatorConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true")
    })
}

impl ScannerConfig {
    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&contents)?)
    }

    /// Apply `BARCODE_NUM_WORKERS` and `BARCODE_HALF_SAMPLE` when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = parse_env::<usize>("BARCODE_NUM_WORKERS") {
            self.num_of_workers = n;
        }
        if let Some(half) = parse_env_bool("BARCODE_HALF_SAMPLE") {
            self.locator.half_sample = half;
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_of_workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        if self.decoder.readers.is_empty() {
            return Err(ConfigError::EmptyReaderList);
        }
        if !(1..=32).contains(&self.decoder.scanlines) {
            return Err(ConfigError::InvalidValue {
                field: "decoder.scanlines",
                message: format!("{} not in 1..=32", self.decoder.scanlines),
            });
        }
        if self.tracking_options.confirm_after == 0 || self.tracking_options.expire_after == 0 {
            return Err(ConfigError::InvalidTracking {
                message: "confirmAfter and expireAfter must be at least 1".to_string(),
            });
        }
        if self.tracking_options.max_center_distance <= 0.0 {
            return Err(ConfigError::InvalidTracking {
                message: "maxCenterDistance must be positive".to_string(),
            });
        }
        let locator = &self.locator;
        if !(locator.max_overlap > 0.0 && locator.max_overlap <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "locator.maxOverlap",
                message: format!("{} not in (0, 1]", locator.max_overlap),
            });
        }
        if locator.min_patches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "locator.minPatches",
                message: "must be at least 1".to_string(),
            });
        }
        if locator.max_patches < 16 {
            return Err(ConfigError::InvalidValue {
                field: "locator.maxPatches",
                message: format!("{} is below 16", locator.max_patches),
            });
        }
        Ok(())
    }
}
