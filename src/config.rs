//! Optimizer configuration.
//!
//! Handles loading, validating, and merging `imgpress.toml`. Configuration is
//! layered: stock defaults are overridden by a config file, which is in turn
//! overridden by command-line flags. Every layer is a sparse TOML table merged
//! with [`merge_toml`] before the result is deserialized and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_width = 1920          # Output never exceeds these bounds
//! max_height = 1080         # Use 3840 x 2160 for UHD
//!
//! [encode]
//! format = "jpeg"           # jpeg | png | webp
//! quality = 80              # 1-100, ignored for png
//!
//! [resample]
//! filter = "triangle"       # nearest | triangle | catmull-rom | gaussian | lanczos3
//!
//! [preview]
//! enabled = true            # Issue a temp-file preview handle per result
//! # dir = "/tmp/previews"   # Defaults to the system temp dir
//!
//! [processing]
//! # max_processes = 4       # Parallel batch workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Bounds, EncodeSettings, OutputFormat, PipelineParams, Quality, Resample};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "imgpress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Optimizer configuration loaded from `imgpress.toml`.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Maximum output dimensions.
    pub limits: LimitsConfig,
    /// Default output format and quality.
    pub encode: EncodeConfig,
    /// Resampling filter for the compositor.
    pub resample: ResampleConfig,
    /// Preview handle settings.
    pub preview: PreviewConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl OptimizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_width == 0 || self.limits.max_height == 0 {
            return Err(ConfigError::Validation(
                "limits.max_width and limits.max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.encode.quality) {
            return Err(ConfigError::Validation(
                "encode.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            max_width: self.limits.max_width,
            max_height: self.limits.max_height,
        }
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            quality: Quality::new(self.encode.quality),
            format: self.encode.format,
        }
    }

    /// Pipeline parameters with the configured defaults.
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            bounds: self.bounds(),
            filter: self.resample.filter,
            settings: self.encode_settings(),
        }
    }
}

/// Output bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_width: Bounds::HD.max_width,
            max_height: Bounds::HD.max_height,
        }
    }
}

/// Default encode settings, used when a caller does not pass its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    pub format: OutputFormat,
    /// Encoding quality (1 = smallest, 100 = best). Ignored for PNG.
    pub quality: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: Quality::default().value(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    pub filter: Resample,
}

/// Preview handle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Issue a preview handle with every result.
    pub enabled: bool,
    /// Directory for preview files. `None` → system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(OptimizerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<OptimizerConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: OptimizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, layering `cli_overrides` on top.
///
/// A missing file is not an error; the stock defaults apply.
pub fn load_config(
    path: &Path,
    cli_overrides: Option<toml::Value>,
) -> Result<OptimizerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let file = load_raw_config(path)?;
    resolve_config(base, file.into_iter().chain(cli_overrides))
}

/// Returns a fully-commented stock `imgpress.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgpress configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output bounds
# ---------------------------------------------------------------------------
[limits]
# Images larger than these bounds are scaled down, preserving aspect ratio.
# Smaller images are never scaled up. For UHD output use 3840 x 2160.
max_width = 1920
max_height = 1080

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# Output format: "jpeg", "png" or "webp".
format = "jpeg"

# Encoding quality (1 = smallest, 100 = best). PNG is lossless and ignores it.
quality = 80

# ---------------------------------------------------------------------------
# Resampling
# ---------------------------------------------------------------------------
[resample]
# Filter used when scaling: "nearest", "triangle", "catmull-rom",
# "gaussian" or "lanczos3". Sharper filters are slower.
filter = "triangle"

# ---------------------------------------------------------------------------
# Preview handles
# ---------------------------------------------------------------------------
[preview]
# Write each result to a temp file that a viewer can open.
enabled = true

# Directory for preview files (defaults to the system temp dir).
# dir = "/tmp/imgpress"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch runs.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<OptimizerConfig, ConfigError> {
        let overlay: toml::Value = toml::from_str(toml_str)?;
        resolve_config(stock_defaults_value()?, [overlay])
    }

    #[test]
    fn default_config_values() {
        let config = OptimizerConfig::default();
        assert_eq!(config.bounds(), Bounds::HD);
        assert_eq!(config.encode.format, OutputFormat::Jpeg);
        assert_eq!(config.encode.quality, 80);
        assert_eq!(config.resample.filter, Resample::Triangle);
        assert!(config.preview.enabled);
        assert!(config.preview.dir.is_none());
        assert!(config.processing.max_processes.is_none());
    }

    #[test]
    fn stock_config_toml_matches_defaults() {
        let config: OptimizerConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.bounds(), Bounds::HD);
        assert_eq!(config.encode.quality, 80);
        assert_eq!(config.encode.format, OutputFormat::Jpeg);
        assert_eq!(config.resample.filter, Resample::Triangle);
        assert!(config.preview.enabled);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse("[encode]\nformat = \"webp\"\n").unwrap();
        assert_eq!(config.encode.format, OutputFormat::Webp);
        // Untouched values keep defaults
        assert_eq!(config.encode.quality, 80);
        assert_eq!(config.bounds(), Bounds::HD);
    }

    #[test]
    fn parse_uhd_limits() {
        let config = parse("[limits]\nmax_width = 3840\nmax_height = 2160\n").unwrap();
        assert_eq!(config.bounds(), Bounds::UHD);
    }

    #[test]
    fn jpg_alias_is_accepted() {
        let config = parse("[encode]\nformat = \"jpg\"\n").unwrap();
        assert_eq!(config.encode.format, OutputFormat::Jpeg);
    }

    #[test]
    fn parse_filter_kebab_case() {
        let config = parse("[resample]\nfilter = \"catmull-rom\"\n").unwrap();
        assert_eq!(config.resample.filter, Resample::CatmullRom);
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(parse("[encode]\nformat = \"tiff\"\n").is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(parse("[encode]\nqualty = 50\n").is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse("[video]\ncodec = \"h264\"\n").is_err());
    }

    #[test]
    fn quality_out_of_range_rejected() {
        assert!(matches!(
            parse("[encode]\nquality = 0\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            parse("[encode]\nquality = 101\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_limits_rejected() {
        assert!(matches!(
            parse("[limits]\nmax_width = 0\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_processes_rejected() {
        assert!(matches!(
            parse("[processing]\nmax_processes = 0\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME), None).unwrap();
        assert_eq!(config.encode.quality, 80);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[encode]\nquality = 60\n\n[preview]\nenabled = false\n").unwrap();

        let config = load_config(&path, None).unwrap();
        assert_eq!(config.encode.quality, 60);
        assert!(!config.preview.enabled);
    }

    #[test]
    fn cli_overrides_beat_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[encode]\nquality = 60\nformat = \"png\"\n").unwrap();

        let overrides: toml::Value = toml::from_str("[encode]\nquality = 30\n").unwrap();
        let config = load_config(&path, Some(overrides)).unwrap();
        assert_eq!(config.encode.quality, 30);
        // File value not overridden survives
        assert_eq!(config.encode.format, OutputFormat::Png);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[encode\nquality = ").unwrap();
        assert!(matches!(load_config(&path, None), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn pipeline_params_follow_config() {
        let config = parse(
            "[limits]\nmax_width = 800\nmax_height = 600\n[encode]\nquality = 55\nformat = \"png\"\n[resample]\nfilter = \"lanczos3\"\n",
        )
        .unwrap();
        let params = config.pipeline_params();
        assert_eq!(params.bounds.max_width, 800);
        assert_eq!(params.bounds.max_height, 600);
        assert_eq!(params.settings.quality.value(), 55);
        assert_eq!(params.settings.format, OutputFormat::Png);
        assert_eq!(params.filter, Resample::Lanczos3);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1").unwrap();
        let overlay: toml::Value = toml::from_str("a = 2").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(2));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("[t]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
    }
}
