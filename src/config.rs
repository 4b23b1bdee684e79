use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CvPomError, CvPomResult};

pub const CONFIG_FILE_NAME: &str = "cv_pom.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvPomConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Polling behaviour used when resolving queries against a live screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Multiplier applied to the poll interval after every miss. 1.0 keeps it fixed.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_factor: default_backoff_factor(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_poll_interval_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Factor applied to every point before it reaches the driver
    /// (e.g. 0.5 when screenshots are captured at 2x the input coordinate space).
    #[serde(default = "default_resize")]
    pub resize: f64,
    /// Distance in image pixels covered by a direction swipe.
    #[serde(default = "default_swipe_magnitude")]
    pub swipe_magnitude: i32,
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
    #[serde(default)]
    pub click_interval_ms: u64,
    /// Maximum number of screen swipes performed by `swipe_to`.
    #[serde(default = "default_swipe_to_limit")]
    pub swipe_to_limit: u32,
}

impl InteractionConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            resize: default_resize(),
            swipe_magnitude: default_swipe_magnitude(),
            default_duration_ms: default_duration_ms(),
            click_interval_ms: 0,
            swipe_to_limit: default_swipe_to_limit(),
        }
    }
}

fn default_resize() -> f64 {
    1.0
}

fn default_swipe_magnitude() -> i32 {
    300
}

fn default_duration_ms() -> u64 {
    100
}

fn default_swipe_to_limit() -> u32 {
    50
}

/// How a text region picks between detections with equal overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Tightest container wins; nested UI elements are common.
    #[default]
    SmallestArea,
    /// Earliest detection in source order wins.
    First,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Minimum intersection / smaller-box-area ratio for a text region to attach to a detection.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: f32,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Label given to text regions that do not belong to any detection.
    #[serde(default = "default_text_label")]
    pub text_label: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
            tie_break: TieBreak::default(),
            text_label: default_text_label(),
        }
    }
}

fn default_min_overlap() -> f32 {
    0.5
}

fn default_text_label() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Run text recognition for full-page snapshots (`get_page`).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Passed verbatim to the text recognizer.
    #[serde(default = "default_ocr_options")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            options: default_ocr_options(),
        }
    }
}

fn default_ocr_options() -> serde_json::Map<String, serde_json::Value> {
    let mut options = serde_json::Map::new();
    options.insert("paragraph".into(), serde_json::Value::Bool(false));
    options
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default = "default_conf_threshold")]
    pub conf_threshold: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    /// Class names indexed by model class id. Empty means `class_<id>` labels.
    #[serde(default)]
    pub class_names: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            conf_threshold: default_conf_threshold(),
            iou_threshold: default_iou_threshold(),
            class_names: Vec::new(),
        }
    }
}

fn default_conf_threshold() -> f32 {
    0.25
}

fn default_iou_threshold() -> f32 {
    0.45
}

impl CvPomConfig {
    pub fn from_toml_str(content: &str) -> CvPomResult<Self> {
        let config: CvPomConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> CvPomResult<()> {
        if !(self.interaction.resize.is_finite() && self.interaction.resize > 0.0) {
            return Err(CvPomError::Config(format!(
                "interaction.resize must be a positive number, got {}",
                self.interaction.resize
            )));
        }
        if !(0.0..=1.0).contains(&self.registry.min_overlap) {
            return Err(CvPomError::Config(format!(
                "registry.min_overlap must be within [0, 1], got {}",
                self.registry.min_overlap
            )));
        }
        if !(self.resolver.backoff_factor.is_finite() && self.resolver.backoff_factor >= 1.0) {
            return Err(CvPomError::Config(format!(
                "resolver.backoff_factor must be >= 1.0, got {}",
                self.resolver.backoff_factor
            )));
        }
        Ok(())
    }
}

fn resolve_config_path() -> CvPomResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("cv-pom").join(CONFIG_FILE_NAME);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(CvPomError::Config(format!(
        "{CONFIG_FILE_NAME} not found next to executable, in working directory or user config directory"
    )))
}

/// Load the configuration from the first `cv_pom.toml` found.
pub fn load_config() -> CvPomResult<CvPomConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> CvPomResult<CvPomConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = CvPomConfig::from_toml_str(&content)?;
    tracing::info!(
        path = %path.display(),
        timeout_ms = config.resolver.timeout_ms,
        resize = config.interaction.resize,
        "config loaded"
    );
    Ok(config)
}

/// Like [`load_config`], but falls back to defaults when no file exists.
pub fn load_config_or_default() -> CvPomResult<CvPomConfig> {
    match resolve_config_path() {
        Ok(path) => load_config_from(&path),
        Err(CvPomError::Config(msg)) => {
            tracing::debug!(reason = %msg, "using default config");
            Ok(CvPomConfig::default())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = CvPomConfig::from_toml_str("").unwrap();
        assert_eq!(config.resolver.timeout_ms, 10_000);
        assert_eq!(config.resolver.backoff_factor, 1.0);
        assert_eq!(config.interaction.resize, 1.0);
        assert_eq!(config.registry.tie_break, TieBreak::SmallestArea);
        assert_eq!(config.registry.text_label, "text");
        assert_eq!(
            config.ocr.options.get("paragraph"),
            Some(&serde_json::Value::Bool(false))
        );
    }

    #[test]
    fn sections_override_defaults() {
        let config = CvPomConfig::from_toml_str(
            r#"
            [resolver]
            timeout_ms = 500
            poll_interval_ms = 100

            [interaction]
            resize = 0.5
            swipe_magnitude = 200

            [registry]
            min_overlap = 0.3
            tie_break = "first"

            [ocr]
            enabled = false
            options = { paragraph = true, canvas_size = 1200 }

            [detector]
            model_path = "models/ui.onnx"
            class_names = ["button", "input"]
            "#,
        )
        .unwrap();

        assert_eq!(config.resolver.timeout(), Duration::from_millis(500));
        assert_eq!(config.resolver.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.interaction.resize, 0.5);
        assert_eq!(config.interaction.swipe_magnitude, 200);
        assert_eq!(config.registry.tie_break, TieBreak::First);
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.options["canvas_size"], serde_json::json!(1200));
        assert_eq!(config.detector.class_names, vec!["button", "input"]);
        assert_eq!(
            config.detector.model_path.as_deref(),
            Some(Path::new("models/ui.onnx"))
        );
    }

    #[test]
    fn rejects_non_positive_resize() {
        let err = CvPomConfig::from_toml_str("[interaction]\nresize = 0.0").unwrap_err();
        assert!(matches!(err, CvPomError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_overlap() {
        let err = CvPomConfig::from_toml_str("[registry]\nmin_overlap = 1.5").unwrap_err();
        assert!(matches!(err, CvPomError::Config(_)));
    }
}
