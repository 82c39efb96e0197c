//! Viewer configuration
//!
//! Settings are stored as JSON. Missing keys fall back to their defaults and
//! a handful of values can be overridden from the environment.

use pageview_cache::CacheConfig;
use pageview_layout::{FitPolicy, LayoutOptions, ScrollAxis};
use pageview_render::{Appearance, Color, ColorScheme, WorkerOptions, DEFAULT_MAX_BITMAP_PIXELS};
use pageview_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MIN_ZOOM: f32 = 1.0;
pub const DEFAULT_MID_ZOOM: f32 = 1.75;
pub const DEFAULT_MAX_ZOOM: f32 = 3.0;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<pageview_cache::ConfigError> for ConfigError {
    fn from(err: pageview_cache::ConfigError) -> Self {
        match err {
            pageview_cache::ConfigError::InvalidValue(key) => ConfigError::InvalidValue(key),
        }
    }
}

/// Everything a document session is opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub fit_policy: FitPolicy,
    pub axis: ScrollAxis,
    /// Gap between pages at zoom 1, in pixels
    pub spacing_px: f32,
    /// Pad pages so each one fills the viewport along the scroll axis
    pub auto_spacing: bool,
    pub fit_each_page: bool,
    /// User page shown after loading
    pub default_page: usize,
    /// Password for encrypted documents, never written back to disk
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Optional ordering of document pages
    pub user_pages: Option<Vec<usize>>,
    pub background_color: Color,
    pub highlight_color: Color,
    pub color_scheme: Option<ColorScheme>,
    pub best_quality: bool,
    pub annotation_rendering: bool,
    pub min_zoom: f32,
    pub mid_zoom: f32,
    pub max_zoom: f32,
    pub max_bitmap_pixels: u64,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fit_policy: FitPolicy::Width,
            axis: ScrollAxis::Vertical,
            spacing_px: 0.0,
            auto_spacing: false,
            fit_each_page: false,
            default_page: 0,
            password: None,
            user_pages: None,
            background_color: Color::WHITE,
            highlight_color: Color::HIGHLIGHT,
            color_scheme: None,
            best_quality: false,
            annotation_rendering: false,
            min_zoom: DEFAULT_MIN_ZOOM,
            mid_zoom: DEFAULT_MID_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_bitmap_pixels: DEFAULT_MAX_BITMAP_PIXELS,
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_fit_policy(mut self, fit_policy: FitPolicy) -> Self {
        self.fit_policy = fit_policy;
        self
    }

    pub fn with_axis(mut self, axis: ScrollAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_spacing(mut self, spacing_px: f32) -> Self {
        self.spacing_px = spacing_px;
        self
    }

    pub fn with_auto_spacing(mut self, auto_spacing: bool) -> Self {
        self.auto_spacing = auto_spacing;
        self
    }

    pub fn with_default_page(mut self, page: usize) -> Self {
        self.default_page = page;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_user_pages(mut self, pages: Vec<usize>) -> Self {
        self.user_pages = Some(pages);
        self
    }

    pub fn with_color_scheme(mut self, scheme: Option<ColorScheme>) -> Self {
        self.color_scheme = scheme;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Default location, `<config dir>/pageview/viewer.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pageview").join("viewer.json"))
    }

    /// Load from the default location, falling back to defaults when no file
    /// exists there
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => {
                log::debug!("no viewer config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("loaded viewer config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write this config as pretty-printed JSON, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Applies environment overrides on top of this configuration.
    ///
    /// Environment variables:
    /// - `PAGEVIEW_FIT_POLICY`: `width`, `height` or `both`
    /// - `PAGEVIEW_SPACING_PX`: non-negative page gap
    /// - `PAGEVIEW_AUTO_SPACING`: `true`/`false` or `1`/`0`
    /// - `PAGEVIEW_CACHE_CAPACITY`, `PAGEVIEW_THUMBNAIL_CAPACITY`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var("PAGEVIEW_FIT_POLICY") {
            self.fit_policy = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAGEVIEW_FIT_POLICY".into()))?;
        }
        if let Ok(value) = std::env::var("PAGEVIEW_SPACING_PX") {
            self.spacing_px = match value.trim().parse::<f32>() {
                Ok(spacing) if spacing.is_finite() && spacing >= 0.0 => spacing,
                _ => return Err(ConfigError::InvalidValue("PAGEVIEW_SPACING_PX".into())),
            };
        }
        if let Ok(value) = std::env::var("PAGEVIEW_AUTO_SPACING") {
            self.auto_spacing = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return Err(ConfigError::InvalidValue("PAGEVIEW_AUTO_SPACING".into())),
            };
        }
        self.cache = self.cache.with_env_overrides()?;
        Ok(self)
    }

    /// Check every value, reporting the first bad key
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str| Err(ConfigError::InvalidValue(key.to_string()));

        if !(self.spacing_px.is_finite() && self.spacing_px >= 0.0) {
            return invalid("spacing_px");
        }
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return invalid("min_zoom");
        }
        if !(self.mid_zoom >= self.min_zoom && self.mid_zoom.is_finite()) {
            return invalid("mid_zoom");
        }
        if !(self.max_zoom >= self.mid_zoom && self.max_zoom.is_finite()) {
            return invalid("max_zoom");
        }
        if self.max_bitmap_pixels == 0 {
            return invalid("max_bitmap_pixels");
        }
        if self.cache.capacity == 0 {
            return invalid("cache.capacity");
        }
        if self.cache.thumbnail_capacity == 0 {
            return invalid("cache.thumbnail_capacity");
        }
        if let Err(key) = self.scheduler.validate() {
            return invalid(&format!("scheduler.{}", key));
        }
        Ok(())
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::default()
            .with_fit_policy(self.fit_policy)
            .with_axis(self.axis)
            .with_spacing(self.spacing_px)
            .with_auto_spacing(self.auto_spacing)
            .with_fit_each_page(self.fit_each_page)
    }

    pub fn appearance(&self) -> Appearance {
        Appearance {
            background: self.background_color,
            highlight: self.highlight_color,
            color_scheme: self.color_scheme,
        }
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            max_bitmap_pixels: self.max_bitmap_pixels,
        }
    }

    /// Clamp a zoom level into the configured range
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    struct EnvGuard {
        keys: Vec<&'static str>,
    }

    impl EnvGuard {
        fn set(pairs: &[(&'static str, &str)]) -> Self {
            for (key, value) in pairs {
                env::set_var(key, value);
            }
            Self {
                keys: pairs.iter().map(|(k, _)| *k).collect(),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.keys {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.fit_policy, FitPolicy::Width);
        assert_eq!(config.axis, ScrollAxis::Vertical);
        assert_eq!(config.min_zoom, 1.0);
        assert_eq!(config.mid_zoom, 1.75);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.cache.capacity, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("viewer.json");

        let config = ViewerConfig::default()
            .with_axis(ScrollAxis::Horizontal)
            .with_spacing(12.0)
            .with_user_pages(vec![2, 0, 1])
            .with_color_scheme(Some(ColorScheme::night()));
        config.save_to_file(&path).unwrap();

        let loaded = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_password_is_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.json");

        ViewerConfig::default()
            .with_password("hunter2")
            .save_to_file(&path)
            .unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(!json.contains("hunter2"));
        assert_eq!(ViewerConfig::from_file(&path).unwrap().password, None);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.json");
        std::fs::write(
            &path,
            r##"{"fit_policy": "both", "highlight_color": "#ff000080", "cache": {"capacity": 40}}"##,
        )
        .unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.fit_policy, FitPolicy::Both);
        assert_eq!(config.highlight_color, Color::rgba(255, 0, 0, 128));
        assert_eq!(config.cache.capacity, 40);
        assert_eq!(config.cache.thumbnail_capacity, 8);
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.json");

        std::fs::write(&path, r#"{"min_zoom": 2.0, "mid_zoom": 1.5}"#).unwrap();
        match ViewerConfig::from_file(&path) {
            Err(ConfigError::InvalidValue(key)) => assert_eq!(key, "mid_zoom"),
            other => panic!("expected invalid mid_zoom, got {:?}", other),
        }

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ViewerConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));

        assert!(matches!(
            ViewerConfig::from_file(temp_dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_validate_scheduler_key() {
        let config = ViewerConfig::default()
            .with_scheduler(SchedulerConfig::default().with_tile_size(0.0));
        match config.validate() {
            Err(ConfigError::InvalidValue(key)) => assert_eq!(key, "scheduler.tile_size"),
            other => panic!("expected invalid tile size, got {:?}", other),
        }
    }

    #[test]
    fn test_layout_options() {
        let options = ViewerConfig::default()
            .with_fit_policy(FitPolicy::Height)
            .with_axis(ScrollAxis::Horizontal)
            .with_spacing(8.0)
            .with_auto_spacing(true)
            .layout_options();
        assert_eq!(options.fit_policy, FitPolicy::Height);
        assert_eq!(options.axis, ScrollAxis::Horizontal);
        assert_eq!(options.spacing, 8.0);
        assert!(options.auto_spacing);
    }

    #[test]
    fn test_clamp_zoom() {
        let config = ViewerConfig::default();
        assert_eq!(config.clamp_zoom(0.2), 1.0);
        assert_eq!(config.clamp_zoom(2.0), 2.0);
        assert_eq!(config.clamp_zoom(10.0), 3.0);
        assert_eq!(config.clamp_zoom(f32::NAN), 1.0);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let _guard = EnvGuard::set(&[
            ("PAGEVIEW_FIT_POLICY", "Height"),
            ("PAGEVIEW_SPACING_PX", "16"),
            ("PAGEVIEW_AUTO_SPACING", "1"),
            ("PAGEVIEW_CACHE_CAPACITY", "64"),
        ]);

        let config = ViewerConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.fit_policy, FitPolicy::Height);
        assert_eq!(config.spacing_px, 16.0);
        assert!(config.auto_spacing);
        assert_eq!(config.cache.capacity, 64);
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_bad_value() {
        let _guard = EnvGuard::set(&[("PAGEVIEW_SPACING_PX", "-3")]);
        match ViewerConfig::default().with_env_overrides() {
            Err(ConfigError::InvalidValue(key)) => assert_eq!(key, "PAGEVIEW_SPACING_PX"),
            other => panic!("expected invalid spacing, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_override_maps_cache_errors() {
        let _guard = EnvGuard::set(&[("PAGEVIEW_THUMBNAIL_CAPACITY", "zero")]);
        match ViewerConfig::default().with_env_overrides() {
            Err(ConfigError::InvalidValue(key)) => assert_eq!(key, "PAGEVIEW_THUMBNAIL_CAPACITY"),
            other => panic!("expected invalid thumbnail capacity, got {:?}", other),
        }
    }
}
