//! Configuration management for the map render server.
//!
//! Configuration comes from two places:
//! - Command-line arguments via clap, each also settable through an `MRS_`
//!   environment variable
//! - A JSON config file naming the styles, data archives and render options
//!
//! # Example
//!
//! ```ignore
//! use map_render_server::config::{Config, FileConfig};
//!
//! let config = Config::parse();
//! let file = FileConfig::load(&config.config)?;
//! println!("Serving {} style(s) on {}", file.styles.len(), config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `MRS_CONFIG` - Path to the JSON config file (required)
//! - `MRS_HOST` - Server bind address (default: 0.0.0.0)
//! - `MRS_PORT` - Server port (default: 8080)
//! - `MRS_PUBLIC_URL` - Base URL advertised in TileJSON
//! - `MRS_CORS_ORIGINS` - Comma-separated allowed origins
//! - `MRS_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//!
//! # Config File
//!
//! ```json
//! {
//!   "options": {
//!     "paths": { "root": "", "styles": "styles", "fonts": "fonts", "mbtiles": "data" },
//!     "formatQuality": { "jpeg": 80, "webp": 90 },
//!     "maxScaleFactor": 3,
//!     "serveStaticMaps": true
//!   },
//!   "styles": { "basic": { "style": "basic.json" } },
//!   "data": { "openmaptiles": { "mbtiles": "zurich.mbtiles" } }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::pool::{
    PoolSizes, DEFAULT_MAX_POOL_SIZES, DEFAULT_MAX_SCALE_FACTOR, DEFAULT_MIN_POOL_SIZES,
    MAX_SCALE_FACTOR_LIMIT,
};
use crate::protocol::FailurePolicies;
use crate::render::{FormatOptions, OutputFormat, DEFAULT_MAX_SIZE};
use crate::style::{DataConfig, StyleConfig};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default timeout for remote resource and icon fetches.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Map Render Server - raster tiles and static maps from vector styles.
#[derive(Parser, Debug, Clone)]
#[command(name = "map-render-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path to the JSON config file.
    #[arg(short, long, env = "MRS_CONFIG")]
    pub config: PathBuf,

    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MRS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MRS_PORT")]
    pub port: u16,

    /// Public base URL used in TileJSON `tiles` entries.
    ///
    /// If not specified, the request's Host header is used.
    #[arg(long, env = "MRS_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MRS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "MRS_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.config.as_os_str().is_empty() {
            return Err("Config file is required. Set --config or MRS_CONFIG".to_string());
        }

        if let Some(url) = &self.public_url {
            if url::Url::parse(url).is_err() {
                return Err(format!("public_url is not a valid URL: {}", url));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Config File
// =============================================================================

/// The JSON config document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub options: OptionsConfig,

    /// Styles to serve, registered in id order
    pub styles: BTreeMap<String, StyleConfig>,

    /// Tile archives referenced as `mbtiles://{id}`
    pub data: HashMap<String, DataConfig>,

    /// Directory of the config file, the base for relative paths
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// `options` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsConfig {
    pub paths: PathsConfig,

    /// Shorthand quality per lossy format, e.g. `{"jpeg": 80}`
    pub format_quality: HashMap<String, u8>,

    pub format_options: FormatOptionsConfig,

    pub max_size: u32,

    /// Extra pixels rendered around tiles and cropped away
    pub tile_margin: u32,

    /// Per scale factor; empty lists use the defaults
    pub min_renderer_pool_sizes: Vec<usize>,
    pub max_renderer_pool_sizes: Vec<usize>,

    pub max_scale_factor: u8,

    /// Text drawn in the corner of every image
    pub watermark: Option<String>,

    /// TrueType font for watermarks, relative to the root path
    pub watermark_font: Option<String>,

    pub allow_remote_marker_icons: bool,

    pub serve_static_maps: bool,

    /// Icon for legacy markers that do not name one
    pub legacy_marker_icon: Option<String>,

    /// Soft-fail every style resource instead of only tiles and remote URLs
    pub lenient_assets: bool,

    pub remote_timeout_secs: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            format_quality: HashMap::new(),
            format_options: FormatOptionsConfig::default(),
            max_size: DEFAULT_MAX_SIZE,
            tile_margin: 0,
            min_renderer_pool_sizes: DEFAULT_MIN_POOL_SIZES.to_vec(),
            max_renderer_pool_sizes: DEFAULT_MAX_POOL_SIZES.to_vec(),
            max_scale_factor: DEFAULT_MAX_SCALE_FACTOR,
            watermark: None,
            watermark_font: None,
            allow_remote_marker_icons: false,
            serve_static_maps: true,
            legacy_marker_icon: None,
            lenient_assets: false,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

/// `options.paths` section. Every entry but `root` is relative to `root`,
/// which is itself relative to the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub root: String,
    pub styles: String,
    pub fonts: String,
    pub sprites: String,
    pub mbtiles: String,
    pub icons: Option<String>,
}

/// `options.formatOptions` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormatOptionsConfig {
    pub png: PngOptionsConfig,
    pub jpeg: QualityOptionsConfig,
    pub webp: WebpOptionsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PngOptionsConfig {
    pub compression_level: Option<u8>,
    pub adaptive_filtering: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QualityOptionsConfig {
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebpOptionsConfig {
    pub quality: Option<u8>,
    pub lossless: Option<bool>,
}

/// Resolved directories.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub styles: PathBuf,
    pub fonts: PathBuf,
    pub sprites: PathBuf,
    pub mbtiles: PathBuf,
    pub icons: Option<PathBuf>,
}

impl FileConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let mut config = Self::from_json(&text).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Parse a config document without touching the filesystem.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let options = &self.options;

        if options.max_size == 0 {
            return Err("maxSize must be greater than 0".to_string());
        }

        if options.max_renderer_pool_sizes.contains(&0) {
            return Err("maxRendererPoolSizes entries must be greater than 0".to_string());
        }

        for (format, quality) in &options.format_quality {
            if OutputFormat::parse(format).is_none() {
                return Err(format!("formatQuality has unknown format: {}", format));
            }
            if *quality == 0 || *quality > 100 {
                return Err(format!("formatQuality.{} must be between 1 and 100", format));
            }
        }

        if let Some(level) = options.format_options.png.compression_level {
            if level > 9 {
                return Err("formatOptions.png.compressionLevel must be between 0 and 9".to_string());
            }
        }

        for (id, style) in &self.styles {
            if style.style.is_empty() {
                return Err(format!("style {} has no style file", id));
            }
        }
        for (id, data) in &self.data {
            if data.mbtiles.is_empty() {
                return Err(format!("data {} has no mbtiles file", id));
            }
        }

        Ok(())
    }

    /// Directories with `root` applied.
    pub fn paths(&self) -> ResolvedPaths {
        let paths = &self.options.paths;
        let root = self.base_dir.join(&paths.root);
        ResolvedPaths {
            styles: root.join(&paths.styles),
            fonts: root.join(&paths.fonts),
            sprites: root.join(&paths.sprites),
            mbtiles: root.join(&paths.mbtiles),
            icons: paths.icons.as_ref().map(|icons| root.join(icons)),
            root,
        }
    }

    /// Watermark font location, if configured.
    pub fn watermark_font_path(&self) -> Option<PathBuf> {
        self.options
            .watermark_font
            .as_ref()
            .map(|font| self.paths().root.join(font))
    }

    /// `maxScaleFactor` clamped to the supported range.
    pub fn max_scale_factor(&self) -> u8 {
        self.options.max_scale_factor.clamp(1, MAX_SCALE_FACTOR_LIMIT)
    }

    pub fn pool_sizes(&self) -> PoolSizes {
        PoolSizes::new(
            self.options.min_renderer_pool_sizes.clone(),
            self.options.max_renderer_pool_sizes.clone(),
        )
    }

    /// Encoder settings: `formatQuality` first, then `formatOptions`.
    pub fn format_options(&self) -> FormatOptions {
        let mut options = FormatOptions::default();
        for (format, quality) in &self.options.format_quality {
            if let Some(format) = OutputFormat::parse(format) {
                options = options.with_quality(format, *quality);
            }
        }

        let overrides = &self.options.format_options;
        if let Some(level) = overrides.png.compression_level {
            options.png_compression_level = level.min(9);
        }
        if let Some(adaptive) = overrides.png.adaptive_filtering {
            options.png_adaptive_filtering = adaptive;
        }
        if let Some(quality) = overrides.jpeg.quality {
            options = options.with_quality(OutputFormat::Jpeg, quality);
        }
        if let Some(quality) = overrides.webp.quality {
            options = options.with_quality(OutputFormat::Webp, quality);
        }
        if let Some(lossless) = overrides.webp.lossless {
            options.webp_lossless = lossless;
        }
        options
    }

    pub fn failure_policies(&self) -> FailurePolicies {
        if self.options.lenient_assets {
            FailurePolicies::lenient()
        } else {
            FailurePolicies::default()
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.options.remote_timeout_secs.max(1))
    }
}

// =============================================================================
// Tests
// =============================================================================
