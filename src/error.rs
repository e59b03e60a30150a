use thiserror::Error;

/// Errors raised by a render engine instance.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be instantiated for a style
    #[error("Failed to create renderer: {message}")]
    Create { message: String },

    /// The engine failed while rendering
    #[error("Render failed: {message}")]
    Render { message: String },

    /// A sub-resource fetch failed hard and aborted the render
    #[error("Resource fetch failed: {0}")]
    Resource(#[from] ResourceError),
}

/// Errors from resolving a sub-resource requested by a renderer.
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    /// URL could not be interpreted for its scheme
    #[error("Invalid resource URL: {0}")]
    InvalidUrl(String),

    /// No handler exists for the URL scheme
    #[error("Unsupported resource scheme: {0}")]
    UnsupportedScheme(String),

    /// Local file could not be read
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// None of the fonts in a font stack are available
    #[error("No glyphs found for font stack '{fontstack}' range {range}")]
    FontNotFound { fontstack: String, range: String },

    /// Packaged tile source failed
    #[error("Tile source error: {0}")]
    Source(#[from] SourceError),

    /// Remote fetch failed or returned a non-success status
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },
}

/// Errors from a packaged tile source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Source file does not exist or is not a valid archive
    #[error("Invalid tile source {path}: {message}")]
    Open { path: String, message: String },

    /// No tile stored at the coordinate
    #[error("Tile {z}/{x}/{y} not found")]
    TileNotFound { z: u32, x: u32, y: u32 },

    /// Named source is not registered for the style
    #[error("Unknown tile source: {0}")]
    UnknownSource(String),

    /// Query against the archive failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        SourceError::Database(err.to_string())
    }
}

/// Errors from a renderer pool.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// Pool was drained and closed while the caller waited
    #[error("Renderer pool is closed")]
    Closed,

    /// Creating a new renderer for this caller failed
    #[error("Failed to create renderer: {0}")]
    Create(EngineError),

    /// No pool exists for the requested scale factor
    #[error("No renderer pool for scale factor {scale}")]
    ScaleNotConfigured { scale: u8 },
}

/// Errors that end a render request.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Center is outside the renderable world or not a number
    #[error("Invalid center")]
    InvalidCenter,

    /// Width/height is zero or exceeds the configured maximum
    #[error("Invalid size")]
    InvalidSize,

    /// Output format is not one of png, jpeg, jpg, webp
    #[error("Invalid format: {format}")]
    InvalidFormat { format: String },

    /// Negative or non-finite zoom
    #[error("Invalid zoom")]
    InvalidZoom,

    /// Scale factor not served
    #[error("Invalid scale factor: {scale}")]
    InvalidScale { scale: u8 },

    /// Tile coordinate violates 0 <= z <= max and 0 <= x,y < 2^z
    #[error("Out of bounds")]
    OutOfBounds,

    /// Style is not registered
    #[error("Style not found: {style_id}")]
    StyleNotFound { style_id: String },

    /// The auto static mode found nothing to fit
    #[error("No coordinates provided")]
    NoCoordinates,

    /// Malformed request component
    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    /// Pool acquire failed
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Engine failed during rendering
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Post-processing or encoding failed
    #[error("Image processing failed: {message}")]
    Codec { message: String },

    /// Overlay layer could not be produced
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),
}

/// Errors from building an overlay layer.
#[derive(Debug, Clone, Error)]
pub enum OverlayError {
    /// Icon could not be loaded or decoded
    #[error("Failed to load icon {icon}: {message}")]
    Icon { icon: String, message: String },

    /// Canvas could not be allocated for the requested size
    #[error("Invalid canvas size {width}x{height}")]
    Canvas { width: u32, height: u32 },

    /// Watermark font could not be parsed
    #[error("Invalid font: {0}")]
    Font(String),
}

/// Errors from registering a style.
#[derive(Debug, Clone, Error)]
pub enum StyleError {
    /// Style document could not be read
    #[error("Failed to read style {path}: {message}")]
    Read { path: String, message: String },

    /// Style document is not valid JSON
    #[error("Failed to parse style {path}: {message}")]
    Parse { path: String, message: String },

    /// A `{data}` reference does not resolve to a configured data source
    #[error("Data source '{0}' not found")]
    DataNotFound(String),

    /// A packaged tile source failed to open
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors from building a tile bundle.
#[derive(Debug, Clone, Error)]
pub enum BundleError {
    /// Zip archive could not be written
    #[error("Failed to write archive: {0}")]
    Archive(String),
}

/// Errors from loading configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {message}")]
    Read { path: String, message: String },

    /// Config file is not valid JSON for the expected schema
    #[error("Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    /// Config values are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
