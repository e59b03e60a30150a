//! Marker icon allow-list and loading.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::info;

use crate::error::OverlayError;

/// Where a marker icon comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// File inside the icons directory
    File(PathBuf),
    /// Remote icon, only accepted when remote icons are allowed
    Remote(String),
}

impl IconSource {
    pub fn label(&self) -> String {
        match self {
            IconSource::File(path) => path.display().to_string(),
            IconSource::Remote(url) => url.clone(),
        }
    }
}

/// Icons available for markers: the files directly inside the icons directory.
#[derive(Debug, Clone, Default)]
pub struct IconRegistry {
    dir: PathBuf,
    names: BTreeSet<String>,
}

impl IconRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// List the icon files under `dir`. A missing directory yields an empty registry.
    pub async fn scan(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut names = BTreeSet::new();

        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let is_file = entry
                    .file_type()
                    .await
                    .map(|t| t.is_file())
                    .unwrap_or(false);
                if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                    names.insert(name.to_string());
                }
            }
        }

        info!(dir = %dir.display(), count = names.len(), "Found marker icons");
        Self {
            dir: dir.to_path_buf(),
            names,
        }
    }

    /// Resolve a user-supplied icon name to a file, if it is allowed.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name = sanitize_filename(name);
        self.names.contains(&name).then(|| self.dir.join(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Strip characters that are not allowed in a plain file name.
///
/// Path separators, reserved punctuation and control characters are removed;
/// `.` and `..` become empty.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"'))
        .filter(|c| !c.is_control())
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        return String::new();
    }
    cleaned.trim_end_matches(|c: char| c == '.' || c == ' ').to_string()
}

/// Load and decode an icon.
pub async fn load_icon(source: &IconSource, http: &reqwest::Client) -> Result<RgbaImage, OverlayError> {
    let icon_error = |message: String| OverlayError::Icon {
        icon: source.label(),
        message,
    };

    let bytes = match source {
        IconSource::File(path) => tokio::fs::read(path)
            .await
            .map_err(|e| icon_error(e.to_string()))?,
        IconSource::Remote(url) => {
            let response = http
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| icon_error(e.to_string()))?;
            response
                .bytes()
                .await
                .map_err(|e| icon_error(e.to_string()))?
                .to_vec()
        }
    };

    image::load_from_memory(&bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| icon_error(e.to_string()))
}
