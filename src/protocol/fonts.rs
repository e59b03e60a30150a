//! Glyph ranges from the fonts directory.
//!
//! Each font lives in its own directory holding one protobuf file per
//! 256-codepoint range: `{fonts}/{font name}/{start}-{end}.pbf`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use crate::error::ResourceError;

/// The set of fonts available on disk.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    dir: PathBuf,
    fonts: BTreeSet<String>,
}

impl FontRegistry {
    /// Registry with no fonts; every glyph request fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enumerate the font directories under `dir`.
    pub async fn scan(dir: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let dir = dir.as_ref();
        let io_error = |e: std::io::Error| ResourceError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut fonts = BTreeSet::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            if entry.file_type().await.map_err(io_error)?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    fonts.insert(name.to_string());
                }
            }
        }

        info!(dir = %dir.display(), count = fonts.len(), "Found fonts");
        Ok(Self {
            dir: dir.to_path_buf(),
            fonts,
        })
    }

    pub fn contains(&self, font: &str) -> bool {
        self.fonts.contains(font)
    }

    /// Font names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Concatenate the glyph range of every known font in a comma separated stack.
    ///
    /// Unknown fonts are skipped. Protobuf messages concatenate into a valid
    /// message carrying every font's glyphs.
    pub async fn glyphs(&self, fontstack: &str, range: &str) -> Result<Bytes, ResourceError> {
        let mut out = BytesMut::new();
        let mut found = 0;

        for font in fontstack.split(',').map(str::trim) {
            if !self.contains(font) {
                debug!(font, "Skipping unknown font");
                continue;
            }
            let path = self.dir.join(font).join(format!("{range}.pbf"));
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| ResourceError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            out.extend_from_slice(&data);
            found += 1;
        }

        if found == 0 {
            return Err(ResourceError::FontNotFound {
                fontstack: fontstack.to_string(),
                range: range.to_string(),
            });
        }
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fonts_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (font, payload) in [("Open Sans Regular", b"AAA"), ("Noto Sans", b"BBB")] {
            let font_dir = dir.path().join(font);
            std::fs::create_dir(&font_dir).unwrap();
            std::fs::write(font_dir.join("0-255.pbf"), payload).unwrap();
        }
        std::fs::write(dir.path().join("README"), b"not a font").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_scan_lists_directories() {
        let dir = fonts_dir();
        let registry = FontRegistry::scan(dir.path()).await.unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["Noto Sans", "Open Sans Regular"]);
    }

    #[tokio::test]
    async fn test_glyphs_concatenates_known_fonts() {
        let dir = fonts_dir();
        let registry = FontRegistry::scan(dir.path()).await.unwrap();
        let data = registry
            .glyphs("Open Sans Regular,Unknown Font,Noto Sans", "0-255")
            .await
            .unwrap();
        assert_eq!(data.as_ref(), b"AAABBB");
    }

    #[tokio::test]
    async fn test_glyphs_no_known_font() {
        let dir = fonts_dir();
        let registry = FontRegistry::scan(dir.path()).await.unwrap();
        assert!(matches!(
            registry.glyphs("Unknown", "0-255").await,
            Err(ResourceError::FontNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_glyphs_missing_range_is_io_error() {
        let dir = fonts_dir();
        let registry = FontRegistry::scan(dir.path()).await.unwrap();
        assert!(matches!(
            registry.glyphs("Noto Sans", "256-511").await,
            Err(ResourceError::Io { .. })
        ));
    }
}
