//! In-memory zip writer for bundles.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BundleError;

const COMPRESSION_LEVEL: i64 = 9;

/// Appends named entries to a deflate-compressed zip held in memory.
pub struct BundleArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl Default for BundleArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(COMPRESSION_LEVEL)),
            entries: 0,
        }
    }

    pub fn append(&mut self, name: &str, data: &[u8]) -> Result<(), BundleError> {
        self.writer
            .start_file(name, self.options)
            .map_err(|e| BundleError::Archive(e.to_string()))?;
        self.writer
            .write_all(data)
            .map_err(|e| BundleError::Archive(e.to_string()))?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(self) -> Result<Bytes, BundleError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| BundleError::Archive(e.to_string()))?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}
