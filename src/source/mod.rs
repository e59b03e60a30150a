//! Packaged tile sources.
//!
//! Styles reference vector or raster tiles stored in local archives. Each
//! archive is opened once at style registration and exposed through the
//! [`TileSource`] trait, which the resource router queries for
//! `mbtiles://` URLs.

mod mbtiles;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::SourceError;

pub use mbtiles::MbtilesSource;

/// Metadata declared by a tile archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    /// Tile payload format (`pbf`, `png`, `jpg`, `webp`)
    pub format: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
    pub minzoom: Option<u8>,
    pub maxzoom: Option<u8>,
    /// `[west, south, east, north]`
    pub bounds: Option<[f64; 4]>,
    /// `[lng, lat, zoom]`
    pub center: Option<[f64; 3]>,
    /// Projection of the data, when not web mercator
    pub proj4: Option<String>,
    /// Extra keys from the `json` metadata row (e.g. `vector_layers`)
    pub extra: Map<String, Value>,
}

impl SourceInfo {
    /// Copy the archive metadata into a style `sources` entry.
    pub fn merge_into(&self, target: &mut Map<String, Value>) {
        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                target.insert(key.to_string(), value);
            }
        };
        set("format", self.format.clone().map(Value::from));
        set("name", self.name.clone().map(Value::from));
        set("description", self.description.clone().map(Value::from));
        set("attribution", self.attribution.clone().map(Value::from));
        set("minzoom", self.minzoom.map(Value::from));
        set("maxzoom", self.maxzoom.map(Value::from));
        set("bounds", self.bounds.map(|b| Value::from(b.to_vec())));
        set("center", self.center.map(|c| Value::from(c.to_vec())));
        for (key, value) in &self.extra {
            target.insert(key.clone(), value.clone());
        }
        target.remove("scheme");
    }
}

/// A stored tile and its modification time.
#[derive(Debug, Clone)]
pub struct TileData {
    pub data: Bytes,
    pub modified: Option<DateTime<Utc>>,
}

/// Read access to a tile archive.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Archive metadata read at open time.
    fn info(&self) -> &SourceInfo;

    /// Fetch the tile at XYZ coordinates.
    async fn get_tile(&self, z: u32, x: u32, y: u32) -> Result<TileData, SourceError>;
}
