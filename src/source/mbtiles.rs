//! MBTiles archive reader.
//!
//! MBTiles is a SQLite database with a `metadata` key/value table and a
//! `tiles` table addressed in TMS order (row 0 at the bottom).

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{SourceInfo, TileData, TileSource};
use crate::error::SourceError;

/// Connections per archive
const MAX_CONNECTIONS: u32 = 4;

/// Read-only handle on an `.mbtiles` file.
pub struct MbtilesSource {
    path: PathBuf,
    pool: SqlitePool,
    info: SourceInfo,
    modified: Option<DateTime<Utc>>,
}

impl MbtilesSource {
    /// Open an archive and read its metadata.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let open_error = |message: String| SourceError::Open {
            path: path.display().to_string(),
            message,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| open_error(e.to_string()))?;
        if !metadata.is_file() {
            return Err(open_error("not a file".to_string()));
        }
        let modified = metadata
            .modified()
            .ok()
            .map(|t: SystemTime| DateTime::<Utc>::from(t));

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT name, value FROM metadata")
                .fetch_all(&pool)
                .await
                .map_err(|e| open_error(e.to_string()))?;

        let info = parse_metadata(rows);
        info!(
            path = %path.display(),
            format = info.format.as_deref().unwrap_or("unknown"),
            "Opened MBTiles source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            pool,
            info,
            modified,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TileSource for MbtilesSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn get_tile(&self, z: u32, x: u32, y: u32) -> Result<TileData, SourceError> {
        if z > 30 || x >= (1 << z) || y >= (1 << z) {
            return Err(SourceError::TileNotFound { z, x, y });
        }
        let tms_row = (1i64 << z) - 1 - y as i64;

        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(z as i64)
        .bind(x as i64)
        .bind(tms_row)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((data,)) => Ok(TileData {
                data: Bytes::from(data),
                modified: self.modified,
            }),
            None => {
                debug!(path = %self.path.display(), z, x, y, "Tile not in archive");
                Err(SourceError::TileNotFound { z, x, y })
            }
        }
    }
}

fn parse_metadata(rows: Vec<(String, Option<String>)>) -> SourceInfo {
    let mut info = SourceInfo::default();

    for (name, value) in rows {
        let Some(value) = value else { continue };
        match name.as_str() {
            "format" => info.format = Some(value),
            "name" => info.name = Some(value),
            "description" => info.description = Some(value),
            "attribution" => info.attribution = Some(value),
            "minzoom" => info.minzoom = value.trim().parse().ok(),
            "maxzoom" => info.maxzoom = value.trim().parse().ok(),
            "bounds" => info.bounds = parse_floats(&value),
            "center" => info.center = parse_floats(&value),
            "proj4" => info.proj4 = Some(value),
            "json" => {
                if let Ok(Value::Object(map)) = serde_json::from_str(&value) {
                    info.extra.extend(map);
                }
            }
            _ => {}
        }
    }

    info
}

fn parse_floats<const N: usize>(value: &str) -> Option<[f64; N]> {
    let parsed: Vec<f64> = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    parsed.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_archive(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("test.mbtiles");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        sqlx::query("CREATE TABLE metadata (name TEXT, value TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB)",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (name, value) in [
            ("format", "pbf"),
            ("name", "Test"),
            ("maxzoom", "14"),
            ("bounds", "-180,-85.0511,180,85.0511"),
            ("center", "0,0,2"),
            ("json", r#"{"vector_layers":[{"id":"water"}]}"#),
        ] {
            sqlx::query("INSERT INTO metadata (name, value) VALUES (?, ?)")
                .bind(name)
                .bind(value)
                .execute(&pool)
                .await
                .unwrap();
        }

        // XYZ 1/0/0 is TMS row 1
        sqlx::query("INSERT INTO tiles VALUES (1, 0, 1, ?)")
            .bind(vec![1u8, 2, 3])
            .execute(&pool)
            .await
            .unwrap();

        pool.close().await;
        path
    }

    #[tokio::test]
    async fn test_open_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let path = create_archive(&dir).await;

        let source = MbtilesSource::open(&path).await.unwrap();
        let info = source.info();
        assert_eq!(info.format.as_deref(), Some("pbf"));
        assert_eq!(info.name.as_deref(), Some("Test"));
        assert_eq!(info.maxzoom, Some(14));
        assert_eq!(info.bounds, Some([-180.0, -85.0511, 180.0, 85.0511]));
        assert_eq!(info.center, Some([0.0, 0.0, 2.0]));
        assert!(info.extra.contains_key("vector_layers"));
    }

    #[tokio::test]
    async fn test_get_tile_flips_rows() {
        let dir = TempDir::new().unwrap();
        let source = MbtilesSource::open(create_archive(&dir).await).await.unwrap();

        let tile = source.get_tile(1, 0, 0).await.unwrap();
        assert_eq!(tile.data.as_ref(), &[1, 2, 3]);
        assert!(tile.modified.is_some());

        assert!(matches!(
            source.get_tile(1, 0, 1).await,
            Err(SourceError::TileNotFound { z: 1, x: 0, y: 1 })
        ));
        assert!(matches!(
            source.get_tile(1, 2, 0).await,
            Err(SourceError::TileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = MbtilesSource::open(dir.path().join("missing.mbtiles")).await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }

    #[test]
    fn test_parse_floats() {
        assert_eq!(parse_floats::<3>("1, 2,3"), Some([1.0, 2.0, 3.0]));
        assert_eq!(parse_floats::<3>("1,2"), None);
        assert_eq!(parse_floats::<2>("a,b"), None);
    }
}
