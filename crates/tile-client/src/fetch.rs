//! Tile retrieval backends.
//!
//! A tile tree is a plain file layout, so it can be read over HTTP from
//! any static server or straight from the local filesystem. Both backends
//! report a missing tile as `Ok(None)` — "zero records", never an error.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::debug;

use tile_common::{tile_relative_path, TileCoord};

use crate::error::FetchError;

/// Retrieves raw tile payloads by coordinate.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the payload for one tile. `None` means the tile does not
    /// exist. The payload may be gzip or plain JSON; the decoder sniffs.
    async fn fetch(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError>;
}

/// Fetches tiles from a static HTTP server exposing the tile tree.
pub struct HttpTileFetcher {
    client: Client,
    base_url: String,
}

impl HttpTileFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn tile_url(&self, coord: &TileCoord) -> String {
        let rel = tile_relative_path(coord);
        format!("{}/{}", self.base_url, rel.display())
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError> {
        let url = self.tile_url(&coord);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(tile = %coord, "Tile not found on server");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.bytes().await?)),
            status => Err(FetchError::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}

/// Fetches tiles from a local tile tree.
pub struct FileTileFetcher {
    root: PathBuf,
}

impl FileTileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TileFetcher for FileTileFetcher {
    async fn fetch(&self, coord: TileCoord) -> Result<Option<Bytes>, FetchError> {
        let path = self.root.join(tile_relative_path(&coord));
        match tokio::fs::read(&path).await {
            Ok(payload) => Ok(Some(Bytes::from(payload))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(tile = %coord, "Tile file absent");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{point_feature, temp_tile_tree};
    use tile_common::FeatureCollection;

    #[test]
    fn test_tile_url_layout() {
        let fetcher = HttpTileFetcher::new("https://tiles.example.org/obs/").unwrap();
        assert_eq!(
            fetcher.tile_url(&TileCoord::new(8, 11, 11)),
            "https://tiles.example.org/obs/8/11/11.geojson.gz"
        );
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_and_tolerates_missing() {
        let coord = TileCoord::new(8, 11, 11);
        let fc = FeatureCollection::new(vec![point_feature(-164.0, 83.4, "a")]);
        let dir = temp_tile_tree(&[(coord, fc.clone())]);

        let fetcher = FileTileFetcher::new(dir.path());

        let payload = fetcher.fetch(coord).await.unwrap();
        assert!(payload.is_some());
        assert_eq!(tile_common::decode_tile(&payload.unwrap()).unwrap(), fc);

        // Absent tile is empty, not an error
        let missing = fetcher.fetch(TileCoord::new(8, 0, 0)).await.unwrap();
        assert!(missing.is_none());
    }
}
