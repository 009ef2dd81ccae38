//! Loading and filtering the AutoPick beatmap catalog.

use std::path::Path;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::models::BeatmapRecord;

/// One entry as it appears in a catalog JSON file on disk. Extra fields are
/// tolerated and discarded; only `beatmap_id`, `title`, and `d` are used.
#[derive(Debug, Deserialize)]
struct RawCatalogEntry {
    beatmap_id: i64,
    title: String,
    d: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads a room's AutoPick catalog into runtime `BeatmapRecord`s. Implemented
/// by [`JsonFileCatalogLoader`] in production; tests substitute a canned
/// in-memory list.
pub trait BeatmapCatalogLoader {
    fn load(&self, path: &str, min_star: f64, max_star: f64) -> Result<Vec<BeatmapRecord>, CatalogError>;
}

/// Pure filter: keep only entries whose difficulty `d` lies within
/// `[min_star, max_star]`, inclusive.
pub fn filter_by_rating(entries: Vec<RawCatalogEntry>, min_star: f64, max_star: f64) -> Vec<BeatmapRecord> {
    entries
        .into_iter()
        .filter(|entry| entry.d >= min_star && entry.d <= max_star)
        .map(|entry| BeatmapRecord {
            id: entry.beatmap_id,
            title: entry.title,
            difficulty_rating: entry.d,
            version: String::new(),
            status: String::new(),
            download_disabled: false,
        })
        .collect()
}

/// Reads a catalog JSON file from disk, filters it by star rating, and
/// returns the records in randomized order (spreads repeat plays of the
/// same map across sessions, matching the reference implementation).
pub struct JsonFileCatalogLoader;

impl BeatmapCatalogLoader for JsonFileCatalogLoader {
    fn load(&self, path: &str, min_star: f64, max_star: f64) -> Result<Vec<BeatmapRecord>, CatalogError> {
        let text = std::fs::read_to_string(Path::new(path)).map_err(|source| CatalogError::Read {
            path: path.to_string(),
            source,
        })?;
        let entries: Vec<RawCatalogEntry> =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.to_string(),
                source,
            })?;

        let mut records = filter_by_rating(entries, min_star, max_star);
        records.shuffle(&mut rand::rng());
        Ok(records)
    }
}
