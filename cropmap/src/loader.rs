//! Chargement des fichiers annuels et des couches de limites
//!
//! Le moteur ne connaît que le trait [`DataSource`]; [`FsSource`] lit les
//! fichiers GeoJSON sur disque avec un délai maximal par lecture.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use choropleth::{parse_collection, ChoroplethError, FeatureCollection};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DataConfig;

/// Échec de chargement d'une collection
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout_ms} ms reading {path}")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("Invalid GeoJSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ChoroplethError,
    },

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),
}

/// Source des collections annuelles et des couches de limites
pub trait DataSource: Send + Sync + 'static {
    /// Collection thématique d'une année
    fn load_year(&self, year: i32)
        -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send;

    /// Couche de limites nommée (ex: "counties")
    fn load_layer(&self, name: &str)
        -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send;
}

/// Source fichiers: `data_dir/year_pattern` et couches configurées
#[derive(Debug, Clone)]
pub struct FsSource {
    data: DataConfig,
}

impl FsSource {
    pub fn new(data: DataConfig) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &DataConfig {
        &self.data
    }

    async fn read_collection(&self, path: PathBuf) -> Result<FeatureCollection, LoadError> {
        let timeout = self.data.fetch_timeout();

        let text = match tokio::time::timeout(timeout, tokio::fs::read_to_string(&path)).await {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => return Err(LoadError::Io { path, source }),
            Err(_) => {
                return Err(LoadError::Timeout {
                    path,
                    timeout_ms: self.data.fetch_timeout_ms,
                })
            }
        };

        let collection = parse_collection(&text, &self.data.properties)
            .map_err(|source| LoadError::Parse { path: path.clone(), source })?;

        debug!(path = %path.display(), features = collection.len(), "Collection loaded");
        Ok(collection)
    }

    /// Années présentes dans le répertoire de données, triées
    ///
    /// Un répertoire absent donne une liste vide.
    pub fn available_years(&self) -> anyhow::Result<Vec<i32>> {
        let (dir, re) = self.data.year_file_regex()?;
        scan_years(&dir, &re)
    }
}

impl DataSource for FsSource {
    fn load_year(&self, year: i32) -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send {
        let path = self.data.year_path(year);
        async move { self.read_collection(path).await }
    }

    fn load_layer(&self, name: &str) -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send {
        let path = self
            .data
            .layer_path(name)
            .ok_or_else(|| LoadError::UnknownLayer(name.to_string()));
        async move { self.read_collection(path?).await }
    }
}

fn scan_years(dir: &Path, re: &regex::Regex) -> anyhow::Result<Vec<i32>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Data directory not found");
        return Ok(Vec::new());
    }

    let mut years = Vec::new();
    for entry in std::fs::read_dir(dir).context(format!("Cannot read {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if let Some(year) = re
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())
        {
            years.push(year);
        }
    }

    years.sort_unstable();
    years.dedup();
    Ok(years)
}
