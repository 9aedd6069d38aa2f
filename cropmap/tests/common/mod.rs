//! Outils partagés des tests d'intégration

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use choropleth::{parse_collection, FeatureCollection, PropertyKeys};
use cropmap::{Config, DataSource, LoadError};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Fichiers annuels des fixtures, par année
pub fn fixture_years() -> BTreeMap<i32, PathBuf> {
    let pattern = fixtures_dir().join("output_data/output_*.geojson");
    glob::glob(&pattern.to_string_lossy())
        .unwrap()
        .filter_map(Result::ok)
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.strip_prefix("output_")?.to_string();
            Some((stem.parse().ok()?, path))
        })
        .collect()
}

/// Preset corn sur les fixtures (1980-1982)
pub fn fixture_config() -> Config {
    let mut config = Config::from_preset("corn").unwrap();
    config.data.data_dir = fixtures_dir();
    config.timeline.first_year = 1980;
    config.timeline.last_year = 1982;
    config.timeline.tick_interval_ms = 20;
    config.validate().unwrap();
    config
}

/// Source en mémoire, avec latence optionnelle par année
#[derive(Default)]
pub struct MemSource {
    years: BTreeMap<i32, FeatureCollection>,
    delays: BTreeMap<i32, Duration>,
}

impl MemSource {
    pub fn from_fixtures() -> Self {
        let keys = PropertyKeys::default();
        let years = fixture_years()
            .into_iter()
            .map(|(year, path)| {
                let text = std::fs::read_to_string(path).unwrap();
                (year, parse_collection(&text, &keys).unwrap())
            })
            .collect();
        Self {
            years,
            delays: BTreeMap::new(),
        }
    }

    pub fn with_delay(mut self, year: i32, delay: Duration) -> Self {
        self.delays.insert(year, delay);
        self
    }
}

impl DataSource for MemSource {
    fn load_year(&self, year: i32) -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send {
        let result = self.years.get(&year).cloned().ok_or_else(|| LoadError::Io {
            path: PathBuf::from(format!("memory/{}", year)),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "year not loaded"),
        });
        let delay = self.delays.get(&year).copied();

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    fn load_layer(&self, name: &str) -> impl Future<Output = Result<FeatureCollection, LoadError>> + Send {
        let name = name.to_string();
        async move { Err(LoadError::UnknownLayer(name)) }
    }
}
