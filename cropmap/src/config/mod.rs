//! Configuration de la carte
//!
//! Un fichier JSON (ou un preset embarqué) décrit où trouver les fichiers
//! annuels, la plage de la frise et les métriques affichables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use choropleth::{MetricRegistry, OnEnd, PropertyKeys, TimelineController};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Variable d'environnement qui remplace `data.data_dir`
pub const DATA_DIR_ENV: &str = "CROPMAP_DATA_DIR";

/// Marqueur de l'année dans `year_pattern`
const YEAR_PLACEHOLDER: &str = "{year}";

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    pub timeline: TimelineConfig,

    /// Métrique affichée au démarrage
    pub default_metric: String,

    /// Métriques affichables, par nom de propriété
    pub metrics: MetricRegistry,
}

/// Emplacement et format des données
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Répertoire racine des données
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Chemin relatif d'un fichier annuel, `{year}` remplacé par l'année
    #[serde(default = "default_year_pattern")]
    pub year_pattern: String,

    /// Couches de limites: nom -> chemin relatif
    #[serde(default)]
    pub layers: BTreeMap<String, String>,

    /// Style des couches de fond, par nom de couche
    #[serde(default = "default_layer_styles")]
    pub layer_styles: BTreeMap<String, LayerStyle>,

    /// Clés des propriétés descriptives
    #[serde(default)]
    pub properties: PropertyKeys,

    /// Délai maximal de lecture d'un fichier
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

/// Remplissage et contour d'une couche de fond
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerStyle {
    #[serde(default = "default_layer_fill")]
    pub fill: String,
    #[serde(default = "default_layer_stroke")]
    pub stroke: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            fill: default_layer_fill(),
            stroke: default_layer_stroke(),
            stroke_width: default_stroke_width(),
        }
    }
}

/// Plage et cadence de la frise
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
    pub first_year: i32,
    pub last_year: i32,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub on_end: OnEnd,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_year_pattern() -> String {
    "output_data/output_{year}.geojson".to_string()
}

fn default_layer_fill() -> String {
    "none".to_string()
}

fn default_layer_stroke() -> String {
    "black".to_string()
}

fn default_stroke_width() -> u32 {
    1
}

/// Comtés pleins en gris sous les données, contours d'états épais
fn default_layer_styles() -> BTreeMap<String, LayerStyle> {
    BTreeMap::from([
        (
            "counties".to_string(),
            LayerStyle {
                fill: "grey".to_string(),
                ..LayerStyle::default()
            },
        ),
        (
            "states".to_string(),
            LayerStyle {
                stroke_width: 3,
                ..LayerStyle::default()
            },
        ),
    ])
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            year_pattern: default_year_pattern(),
            layers: BTreeMap::new(),
            layer_styles: default_layer_styles(),
            properties: PropertyKeys::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "corn" => Self::load_embedded(include_str!("presets/corn.json")),
            "climate" => Self::load_embedded(include_str!("presets/climate.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: corn, climate", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Preset ("corn", "climate") ou chemin vers un fichier JSON
    ///
    /// Applique ensuite les surcharges d'environnement et valide le tout.
    pub fn resolve(spec: &str) -> Result<Self> {
        let mut config = match spec {
            "corn" | "climate" => Self::from_preset(spec)?,
            _ => Self::load(Path::new(spec))?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Surcharges depuis l'environnement (`.env` compris)
    pub fn apply_env_overrides(&mut self) {
        self.override_data_dir(std::env::var(DATA_DIR_ENV).ok());
    }

    fn override_data_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.trim().is_empty()) {
            debug!(data_dir = %dir, "Data directory overridden from environment");
            self.data.data_dir = PathBuf::from(dir);
        }
    }

    /// Vérifie la cohérence de la configuration
    ///
    /// Les seuils et couleurs sont déjà validés à la désérialisation.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            anyhow::bail!("No metric configured");
        }
        if !self.metrics.contains(&self.default_metric) {
            anyhow::bail!(
                "Default metric '{}' is not configured. Available: {}",
                self.default_metric,
                self.metrics.names().collect::<Vec<_>>().join(", ")
            );
        }
        if self.timeline.first_year > self.timeline.last_year {
            anyhow::bail!(
                "Invalid timeline range: {} > {}",
                self.timeline.first_year,
                self.timeline.last_year
            );
        }
        if self.timeline.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be greater than 0");
        }
        if self.data.fetch_timeout_ms == 0 {
            anyhow::bail!("fetch_timeout_ms must be greater than 0");
        }
        validate_year_pattern(&self.data.year_pattern)?;

        for (name, metric) in self.metrics.iter() {
            let expected = metric.classification.bucket_count();
            if !metric.legend_labels.is_empty() && metric.legend_labels.len() != expected {
                warn!(
                    metric = name,
                    expected = expected,
                    found = metric.legend_labels.len(),
                    "Legend labels ignored: one label per class expected"
                );
            }
        }

        Ok(())
    }

    /// Frise construite depuis la plage configurée
    pub fn timeline(&self) -> Result<TimelineController> {
        TimelineController::from_range(
            self.timeline.first_year,
            self.timeline.last_year,
            self.timeline.on_end,
        )
        .context("Failed to build timeline")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timeline.tick_interval_ms)
    }
}

impl DataConfig {
    /// Chemin du fichier d'une année
    pub fn year_path(&self, year: i32) -> PathBuf {
        self.data_dir
            .join(self.year_pattern.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }

    /// Chemin d'une couche de limites configurée
    pub fn layer_path(&self, name: &str) -> Option<PathBuf> {
        self.layers.get(name).map(|p| self.data_dir.join(p))
    }

    /// Style d'une couche, style neutre si elle n'est pas décrite
    pub fn layer_style(&self, name: &str) -> LayerStyle {
        self.layer_styles.get(name).cloned().unwrap_or_default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Répertoire des fichiers annuels et regex de leur nom (année capturée)
    pub fn year_file_regex(&self) -> Result<(PathBuf, Regex)> {
        validate_year_pattern(&self.year_pattern)?;

        let (dir, file) = match self.year_pattern.rsplit_once('/') {
            Some((dir, file)) => (self.data_dir.join(dir), file),
            None => (self.data_dir.clone(), self.year_pattern.as_str()),
        };

        let (before, after) = file
            .split_once(YEAR_PLACEHOLDER)
            .context("Year placeholder must be in the file name")?;
        let pattern = format!(
            r"^{}(\d{{4}}){}$",
            regex::escape(before),
            regex::escape(after)
        );

        Ok((dir, Regex::new(&pattern)?))
    }
}

/// Le motif doit contenir exactement un `{year}`, dans le nom de fichier
fn validate_year_pattern(pattern: &str) -> Result<()> {
    let placeholder = Regex::new(r"\{year\}")?;
    let count = placeholder.find_iter(pattern).count();
    if count != 1 {
        anyhow::bail!(
            "Invalid year_pattern '{}': expected exactly one {} placeholder, found {}",
            pattern,
            YEAR_PLACEHOLDER,
            count
        );
    }

    let file_name = pattern.rsplit('/').next().unwrap_or(pattern);
    if !placeholder.is_match(file_name) {
        anyhow::bail!(
            "Invalid year_pattern '{}': {} must appear in the file name",
            pattern,
            YEAR_PLACEHOLDER
        );
    }

    Ok(())
}
