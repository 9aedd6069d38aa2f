//! Types d'erreurs pour le crate choropleth

use thiserror::Error;

/// Configuration de classification invalide
///
/// Détectée à la construction (ou à la désérialisation) de la configuration:
/// une erreur de ce type doit faire échouer le démarrage plutôt que produire
/// une carte mal colorée.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationConfigError {
    /// Seuil NaN ou infini
    #[error("threshold #{index} is not finite: {value}")]
    NonFiniteThreshold { index: usize, value: f64 },

    /// Seuils non strictement croissants
    #[error("thresholds must be strictly increasing: #{index} ({value}) follows {previous}")]
    NotStrictlyIncreasing {
        index: usize,
        previous: f64,
        value: f64,
    },

    /// Nombre de couleurs incohérent avec le nombre de seuils
    #[error("{thresholds} thresholds require {expected} colors, found {found}")]
    ColorCountMismatch {
        thresholds: usize,
        expected: usize,
        found: usize,
    },
}

/// Erreurs pouvant survenir dans le moteur choroplèthe
#[derive(Debug, Error)]
pub enum ChoroplethError {
    /// Configuration de classification invalide
    #[error("Invalid classification config: {0}")]
    InvalidClassification(#[from] ClassificationConfigError),

    /// Métrique absente du registre
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Frise temporelle sans aucune année sélectionnable
    #[error("Timeline has no selectable year")]
    EmptyTimeline,

    /// Erreur de lecture GeoJSON
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Document GeoJSON valide mais inutilisable
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

impl ChoroplethError {
    /// Crée une erreur GeoJSON avec contexte
    pub fn invalid_geojson(reason: impl Into<String>) -> Self {
        Self::InvalidGeoJson(reason.into())
    }

    /// Crée une erreur de métrique inconnue
    pub fn unknown_metric(metric: impl Into<String>) -> Self {
        Self::UnknownMetric(metric.into())
    }
}
