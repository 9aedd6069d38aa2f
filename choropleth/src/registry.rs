//! Registre des métriques affichables
//!
//! Chaque métrique (nom de propriété dans les fichiers annuels) est associée
//! à sa configuration de classification et à ses libellés.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Category, ClassificationConfig};
use crate::error::ChoroplethError;
use crate::types::Feature;

/// Libellé par défaut de la catégorie "pas de donnée"
pub const DEFAULT_NO_DATA_LABEL: &str = "No data";

/// Configuration d'une métrique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Libellé lisible (titre de légende, panneau d'information)
    pub label: String,

    /// Unité affichée après les valeurs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Seuils et couleurs
    pub classification: ClassificationConfig,

    /// Libellés de légende explicites, un par classe
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legend_labels: Vec<String>,

    /// Libellé de la catégorie "pas de donnée"
    #[serde(default = "default_no_data_label")]
    pub no_data_label: String,
}

fn default_no_data_label() -> String {
    DEFAULT_NO_DATA_LABEL.to_string()
}

impl MetricConfig {
    pub fn new(label: impl Into<String>, classification: ClassificationConfig) -> Self {
        Self {
            label: label.into(),
            unit: None,
            classification,
            legend_labels: Vec::new(),
            no_data_label: default_no_data_label(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Métrique active: nom de la propriété et sa configuration
#[derive(Debug, Clone, Copy)]
pub struct ActiveMetric<'a> {
    pub name: &'a str,
    pub config: &'a MetricConfig,
}

impl ActiveMetric<'_> {
    /// Catégorie d'une feature pour cette métrique
    pub fn classify(&self, feature: &Feature) -> Category {
        self.config.classification.classify(feature.metric(self.name))
    }

    /// Couleur de remplissage d'une catégorie
    pub fn color(&self, category: Category) -> &str {
        self.config.classification.color(category)
    }
}

/// Registre nom de métrique -> configuration
///
/// Remplace les `switch` par métrique: toute la logique de couleur passe par
/// une seule [`ClassificationConfig`] paramétrée.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, MetricConfig>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute ou remplace une métrique
    pub fn insert(&mut self, name: impl Into<String>, config: MetricConfig) -> Option<MetricConfig> {
        self.metrics.insert(name.into(), config)
    }

    /// Récupère la configuration d'une métrique
    ///
    /// # Errors
    ///
    /// [`ChoroplethError::UnknownMetric`] si la métrique n'est pas enregistrée.
    pub fn get(&self, name: &str) -> Result<&MetricConfig, ChoroplethError> {
        self.metrics
            .get(name)
            .ok_or_else(|| ChoroplethError::unknown_metric(name))
    }

    /// Métrique active prête à classer des features
    pub fn active<'a>(&'a self, name: &'a str) -> Result<ActiveMetric<'a>, ChoroplethError> {
        let config = self.get(name)?;
        Ok(ActiveMetric { name, config })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Noms des métriques, triés
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricConfig)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ZeroPolicy;

    const REGISTRY_JSON: &str = r##"{
        "rolling_avg_production": {
            "label": "Production",
            "unit": "bu",
            "classification": {
                "thresholds": [0, 10000000, 20000000],
                "colors": ["#edf8e9", "#bae4b3", "#74c476", "#238b45"],
                "zero_policy": "no_data"
            }
        },
        "yield_percentile": {
            "label": "Yield percentile",
            "classification": {
                "thresholds": [25, 50, 75],
                "colors": ["#a", "#b", "#c", "#d"],
                "no_data_sentinel": -1
            },
            "legend_labels": ["Bottom quarter", "Lower middle", "Upper middle", "Top quarter"]
        }
    }"##;

    #[test]
    fn test_registry_from_json() {
        let registry: MetricRegistry = serde_json::from_str(REGISTRY_JSON).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["rolling_avg_production", "yield_percentile"]
        );

        let production = registry.get("rolling_avg_production").unwrap();
        assert_eq!(production.unit.as_deref(), Some("bu"));
        assert_eq!(production.no_data_label, DEFAULT_NO_DATA_LABEL);
        assert_eq!(production.classification.zero_policy(), ZeroPolicy::NoData);

        let percentile = registry.get("yield_percentile").unwrap();
        assert_eq!(percentile.legend_labels.len(), 4);
    }

    #[test]
    fn test_unknown_metric() {
        let registry = MetricRegistry::new();
        let err = registry.get("ann_avg_temp").unwrap_err();
        assert!(matches!(err, ChoroplethError::UnknownMetric(ref m) if m == "ann_avg_temp"));
    }

    #[test]
    fn test_active_metric_classifies_features() {
        let registry: MetricRegistry = serde_json::from_str(REGISTRY_JSON).unwrap();
        let active = registry.active("rolling_avg_production").unwrap();

        let zero = Feature::new("17001").with_metric("rolling_avg_production", Some(0.0));
        let high = Feature::new("17003").with_metric("rolling_avg_production", Some(12_000_000.0));
        let missing = Feature::new("17005");

        assert_eq!(active.classify(&zero), Category::NoData);
        assert_eq!(active.classify(&high), Category::Bucket(2));
        assert_eq!(active.classify(&missing), Category::NoData);
        assert_eq!(active.color(Category::Bucket(2)), "#74c476");
    }
}
