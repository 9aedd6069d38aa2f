//! Classification par seuils des valeurs de métriques
//!
//! Les seuils `[t1, ..., tn]` définissent n+1 classes semi-ouvertes
//! `(-inf, t1), [t1, t2), ..., [tn, +inf)`. Une valeur égale à un seuil
//! tombe dans la classe qui commence à ce seuil.
//!
//! Les valeurs manquantes forment une catégorie à part (`NoData`), avec sa
//! propre couleur. Le traitement de la valeur zéro est un choix explicite
//! par métrique ([`ZeroPolicy`]).

use serde::{Deserialize, Serialize};

use crate::error::ClassificationConfigError;

/// Couleur de la catégorie "pas de donnée" par défaut (fond des comtés)
pub const DEFAULT_NO_DATA_COLOR: &str = "grey";

/// Catégorie visuelle d'une valeur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Index de classe, de 0 à `thresholds.len()`
    Bucket(usize),
    /// Donnée absente ou invalide
    NoData,
}

impl Category {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Category::NoData)
    }

    pub fn bucket(&self) -> Option<usize> {
        match self {
            Category::Bucket(i) => Some(*i),
            Category::NoData => None,
        }
    }
}

/// Signification d'une valeur exactement nulle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    /// Zéro est une valeur basse valide
    #[default]
    Valid,
    /// Zéro signifie "pas d'observation"
    NoData,
}

/// Configuration de classification d'une métrique
///
/// Invariants (vérifiés à la construction et à la désérialisation):
/// seuils finis et strictement croissants, `colors.len() == thresholds.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClassification", into = "RawClassification")]
pub struct ClassificationConfig {
    thresholds: Vec<f64>,
    colors: Vec<String>,
    no_data_color: String,
    zero_policy: ZeroPolicy,
    no_data_sentinel: Option<f64>,
}

/// Forme sérialisée, non validée
#[derive(Debug, Serialize, Deserialize)]
struct RawClassification {
    thresholds: Vec<f64>,
    colors: Vec<String>,
    #[serde(default = "default_no_data_color")]
    no_data_color: String,
    #[serde(default)]
    zero_policy: ZeroPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    no_data_sentinel: Option<f64>,
}

fn default_no_data_color() -> String {
    DEFAULT_NO_DATA_COLOR.to_string()
}

impl TryFrom<RawClassification> for ClassificationConfig {
    type Error = ClassificationConfigError;

    fn try_from(raw: RawClassification) -> Result<Self, Self::Error> {
        let config = ClassificationConfig::new(raw.thresholds, raw.colors, raw.no_data_color)?
            .with_zero_policy(raw.zero_policy);

        Ok(match raw.no_data_sentinel {
            Some(sentinel) => config.with_sentinel(sentinel),
            None => config,
        })
    }
}

impl From<ClassificationConfig> for RawClassification {
    fn from(config: ClassificationConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            colors: config.colors,
            no_data_color: config.no_data_color,
            zero_policy: config.zero_policy,
            no_data_sentinel: config.no_data_sentinel,
        }
    }
}

impl ClassificationConfig {
    /// Crée une configuration validée
    ///
    /// # Errors
    ///
    /// Retourne [`ClassificationConfigError`] si un seuil n'est pas fini, si les
    /// seuils ne sont pas strictement croissants ou si le nombre de couleurs
    /// n'est pas `thresholds.len() + 1`.
    pub fn new(
        thresholds: Vec<f64>,
        colors: Vec<String>,
        no_data_color: impl Into<String>,
    ) -> Result<Self, ClassificationConfigError> {
        for (index, &value) in thresholds.iter().enumerate() {
            if !value.is_finite() {
                return Err(ClassificationConfigError::NonFiniteThreshold { index, value });
            }
            if index > 0 && thresholds[index - 1] >= value {
                return Err(ClassificationConfigError::NotStrictlyIncreasing {
                    index,
                    previous: thresholds[index - 1],
                    value,
                });
            }
        }

        let expected = thresholds.len() + 1;
        if colors.len() != expected {
            return Err(ClassificationConfigError::ColorCountMismatch {
                thresholds: thresholds.len(),
                expected,
                found: colors.len(),
            });
        }

        Ok(Self {
            thresholds,
            colors,
            no_data_color: no_data_color.into(),
            zero_policy: ZeroPolicy::Valid,
            no_data_sentinel: None,
        })
    }

    pub fn with_zero_policy(mut self, policy: ZeroPolicy) -> Self {
        self.zero_policy = policy;
        self
    }

    /// Valeur réservée signifiant "pas de donnée" (ex: `-1` pour les rangs centiles)
    pub fn with_sentinel(mut self, sentinel: f64) -> Self {
        self.no_data_sentinel = Some(sentinel);
        self
    }

    /// Classe une valeur
    ///
    /// Fonction pure: même entrée, même sortie.
    pub fn classify(&self, value: Option<f64>) -> Category {
        let Some(value) = value else {
            return Category::NoData;
        };

        if value.is_nan() {
            return Category::NoData;
        }
        if self.zero_policy == ZeroPolicy::NoData && value == 0.0 {
            return Category::NoData;
        }
        if self.no_data_sentinel == Some(value) {
            return Category::NoData;
        }

        Category::Bucket(self.thresholds.partition_point(|&t| t <= value))
    }

    /// Couleur d'une catégorie
    ///
    /// Une classe hors bornes (issue d'une autre configuration) prend la
    /// couleur "pas de donnée".
    pub fn color(&self, category: Category) -> &str {
        match category {
            Category::Bucket(i) => self
                .colors
                .get(i)
                .map(String::as_str)
                .unwrap_or(&self.no_data_color),
            Category::NoData => &self.no_data_color,
        }
    }

    /// Couleur directement depuis une valeur
    pub fn color_of(&self, value: Option<f64>) -> &str {
        self.color(self.classify(value))
    }

    /// Nombre de classes hors "pas de donnée"
    pub fn bucket_count(&self) -> usize {
        self.colors.len()
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn no_data_color(&self) -> &str {
        &self.no_data_color
    }

    pub fn zero_policy(&self) -> ZeroPolicy {
        self.zero_policy
    }

    pub fn no_data_sentinel(&self) -> Option<f64> {
        self.no_data_sentinel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    fn production() -> ClassificationConfig {
        ClassificationConfig::new(vec![0.0, 10_000_000.0, 20_000_000.0], colors(4), "cn").unwrap()
    }

    #[test]
    fn test_production_scenario() {
        let config = production();

        assert_eq!(config.color_of(Some(-5.0)), "c0");
        assert_eq!(config.color_of(Some(0.0)), "c1");
        assert_eq!(config.color_of(Some(15_000_000.0)), "c2");
        assert_eq!(config.color_of(Some(25_000_000.0)), "c3");
        assert_eq!(config.color_of(None), "cn");
    }

    #[test]
    fn test_threshold_is_lower_inclusive() {
        let config = production();

        for (i, &t) in config.thresholds().iter().enumerate() {
            assert_eq!(config.classify(Some(t)), Category::Bucket(i + 1));
            assert_eq!(config.classify(Some(t + 1e-6)), Category::Bucket(i + 1));
            assert_eq!(config.classify(Some(t - 1e-6)), Category::Bucket(i));
        }
    }

    #[test]
    fn test_nan_is_no_data() {
        assert_eq!(production().classify(Some(f64::NAN)), Category::NoData);
    }

    #[test]
    fn test_infinities_land_in_outer_buckets() {
        let config = production();
        assert_eq!(config.classify(Some(f64::NEG_INFINITY)), Category::Bucket(0));
        assert_eq!(config.classify(Some(f64::INFINITY)), Category::Bucket(3));
    }

    #[test]
    fn test_zero_policy_is_per_config() {
        let valid = production();
        let no_data = production().with_zero_policy(ZeroPolicy::NoData);

        assert_eq!(valid.classify(Some(0.0)), Category::Bucket(1));
        assert_eq!(no_data.classify(Some(0.0)), Category::NoData);
        assert_eq!(no_data.classify(Some(-0.0)), Category::NoData);
        assert_eq!(no_data.classify(Some(1.0)), Category::Bucket(1));
    }

    #[test]
    fn test_sentinel() {
        let percentile = ClassificationConfig::new(vec![25.0, 50.0, 75.0], colors(4), "cn")
            .unwrap()
            .with_sentinel(-1.0);

        assert_eq!(percentile.classify(Some(-1.0)), Category::NoData);
        assert_eq!(percentile.classify(Some(0.0)), Category::Bucket(0));
        assert_eq!(percentile.classify(Some(75.0)), Category::Bucket(3));
    }

    #[test]
    fn test_single_bucket() {
        let config = ClassificationConfig::new(vec![], colors(1), "cn").unwrap();

        assert_eq!(config.classify(Some(-1e9)), Category::Bucket(0));
        assert_eq!(config.classify(Some(1e9)), Category::Bucket(0));
        assert_eq!(config.classify(None), Category::NoData);
    }

    #[test]
    fn test_negative_thresholds() {
        let change = ClassificationConfig::new(vec![-10.0, 0.0, 5.0], colors(4), "cn").unwrap();

        assert_eq!(change.classify(Some(-20.0)), Category::Bucket(0));
        assert_eq!(change.classify(Some(-10.0)), Category::Bucket(1));
        assert_eq!(change.classify(Some(-0.5)), Category::Bucket(1));
        assert_eq!(change.classify(Some(2.0)), Category::Bucket(2));
        assert_eq!(change.classify(Some(5.0)), Category::Bucket(3));
    }

    #[test]
    fn test_rejects_unsorted_thresholds() {
        let err = ClassificationConfig::new(vec![0.0, 10.0, 10.0], colors(4), "cn").unwrap_err();
        assert_eq!(
            err,
            ClassificationConfigError::NotStrictlyIncreasing {
                index: 2,
                previous: 10.0,
                value: 10.0
            }
        );
    }

    #[test]
    fn test_rejects_color_mismatch() {
        let err = ClassificationConfig::new(vec![0.0, 10.0], colors(2), "cn").unwrap_err();
        assert_eq!(
            err,
            ClassificationConfigError::ColorCountMismatch {
                thresholds: 2,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_rejects_non_finite_threshold() {
        let err = ClassificationConfig::new(vec![f64::NAN], colors(2), "cn").unwrap_err();
        assert!(matches!(
            err,
            ClassificationConfigError::NonFiniteThreshold { index: 0, .. }
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ClassificationConfig = serde_json::from_str(
            r##"{"thresholds": [25, 50], "colors": ["#a", "#b", "#c"], "zero_policy": "no_data", "no_data_sentinel": -1}"##,
        )
        .unwrap();
        assert_eq!(ok.zero_policy(), ZeroPolicy::NoData);
        assert_eq!(ok.no_data_sentinel(), Some(-1.0));
        assert_eq!(ok.no_data_color(), DEFAULT_NO_DATA_COLOR);

        let err = serde_json::from_str::<ClassificationConfig>(
            r##"{"thresholds": [50, 25], "colors": ["#a", "#b", "#c"]}"##,
        )
        .unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }
}
