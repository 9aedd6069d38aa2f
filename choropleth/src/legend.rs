//! Construction de la légende
//!
//! La légende est toujours reconstruite en entier lors d'un changement de
//! métrique: ses éléments n'ont pas d'identité d'une métrique à l'autre.

use serde::Serialize;
use tracing::warn;

use crate::classify::{Category, ClassificationConfig};
use crate::registry::{MetricConfig, DEFAULT_NO_DATA_LABEL};

/// Élément de légende
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub color: String,
    pub category: Category,
}

/// Légende complète, "pas de donnée" en dernier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<LegendItem>,
}

impl LegendSpec {
    /// Construit la légende d'une configuration
    ///
    /// `labels` remplace les libellés générés s'il contient exactement un
    /// libellé par classe; sinon il est ignoré.
    pub fn build(config: &ClassificationConfig, labels: &[String]) -> Self {
        let generated = range_labels(config.thresholds());

        let labels = if labels.is_empty() {
            generated
        } else if labels.len() == config.bucket_count() {
            labels.to_vec()
        } else {
            warn!(
                expected = config.bucket_count(),
                found = labels.len(),
                "Legend label count does not match bucket count, using generated labels"
            );
            generated
        };

        let mut items: Vec<LegendItem> = labels
            .into_iter()
            .zip(config.colors())
            .enumerate()
            .map(|(i, (label, color))| LegendItem {
                label,
                color: color.clone(),
                category: Category::Bucket(i),
            })
            .collect();

        items.push(LegendItem {
            label: DEFAULT_NO_DATA_LABEL.to_string(),
            color: config.no_data_color().to_string(),
            category: Category::NoData,
        });

        Self { title: None, items }
    }

    /// Légende d'une métrique du registre (titre, libellés, "pas de donnée")
    pub fn for_metric(metric: &MetricConfig) -> Self {
        let mut legend = Self::build(&metric.classification, &metric.legend_labels);

        if let Some(no_data) = legend.items.last_mut() {
            no_data.label = metric.no_data_label.clone();
        }
        legend.title = Some(match &metric.unit {
            Some(unit) => format!("{} ({})", metric.label, unit),
            None => metric.label.clone(),
        });

        legend
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Display for LegendSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "{}", title)?;
        }
        for item in &self.items {
            writeln!(f, "  {:<10} {}", item.color, item.label)?;
        }
        Ok(())
    }
}

/// Libellés des intervalles: `< t1`, `t1 - t2`, ..., `> tn`
fn range_labels(thresholds: &[f64]) -> Vec<String> {
    let Some((first, last)) = thresholds.first().zip(thresholds.last()) else {
        return vec!["All values".to_string()];
    };

    let mut labels = Vec::with_capacity(thresholds.len() + 1);
    labels.push(format!("< {}", first));
    for pair in thresholds.windows(2) {
        labels.push(format!("{} - {}", pair[0], pair[1]));
    }
    labels.push(format!("> {}", last));
    labels
}
