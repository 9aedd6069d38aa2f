//! Panneau d'information de la feature sélectionnée

use std::fmt;

use crate::registry::MetricConfig;
use crate::types::Feature;

/// Contenu du panneau d'information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPanel {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

impl InfoPanel {
    /// Panneau d'une feature résolue pour l'année courante
    pub fn for_feature(feature: &Feature, metric_name: &str, metric: &MetricConfig) -> Self {
        let value = match feature.metric(metric_name) {
            Some(v) if metric.classification.classify(Some(v)).is_no_data() => {
                metric.no_data_label.clone()
            }
            Some(v) => format_value(v, metric.unit.as_deref()),
            None => metric.no_data_label.clone(),
        };

        Self {
            title: title_of(feature),
            lines: vec![
                ("County ID".to_string(), feature.id.clone()),
                ("Year".to_string(), format_year(feature.properties.year)),
                (metric.label.clone(), value),
            ],
        }
    }

    /// Panneau d'une sélection sans donnée pour l'année
    pub fn unavailable(id: &str, year: Option<i32>) -> Self {
        Self {
            title: format!("County {}", id),
            lines: vec![
                ("County ID".to_string(), id.to_string()),
                ("Year".to_string(), format_year(year)),
                ("Data".to_string(), "unavailable for this year".to_string()),
            ],
        }
    }
}

impl fmt::Display for InfoPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for (key, value) in &self.lines {
            write!(f, "\n{}: {}", key, value)?;
        }
        Ok(())
    }
}

fn title_of(feature: &Feature) -> String {
    match (&feature.properties.name, &feature.properties.region) {
        (Some(name), Some(region)) => format!("{}, {}", name, region),
        (Some(name), None) => name.clone(),
        _ => format!("County {}", feature.id),
    }
}

fn format_year(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Valeur arrondie à 2 décimales (comme les fichiers annuels), avec unité
fn format_value(value: f64, unit: Option<&str>) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    match unit {
        Some(unit) => format!("{} {}", rounded, unit),
        None => rounded.to_string(),
    }
}
