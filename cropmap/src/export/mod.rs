//! Export statique: un GeoJSON stylé par année et la légende

pub mod geojson;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use choropleth::{parse_collection, ActiveMetric, LegendSpec};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Bilan d'un export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub years_exported: usize,
    pub years_failed: usize,
    pub features: usize,
}

/// Exporte toutes les années de la frise pour une métrique, en parallèle
///
/// Une année illisible est ignorée (warn) sans interrompre les autres.
pub fn export_years(config: &Config, metric_name: &str, output: &Path) -> Result<ExportSummary> {
    let metric_config = config.metrics.get(metric_name)?;
    let metric = ActiveMetric {
        name: metric_name,
        config: metric_config,
    };
    let years: Vec<i32> = config.timeline()?.years().to_vec();

    std::fs::create_dir_all(output)
        .context(format!("Failed to create output directory: {}", output.display()))?;

    info!(
        metric = metric_name,
        years = years.len(),
        output = %output.display(),
        "Exporting styled GeoJSON"
    );

    let success_count = AtomicUsize::new(0);
    let error_count = AtomicUsize::new(0);
    let feature_count = AtomicUsize::new(0);

    years.par_iter().for_each(|&year| {
        match export_year(config, &metric, year, output) {
            Ok(count) => {
                success_count.fetch_add(1, Ordering::Relaxed);
                feature_count.fetch_add(count, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(year = year, error = %e, "Failed to export year");
                error_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let legend = LegendSpec::for_metric(metric_config);
    let legend_path = output.join("legend.json");
    std::fs::write(&legend_path, serde_json::to_string_pretty(&legend)?)
        .context(format!("Failed to write {}", legend_path.display()))?;

    Ok(ExportSummary {
        years_exported: success_count.load(Ordering::Relaxed),
        years_failed: error_count.load(Ordering::Relaxed),
        features: feature_count.load(Ordering::Relaxed),
    })
}

/// Nom du fichier exporté pour une année
pub fn output_file(output: &Path, metric_name: &str, year: i32) -> PathBuf {
    output.join(format!("{}_{}.geojson", metric_name, year))
}

fn export_year(config: &Config, metric: &ActiveMetric<'_>, year: i32, output: &Path) -> Result<usize> {
    let path = config.data.year_path(year);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let collection = parse_collection(&text, &config.data.properties)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let output_path = output_file(output, metric.name, year);
    self::geojson::export_styled(&collection, metric, &output_path)?;

    debug!(year = year, features = collection.len(), path = %output_path.display(), "Year exported");
    Ok(collection.len())
}
