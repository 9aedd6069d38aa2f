//! Définition et implémentation des commandes CLI
//!
//! - `play`: lecture sans affichage, frame par frame dans les logs
//! - `export`: GeoJSON stylé par année + légende
//! - `legend`: légende d'une métrique
//! - `years`: années présentes dans le répertoire de données

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use choropleth::{LegendSpec, OnEnd, TimelineController};
use clap::Subcommand;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::loader::{DataSource, FsSource};
use crate::player::{Command, Player};
use crate::session::MapSession;

#[derive(Subcommand)]
pub enum Commands {
    /// Play the timeline headlessly and report every rendered frame
    Play {
        /// Config preset name (corn/climate) or path to a JSON config
        #[arg(short, long, default_value = "corn")]
        config: String,

        /// Data directory (overrides config and CROPMAP_DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Metric to display (default: config default_metric)
        #[arg(short, long)]
        metric: Option<String>,

        /// First year to display
        #[arg(long)]
        from: Option<i32>,

        /// Behavior at the last year: loop, stop
        #[arg(long)]
        on_end: Option<OnEnd>,

        /// Tick interval in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Feature id to select before playback (e.g. 17001)
        #[arg(long)]
        select: Option<String>,

        /// Write the session report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Export one styled GeoJSON per year plus legend.json
    Export {
        /// Config preset name (corn/climate) or path to a JSON config
        #[arg(short, long, default_value = "corn")]
        config: String,

        /// Data directory (overrides config and CROPMAP_DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Metric to export (default: config default_metric)
        #[arg(short, long)]
        metric: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the legend of a metric
    Legend {
        /// Config preset name (corn/climate) or path to a JSON config
        #[arg(short, long, default_value = "corn")]
        config: String,

        /// Metric (default: config default_metric)
        #[arg(short, long)]
        metric: Option<String>,
    },

    /// List the years available in the data directory
    Years {
        /// Config preset name (corn/climate) or path to a JSON config
        #[arg(short, long, default_value = "corn")]
        config: String,

        /// Data directory (overrides config and CROPMAP_DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

/// Options de la commande play
pub struct PlayOptions {
    pub config: String,
    pub data_dir: Option<PathBuf>,
    pub metric: Option<String>,
    pub from: Option<i32>,
    pub on_end: Option<OnEnd>,
    pub tick_ms: Option<u64>,
    pub select: Option<String>,
    pub report: Option<PathBuf>,
}

/// Configuration résolue avec surcharge éventuelle du répertoire de données
fn load_config(spec: &str, data_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::resolve(spec)?;
    if let Some(dir) = data_dir {
        config.data.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

/// Exécute la commande play
pub async fn cmd_play(options: PlayOptions) -> Result<()> {
    let start = Instant::now();
    let mut config = load_config(&options.config, options.data_dir.as_deref())?;

    if let Some(on_end) = options.on_end {
        config.timeline.on_end = on_end;
    }
    if let Some(tick_ms) = options.tick_ms.filter(|&t| t > 0) {
        config.timeline.tick_interval_ms = tick_ms;
    }
    if let Some(metric) = options.metric {
        config.default_metric = metric;
    }
    config.validate()?;

    let source = Arc::new(FsSource::new(config.data.clone()));
    let mut session = MapSession::from_config(&config)?;

    for name in config.data.layers.keys() {
        match source.load_layer(name).await {
            Ok(layer) => {
                info!(layer = %name, features = layer.len(), "Boundary layer loaded");
                session.store_mut().insert_layer(name.clone(), layer);
            }
            Err(e) => warn!(layer = %name, error = %e, "Boundary layer unavailable"),
        }
    }

    if let Some(id) = &options.select {
        session.on_feature_clicked(id);
    }
    start_playback(session.timeline_mut(), options.from);

    println!("=== Play {} ===", config.default_metric);
    println!("Data: {}", config.data.data_dir.display());
    println!(
        "Years: {}-{} (from {})",
        config.timeline.first_year,
        config.timeline.last_year,
        session.timeline().current_year()
    );
    println!("Tick: {} ms", config.timeline.tick_interval_ms);
    println!("On end: {:?}", config.timeline.on_end);
    println!("{}", session.legend());

    let (command_tx, command_rx) = mpsc::channel(16);
    let (frame_tx, mut frame_rx) = mpsc::channel(16);

    let player = Player::new(session, source, config.tick_interval())
        .stop_when_idle(config.timeline.on_end == OnEnd::Stop);
    let handle = tokio::spawn(player.run(command_rx, frame_tx));

    let shutdown = command_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(Command::Shutdown).await;
        }
    });

    while let Some(frame) = frame_rx.recv().await {
        info!("{}", frame.summary());
        if let Some(panel) = &frame.info {
            println!("{}\n", panel);
        }
    }

    let session = handle.await.context("Player task failed")?;
    drop(command_tx);

    let mut report = session.into_report();
    report.set_duration(start.elapsed());
    report.finalize();
    report.display();

    if let Some(path) = options.report {
        report
            .save_to_file(&path)
            .context(format!("Failed to write report: {}", path.display()))?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

/// Positionne la frise sur l'année de départ puis lance la lecture
///
/// Une année de départ explicite n'est jamais remplacée par le retour au
/// début de `Stop`: sur la dernière année, elle est affichée sans lecture.
fn start_playback(timeline: &mut TimelineController, from: Option<i32>) {
    if let Some(year) = from {
        let change = timeline.select_by_year(year);
        if timeline.on_end() == OnEnd::Stop && change.index + 1 == timeline.len() {
            warn!(
                year = change.year,
                "Start year is the last year and playback stops at the end, nothing to play"
            );
            return;
        }
    }
    timeline.play();
}

/// Exécute la commande export
pub fn cmd_export(
    config_spec: &str,
    data_dir: Option<&Path>,
    metric: Option<&str>,
    output: &Path,
) -> Result<()> {
    let config = load_config(config_spec, data_dir)?;
    let metric = metric.unwrap_or(&config.default_metric);

    let summary = crate::export::export_years(&config, metric, output)?;

    println!(
        "Export complete: {}/{} years, {} features to {}",
        summary.years_exported,
        summary.years_exported + summary.years_failed,
        summary.features,
        output.display()
    );

    if summary.years_failed > 0 {
        warn!("{} years failed", summary.years_failed);
    }

    Ok(())
}

/// Exécute la commande legend
pub fn cmd_legend(config_spec: &str, metric: Option<&str>) -> Result<()> {
    let config = load_config(config_spec, None)?;
    let metric = metric.unwrap_or(&config.default_metric);

    let legend = LegendSpec::for_metric(config.metrics.get(metric)?);
    println!("{}", legend);

    Ok(())
}

/// Exécute la commande years
pub fn cmd_years(config_spec: &str, data_dir: Option<&Path>) -> Result<()> {
    let config = load_config(config_spec, data_dir)?;
    let source = FsSource::new(config.data.clone());
    let found = source.available_years()?;

    let expected = config.timeline()?;
    let missing = missing_years(expected.years(), &found);

    println!("Data: {}", config.data.data_dir.display());
    println!(
        "Configured: {}-{} ({} years)",
        config.timeline.first_year,
        config.timeline.last_year,
        expected.len()
    );
    println!(
        "Found: {} files{}",
        found.len(),
        match (found.first(), found.last()) {
            (Some(first), Some(last)) => format!(" ({}-{})", first, last),
            _ => String::new(),
        }
    );

    if missing.is_empty() {
        println!("All configured years are available");
    } else {
        println!(
            "Missing: {}",
            missing
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

/// Années attendues absentes de la liste trouvée (triée)
fn missing_years(expected: &[i32], found: &[i32]) -> Vec<i32> {
    expected
        .iter()
        .copied()
        .filter(|y| found.binary_search(y).is_err())
        .collect()
}
