//! Rapport de session de lecture
//!
//! Collecte les frames rendues, les réponses périmées et les échecs de
//! chargement, puis les affiche ou les sauvegarde en JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use choropleth::ReconciliationResult;
use serde::Serialize;

/// Statut global de la session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Toutes les années demandées ont été rendues
    Success,
    /// Des années ont été rendues, d'autres ont échoué
    PartialSuccess,
    /// Aucune année rendue
    Failed,
}

/// Échec de chargement d'une année
#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    pub year: i32,
    pub message: String,
}

/// Statistiques d'une année rendue
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameStats {
    pub frames: usize,
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
    /// Features affichées en "pas de donnée" à la dernière frame
    pub no_data: usize,
}

/// Rapport complet de session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Métrique affichée au démarrage
    pub metric: String,
    pub duration_secs: f64,
    pub status: SessionStatus,

    pub frames_rendered: usize,
    pub features_entered: usize,
    /// Features présentes deux années de suite
    pub features_updated: usize,
    /// Dont la catégorie a changé
    pub features_recolored: usize,
    pub features_exited: usize,
    /// Réponses arrivées après une demande plus récente
    pub stale_discarded: usize,
    pub metric_switches: usize,
    pub selections: usize,

    pub by_year: BTreeMap<i32, FrameStats>,
    pub failures: Vec<LoadFailure>,
}

impl Default for SessionReport {
    fn default() -> Self {
        Self {
            metric: String::new(),
            duration_secs: 0.0,
            status: SessionStatus::Success,
            frames_rendered: 0,
            features_entered: 0,
            features_updated: 0,
            features_recolored: 0,
            features_exited: 0,
            stale_discarded: 0,
            metric_switches: 0,
            selections: 0,
            by_year: BTreeMap::new(),
            failures: Vec::new(),
        }
    }
}

impl SessionReport {
    pub fn new(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            ..Default::default()
        }
    }

    /// Enregistre une frame rendue
    pub fn record_frame(&mut self, year: i32, diff: &ReconciliationResult) {
        let recolored = diff.updating.iter().filter(|u| u.changed()).count();
        let no_data = diff
            .entering
            .iter()
            .map(|e| e.category)
            .chain(diff.updating.iter().map(|u| u.category))
            .filter(|c| c.is_no_data())
            .count();

        self.frames_rendered += 1;
        self.features_entered += diff.entering.len();
        self.features_updated += diff.updating.len();
        self.features_recolored += recolored;
        self.features_exited += diff.exiting.len();

        let stats = self.by_year.entry(year).or_default();
        stats.frames += 1;
        stats.entered += diff.entering.len();
        stats.updated += diff.updating.len();
        stats.exited += diff.exiting.len();
        stats.no_data = no_data;
    }

    pub fn record_stale(&mut self) {
        self.stale_discarded += 1;
    }

    pub fn record_load_failure(&mut self, year: i32, message: &str) {
        self.failures.push(LoadFailure {
            year,
            message: message.to_string(),
        });
    }

    pub fn record_metric_switch(&mut self) {
        self.metric_switches += 1;
    }

    pub fn record_selection(&mut self) {
        self.selections += 1;
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_failures = !self.failures.is_empty();
        let has_frames = self.frames_rendered > 0;

        self.status = match (has_frames, has_failures) {
            (true, false) => SessionStatus::Success,
            (true, true) => SessionStatus::PartialSuccess,
            (false, true) => SessionStatus::Failed,
            (false, false) => SessionStatus::Success,
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SESSION REPORT - {}", self.metric);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Frames: {} rendered, {} stale discarded, {} load failures",
            self.frames_rendered,
            self.stale_discarded,
            self.failures.len()
        );
        println!(
            "Features: {} entered, {} updated ({} recolored), {} exited",
            self.features_entered,
            self.features_updated,
            self.features_recolored,
            self.features_exited
        );
        println!(
            "Interactions: {} metric switches, {} selections",
            self.metric_switches, self.selections
        );

        if !self.by_year.is_empty() {
            println!("\n--- BY YEAR ---");
            for (year, stats) in &self.by_year {
                println!(
                    "  {}: {} entered, {} updated, {} exited, {} no data",
                    year, stats.entered, stats.updated, stats.exited, stats.no_data
                );
            }
        }

        if !self.failures.is_empty() {
            println!("\n--- LOAD FAILURES ({}) ---", self.failures.len());
            for f in self.failures.iter().take(20) {
                println!("  [{}] {}", f.year, f.message);
            }
            if self.failures.len() > 20 {
                println!("  ... and {} more", self.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} frames, {} entered, {} exited, {} stale, {} failures",
            self.metric,
            self.frames_rendered,
            self.features_entered,
            self.features_exited,
            self.stale_discarded,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choropleth::reconcile::{Entering, Exiting, Updating};
    use choropleth::Category;

    fn diff() -> ReconciliationResult {
        ReconciliationResult {
            entering: vec![Entering {
                id: "A".into(),
                category: Category::NoData,
                highlighted: false,
            }],
            updating: vec![
                Updating {
                    id: "B".into(),
                    previous: Category::Bucket(1),
                    category: Category::Bucket(2),
                    highlighted: false,
                },
                Updating {
                    id: "C".into(),
                    previous: Category::Bucket(1),
                    category: Category::Bucket(1),
                    highlighted: true,
                },
            ],
            exiting: vec![Exiting {
                id: "D".into(),
                category: Category::Bucket(0),
            }],
        }
    }

    #[test]
    fn test_session_report_default() {
        let report = SessionReport::default();
        assert_eq!(report.status, SessionStatus::Success);
        assert_eq!(report.frames_rendered, 0);
    }

    #[test]
    fn test_record_frame() {
        let mut report = SessionReport::new("rolling_yield");
        report.record_frame(1980, &diff());

        assert_eq!(report.frames_rendered, 1);
        assert_eq!(report.features_entered, 1);
        assert_eq!(report.features_updated, 2);
        assert_eq!(report.features_recolored, 1);
        assert_eq!(report.features_exited, 1);

        let stats = report.by_year.get(&1980).unwrap();
        assert_eq!(stats.no_data, 1);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = SessionReport::new("rolling_yield");
        report.record_frame(1980, &diff());
        report.record_load_failure(1981, "I/O error");
        report.finalize();

        assert_eq!(report.status, SessionStatus::PartialSuccess);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = SessionReport::new("rolling_yield");
        report.record_load_failure(1980, "I/O error");
        report.finalize();

        assert_eq!(report.status, SessionStatus::Failed);
    }

    #[test]
    fn test_summary() {
        let mut report = SessionReport::new("ann_avg_temp");
        report.record_frame(1990, &diff());
        report.record_stale();

        let summary = report.summary();
        assert!(summary.contains("ann_avg_temp"));
        assert!(summary.contains("1 frames"));
        assert!(summary.contains("1 stale"));
    }

    #[test]
    fn test_save_to_file() {
        let mut report = SessionReport::new("ann_avg_precip");
        report.record_frame(2000, &diff());
        report.finalize();

        let path = std::env::temp_dir().join("cropmap_test_report.json");
        report.save_to_file(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["status"], "Success");
        assert_eq!(json["by_year"]["2000"]["entered"], 1);

        std::fs::remove_file(&path).ok();
    }
}
