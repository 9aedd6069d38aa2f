//! Session de carte: orchestre frise, chargement, réconciliation et sélection
//!
//! Chaque demande d'année reçoit un ticket numéroté. Une réponse dont le
//! ticket n'est plus le dernier émis est ignorée: seule la dernière année
//! demandée est rendue, quel que soit l'ordre d'arrivée des chargements.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use choropleth::{
    reconcile, ActiveMetric, Category, ChoroplethError, FeatureCollection, GeoFeatureStore,
    InfoPanel, LegendSpec, MetricConfig, MetricRegistry, ReconciliationResult, RenderSet,
    Resolution, SelectionState, TimelineController, YearChange, ZoomRequest,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, LayerStyle};
use crate::loader::{DataSource, LoadError};
use crate::report::SessionReport;

/// Durée des transitions de couleur (fondu d'entrée depuis le gris compris)
pub const TRANSITION: Duration = Duration::from_millis(750);

/// Demande d'année en cours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearTicket {
    pub generation: u64,
    pub index: usize,
    pub year: i32,
}

/// Instruction pour la surface de rendu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Nouvel élément: apparaît en gris transparent puis prend sa couleur
    Enter {
        id: String,
        fill: String,
        highlighted: bool,
    },
    /// Élément existant dont la catégorie a changé
    Update {
        id: String,
        fill: String,
        highlighted: bool,
    },
    /// Élément à retirer
    Exit { id: String },
    /// Changement de mise en évidence (clic)
    Highlight { id: String, highlighted: bool },
    /// Fond de carte: une feature d'une couche de limites, dessinée une fois
    Layer {
        layer: String,
        id: String,
        fill: String,
        stroke: String,
        stroke_width: u32,
    },
}

/// Tout ce que la surface de rendu doit appliquer pour une transition
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    pub year: i32,
    pub index: usize,
    pub metric: String,
    pub diff: ReconciliationResult,
    pub commands: Vec<DrawCommand>,
    pub transition: Duration,
    /// Panneau de la sélection, re-résolue pour l'année
    pub info: Option<InfoPanel>,
    /// Présente seulement si la légende a été reconstruite
    pub legend: Option<LegendSpec>,
    pub zoom: Option<ZoomRequest>,
}

impl FrameUpdate {
    pub fn summary(&self) -> String {
        format!(
            "{} [{}]: {}, {} draw commands",
            self.year,
            self.metric,
            self.diff.summary(),
            self.commands.len()
        )
    }
}

/// Résultat de l'application d'un chargement
#[derive(Debug)]
pub enum Applied {
    /// Une demande plus récente a été émise entre-temps
    Stale,
    /// Chargement en échec: rendu et sélection inchangés
    Failed(LoadError),
    Rendered(FrameUpdate),
}

impl Applied {
    pub fn frame(self) -> Option<FrameUpdate> {
        match self {
            Applied::Rendered(frame) => Some(frame),
            _ => None,
        }
    }
}

/// État complet d'une carte
pub struct MapSession {
    registry: MetricRegistry,
    metric: String,
    metric_config: MetricConfig,
    timeline: TimelineController,
    store: GeoFeatureStore,
    render_set: RenderSet,
    selection: SelectionState,
    generation: u64,
    /// Dernière année effectivement rendue
    rendered: Option<YearTicket>,
    layer_styles: BTreeMap<String, LayerStyle>,
    base_drawn: bool,
    legend_dirty: bool,
    report: SessionReport,
}

impl MapSession {
    /// Crée une session à partir des éléments du moteur
    ///
    /// # Errors
    ///
    /// [`ChoroplethError::UnknownMetric`] si `metric` n'est pas enregistrée.
    pub fn new(
        registry: MetricRegistry,
        metric: &str,
        timeline: TimelineController,
    ) -> Result<Self, ChoroplethError> {
        let metric_config = registry.get(metric)?.clone();

        Ok(Self {
            registry,
            metric: metric.to_string(),
            metric_config,
            timeline,
            store: GeoFeatureStore::new(),
            render_set: RenderSet::new(),
            selection: SelectionState::new(),
            generation: 0,
            rendered: None,
            layer_styles: BTreeMap::new(),
            base_drawn: false,
            legend_dirty: true,
            report: SessionReport::new(metric),
        })
    }

    /// Crée une session depuis la configuration (métrique par défaut)
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeline = config.timeline()?;
        let session = Self::new(config.metrics.clone(), &config.default_metric, timeline)?;
        Ok(session.with_layer_styles(config.data.layer_styles.clone()))
    }

    pub fn with_layer_styles(mut self, styles: BTreeMap<String, LayerStyle>) -> Self {
        self.layer_styles = styles;
        self
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn timeline(&self) -> &TimelineController {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut TimelineController {
        &mut self.timeline
    }

    pub fn store(&self) -> &GeoFeatureStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GeoFeatureStore {
        &mut self.store
    }

    pub fn render_set(&self) -> &RenderSet {
        &self.render_set
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Ticket de la dernière année rendue, distinct de la position de la
    /// frise quand un chargement a échoué ou est encore en vol
    pub fn rendered(&self) -> Option<YearTicket> {
        self.rendered
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    pub fn into_report(self) -> SessionReport {
        self.report
    }

    /// Légende de la métrique active
    pub fn legend(&self) -> LegendSpec {
        LegendSpec::for_metric(&self.metric_config)
    }

    /// Demande l'année d'index `index` (ramené dans la frise)
    pub fn request_year(&mut self, index: i64) -> YearTicket {
        let change = self.timeline.select_year(index);
        self.issue(change)
    }

    /// Émet un ticket pour un changement d'année déjà appliqué à la frise
    pub fn request_change(&mut self, change: YearChange) -> YearTicket {
        self.issue(change)
    }

    fn issue(&mut self, change: YearChange) -> YearTicket {
        self.generation += 1;
        let ticket = YearTicket {
            generation: self.generation,
            index: change.index,
            year: change.year,
        };
        debug!(year = ticket.year, generation = ticket.generation, "Year requested");
        ticket
    }

    /// Vrai si aucun ticket plus récent n'a été émis
    pub fn is_current(&self, ticket: &YearTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Applique le résultat d'un chargement
    pub fn apply_loaded(
        &mut self,
        ticket: YearTicket,
        result: Result<FeatureCollection, LoadError>,
    ) -> Applied {
        if !self.is_current(&ticket) {
            debug!(
                year = ticket.year,
                generation = ticket.generation,
                latest = self.generation,
                "Stale response discarded"
            );
            self.report.record_stale();
            return Applied::Stale;
        }

        let collection = match result {
            Ok(collection) => collection,
            Err(e) => {
                warn!(year = ticket.year, error = %e, "Load failed, previous frame kept");
                self.report.record_load_failure(ticket.year, &e.to_string());
                return Applied::Failed(e);
            }
        };

        if let Some(year) = collection.year().filter(|&y| y != ticket.year) {
            warn!(requested = ticket.year, found = year, "Collection year differs from request");
        }

        let collection = Arc::new(collection);
        let metric = ActiveMetric {
            name: &self.metric,
            config: &self.metric_config,
        };
        let diff = reconcile(&mut self.render_set, &collection, |f| metric.classify(f));
        let mut commands = draw_commands(&diff, &self.metric_config);
        self.store.set_current(collection);
        self.rendered = Some(ticket);

        if !self.base_drawn && self.store.layer_names().next().is_some() {
            let mut base = self.base_layer_commands();
            base.append(&mut commands);
            commands = base;
            self.base_drawn = true;
        }

        self.report.record_frame(ticket.year, &diff);
        info!(year = ticket.year, metric = %self.metric, "{}", diff.summary());

        let legend = self.take_legend();
        Applied::Rendered(FrameUpdate {
            year: ticket.year,
            index: ticket.index,
            metric: self.metric.clone(),
            diff,
            commands,
            transition: TRANSITION,
            info: self.info_panel(),
            legend,
            zoom: None,
        })
    }

    /// Sélection d'une année: demande, chargement et application
    pub async fn on_year_selected<S: DataSource>(&mut self, source: &S, index: i64) -> Applied {
        let ticket = self.request_year(index);
        let result = source.load_year(ticket.year).await;
        self.apply_loaded(ticket, result)
    }

    /// Clic sur une feature: sélection, mise en évidence et zoom
    pub fn on_feature_clicked(&mut self, id: &str) -> FrameUpdate {
        let change = self.selection.select(id, &self.store);
        self.render_set.set_highlight(Some(id));
        self.report.record_selection();

        let mut commands = Vec::new();
        if let Some(previous) = change.previous.as_deref().filter(|p| *p != id) {
            if self.render_set.contains(previous) {
                commands.push(DrawCommand::Highlight {
                    id: previous.to_string(),
                    highlighted: false,
                });
            }
        }
        if self.render_set.contains(id) {
            commands.push(DrawCommand::Highlight {
                id: id.to_string(),
                highlighted: true,
            });
        }

        info!(id = id, bounds = ?change.zoom.bounds, "Feature selected");

        let (year, index) = self.shown();
        FrameUpdate {
            year,
            index,
            metric: self.metric.clone(),
            diff: ReconciliationResult::default(),
            commands,
            transition: TRANSITION,
            info: self.info_panel(),
            legend: None,
            zoom: Some(change.zoom),
        }
    }

    /// Changement de métrique: reclassification sur place, sans rechargement
    ///
    /// # Errors
    ///
    /// [`ChoroplethError::UnknownMetric`] si la métrique n'est pas enregistrée;
    /// l'état reste alors inchangé.
    pub fn on_metric_changed(&mut self, metric: &str) -> Result<FrameUpdate, ChoroplethError> {
        self.metric_config = self.registry.get(metric)?.clone();
        self.metric = metric.to_string();
        self.legend_dirty = true;
        self.report.record_metric_switch();

        let diff = match self.store.current().map(Arc::clone) {
            Some(collection) => {
                let active = ActiveMetric {
                    name: &self.metric,
                    config: &self.metric_config,
                };
                reconcile(&mut self.render_set, &collection, |f| active.classify(f))
            }
            None => ReconciliationResult::default(),
        };

        info!(metric = metric, recolored = diff.changed_count(), "Metric changed");

        let commands = draw_commands(&diff, &self.metric_config);
        let legend = self.take_legend();
        let (year, index) = self.shown();
        Ok(FrameUpdate {
            year,
            index,
            metric: self.metric.clone(),
            diff,
            commands,
            transition: TRANSITION,
            info: self.info_panel(),
            legend,
            zoom: None,
        })
    }

    /// Efface la sélection et sa mise en évidence
    pub fn clear_selection(&mut self) -> FrameUpdate {
        let previous = self.selection.clear();
        self.render_set.set_highlight(None);

        let commands = previous
            .filter(|id| self.render_set.contains(id))
            .map(|id| DrawCommand::Highlight {
                id,
                highlighted: false,
            })
            .into_iter()
            .collect();

        debug!("Selection cleared");

        let (year, index) = self.shown();
        FrameUpdate {
            year,
            index,
            metric: self.metric.clone(),
            diff: ReconciliationResult::default(),
            commands,
            transition: TRANSITION,
            info: None,
            legend: None,
            zoom: None,
        }
    }

    /// Commandes du fond de carte, couche par couche
    pub fn base_layer_commands(&self) -> Vec<DrawCommand> {
        let neutral = LayerStyle::default();
        let mut commands = Vec::new();
        for name in self.store.layer_names() {
            let Some(layer) = self.store.layer(name) else {
                continue;
            };
            let style = self.layer_styles.get(name).unwrap_or(&neutral);
            commands.extend(layer.iter().map(|feature| DrawCommand::Layer {
                layer: name.to_string(),
                id: feature.id.clone(),
                fill: style.fill.clone(),
                stroke: style.stroke.clone(),
                stroke_width: style.stroke_width,
            }));
        }
        commands
    }

    /// Année à l'écran, ou position de la frise avant le premier rendu
    fn shown(&self) -> (i32, usize) {
        match self.rendered {
            Some(ticket) => (ticket.year, ticket.index),
            None => (self.timeline.current_year(), self.timeline.current_index()),
        }
    }

    /// Panneau de la sélection pour la collection courante
    pub fn info_panel(&self) -> Option<InfoPanel> {
        let selected = self.selection.selected()?;

        match self.store.current() {
            Some(collection) => match self.selection.resolve(collection) {
                Resolution::Resolved(feature) => Some(InfoPanel::for_feature(
                    feature,
                    &self.metric,
                    &self.metric_config,
                )),
                Resolution::Unavailable(id) => Some(InfoPanel::unavailable(
                    id,
                    collection.year().or(Some(self.shown().0)),
                )),
                Resolution::Unselected => None,
            },
            None => Some(InfoPanel::unavailable(selected, None)),
        }
    }

    fn take_legend(&mut self) -> Option<LegendSpec> {
        if !self.legend_dirty {
            return None;
        }
        self.legend_dirty = false;
        Some(self.legend())
    }
}

/// Commandes de dessin d'un diff: les mises à jour sans changement de
/// catégorie ne produisent rien
pub fn draw_commands(diff: &ReconciliationResult, metric: &MetricConfig) -> Vec<DrawCommand> {
    let fill = |category: Category| metric.classification.color(category).to_string();

    let entering = diff.entering.iter().map(|e| DrawCommand::Enter {
        id: e.id.clone(),
        fill: fill(e.category),
        highlighted: e.highlighted,
    });
    let updating = diff
        .updating
        .iter()
        .filter(|u| u.changed())
        .map(|u| DrawCommand::Update {
            id: u.id.clone(),
            fill: fill(u.category),
            highlighted: u.highlighted,
        });
    let exiting = diff
        .exiting
        .iter()
        .map(|e| DrawCommand::Exit { id: e.id.clone() });

    entering.chain(updating).chain(exiting).collect()
}
