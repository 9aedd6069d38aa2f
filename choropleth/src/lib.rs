//! # choropleth
//!
//! Moteur d'une carte choroplèthe indexée par année: classification par
//! seuils, réconciliation par identifiant entre millésimes, frise temporelle,
//! sélection persistante et légende.
//!
//! Le moteur ne dessine rien et ne charge aucun fichier: le rendu, les
//! contrôles et le chargement sont des collaborateurs externes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use choropleth::{reconcile, MetricRegistry, RenderSet};
//!
//! let metric = registry.active("rolling_avg_production")?;
//! let mut render_set = RenderSet::new();
//!
//! let diff = reconcile(&mut render_set, &year_1980, |f| metric.classify(f));
//! println!("{}", diff.summary());
//! ```

pub mod classify;
pub mod decode;
pub mod error;
pub mod info;
pub mod legend;
pub mod reconcile;
pub mod registry;
pub mod selection;
pub mod store;
pub mod timeline;
pub mod types;

pub use classify::{Category, ClassificationConfig, ZeroPolicy};
pub use decode::{parse_collection, PropertyKeys};
pub use error::{ChoroplethError, ClassificationConfigError};
pub use info::InfoPanel;
pub use legend::{LegendItem, LegendSpec};
pub use reconcile::{reconcile, ReconciliationResult, RenderEntry, RenderSet};
pub use registry::{ActiveMetric, MetricConfig, MetricRegistry};
pub use selection::{Resolution, SelectionChange, SelectionState, ZoomRequest};
pub use store::GeoFeatureStore;
pub use timeline::{OnEnd, PlaybackState, TimelineController, YearChange};
pub use types::{Feature, FeatureCollection, FeatureId, Properties};
