//! # cropmap
//!
//! Carte choroplèthe des comtés américains, année par année: production et
//! rendement du maïs, température, précipitations, percentiles et évolution
//! depuis 1980.
//!
//! ## Features
//!
//! - Presets embarqués (`corn`, `climate`) ou configuration JSON
//! - Chargement asynchrone des fichiers annuels avec délai maximal
//! - Lecture de la frise avec suppression des réponses périmées
//! - Export GeoJSON stylé en parallèle
//! - Rapport de session JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Lecture 1980 -> 2023, arrêt sur la dernière année
//! cropmap play --config corn --on-end stop --select 17001 --report session.json
//!
//! # Export GeoJSON stylé d'une métrique
//! cropmap export --config climate --metric ann_avg_temp --output ./styled/
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod loader;
pub mod player;
pub mod report;
pub mod session;

pub use config::{Config, LayerStyle};
pub use loader::{DataSource, FsSource, LoadError};
pub use player::{Command, Player};
pub use report::{SessionReport, SessionStatus};
pub use session::{Applied, DrawCommand, FrameUpdate, MapSession, YearTicket};
