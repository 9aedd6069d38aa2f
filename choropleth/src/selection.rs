//! Sélection d'une feature à travers les années
//!
//! La sélection est un identifiant, jamais une référence: les features sont
//! remplacées à chaque millésime et doivent être résolues à nouveau. Une
//! feature absente d'une année ne vide pas la sélection.

use geo::Rect;
use tracing::debug;

use crate::store::GeoFeatureStore;
use crate::types::{Feature, FeatureCollection, FeatureId};

/// Demande de zoom transmise au collaborateur de projection
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomRequest {
    pub id: FeatureId,
    /// Emprise de la géométrie, `None` si aucune géométrie n'est connue
    pub bounds: Option<Rect<f64>>,
}

/// Notification de changement de sélection
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange {
    pub id: FeatureId,
    pub previous: Option<FeatureId>,
    pub zoom: ZoomRequest,
}

/// Résolution de la sélection dans une collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// Rien n'est sélectionné
    Unselected,
    /// Feature trouvée dans la collection
    Resolved(&'a Feature),
    /// Sélection conservée mais sans donnée pour cette année
    Unavailable(&'a str),
}

impl<'a> Resolution<'a> {
    pub fn feature(self) -> Option<&'a Feature> {
        match self {
            Resolution::Resolved(f) => Some(f),
            _ => None,
        }
    }
}

/// Sélection courante
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: Option<FeatureId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    /// Sélectionne une feature et prépare la demande de zoom
    pub fn select(&mut self, id: impl Into<FeatureId>, store: &GeoFeatureStore) -> SelectionChange {
        let id = id.into();
        let bounds = store.bounds_of(&id);
        let previous = self.selected.replace(id.clone());

        debug!(id = %id, previous = ?previous, has_bounds = bounds.is_some(), "Feature selected");

        SelectionChange {
            zoom: ZoomRequest {
                id: id.clone(),
                bounds,
            },
            id,
            previous,
        }
    }

    /// Résout la sélection dans une nouvelle collection
    pub fn resolve<'a>(&'a self, collection: &'a FeatureCollection) -> Resolution<'a> {
        match self.selected.as_deref() {
            None => Resolution::Unselected,
            Some(id) => match collection.get(id) {
                Some(feature) => Resolution::Resolved(feature),
                None => Resolution::Unavailable(id),
            },
        }
    }

    /// Vide la sélection, retourne l'identifiant précédent
    pub fn clear(&mut self) -> Option<FeatureId> {
        self.selected.take()
    }
}
