//! Stockage des collections chargées
//!
//! Couches de limites statiques (États, comtés), chargées une fois au
//! démarrage, et collection thématique de l'année courante.

use std::collections::BTreeMap;
use std::sync::Arc;

use geo::{BoundingRect, Rect};

use crate::types::{Feature, FeatureCollection};

/// Collections de features indexées par identifiant
#[derive(Debug, Default)]
pub struct GeoFeatureStore {
    layers: BTreeMap<String, Arc<FeatureCollection>>,
    current: Option<Arc<FeatureCollection>>,
}

impl GeoFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une couche de limites (ex: "states", "counties")
    pub fn insert_layer(&mut self, name: impl Into<String>, collection: FeatureCollection) {
        self.layers.insert(name.into(), Arc::new(collection));
    }

    pub fn layer(&self, name: &str) -> Option<&FeatureCollection> {
        self.layers.get(name).map(Arc::as_ref)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Remplace la collection de l'année courante, retourne la précédente
    pub fn set_current(
        &mut self,
        collection: Arc<FeatureCollection>,
    ) -> Option<Arc<FeatureCollection>> {
        self.current.replace(collection)
    }

    pub fn current(&self) -> Option<&Arc<FeatureCollection>> {
        self.current.as_ref()
    }

    /// Recherche une feature: année courante d'abord, puis couches de limites
    pub fn find(&self, id: &str) -> Option<&Feature> {
        self.collections().find_map(|c| c.get(id))
    }

    /// Emprise d'une feature pour une demande de zoom
    ///
    /// Prend la première géométrie disponible: une feature sans géométrie
    /// dans le millésime courant est cherchée dans les couches de limites.
    pub fn bounds_of(&self, id: &str) -> Option<Rect<f64>> {
        self.collections()
            .filter_map(|c| c.get(id))
            .find_map(|f| f.geometry.as_ref()?.bounding_rect())
    }

    fn collections(&self) -> impl Iterator<Item = &FeatureCollection> {
        self.current
            .iter()
            .chain(self.layers.values())
            .map(Arc::as_ref)
    }
}
