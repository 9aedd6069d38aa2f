//! Types de données pour le crate choropleth

use std::collections::HashMap;

use geo::Geometry;
use tracing::warn;

/// Identifiant stable d'une feature (code FIPS pour les comtés)
///
/// C'est la clé de jointure entre les années: deux features de deux
/// millésimes différents portant le même identifiant désignent la même
/// entité géographique.
pub type FeatureId = String;

/// Propriétés d'une feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// Métriques numériques (clé -> valeur, `None` si absente pour l'année)
    pub metrics: HashMap<String, Option<f64>>,

    /// Nom de l'entité (ex: nom du comté)
    pub name: Option<String>,

    /// Nom de l'entité parente (ex: nom de l'État)
    pub region: Option<String>,

    /// Année du millésime
    pub year: Option<i32>,

    /// Autres attributs textuels
    pub attributes: HashMap<String, String>,
}

impl Properties {
    /// Valeur d'une métrique, `None` si absente ou nulle
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

/// Une entité géographique (comté ou État)
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifiant unique dans un jeu de limites
    pub id: FeatureId,

    /// Géométrie, opaque pour le moteur (seule son emprise est calculée)
    pub geometry: Option<Geometry>,

    /// Métriques et champs descriptifs
    pub properties: Properties,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>) -> Self {
        Self {
            id: id.into(),
            geometry: None,
            properties: Properties::default(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.properties.metrics.insert(name.into(), value);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>, region: Option<&str>) -> Self {
        self.properties.name = Some(name.into());
        self.properties.region = region.map(str::to_string);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.properties.year = Some(year);
        self
    }

    /// Valeur d'une métrique
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.properties.metric(name)
    }
}

/// Collection ordonnée de features pour un millésime
///
/// Immuable une fois construite. Un index par identifiant est maintenu pour
/// la réconciliation et la résolution de la sélection.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    year: Option<i32>,
    features: Vec<Feature>,
    index: HashMap<FeatureId, usize>,
}

impl FeatureCollection {
    /// Construit une collection
    ///
    /// Les identifiants doivent être uniques: en cas de doublon, la première
    /// occurrence est conservée et les suivantes sont ignorées.
    pub fn new(year: Option<i32>, features: Vec<Feature>) -> Self {
        let mut kept = Vec::with_capacity(features.len());
        let mut index = HashMap::with_capacity(features.len());
        let mut duplicates = 0usize;

        for feature in features {
            if index.contains_key(&feature.id) {
                duplicates += 1;
                continue;
            }
            index.insert(feature.id.clone(), kept.len());
            kept.push(feature);
        }

        if duplicates > 0 {
            warn!(
                year = ?year,
                duplicates = duplicates,
                "Duplicate feature ids dropped (first occurrence kept)"
            );
        }

        Self {
            year,
            features: kept,
            index,
        }
    }

    /// Année du millésime, si connue
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Recherche une feature par identifiant
    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).map(|&i| &self.features[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiants dans l'ordre de la collection
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
