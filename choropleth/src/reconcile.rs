//! Réconciliation des features rendues avec un nouveau millésime
//!
//! Diff par identité (et non par position) entre l'ensemble des éléments
//! visuels matérialisés ([`RenderSet`]) et la collection de l'année
//! sélectionnée:
//! - `entering`: nouvelles features, à créer (invisibles puis fondu)
//! - `updating`: features présentes des deux côtés, catégorie recalculée
//! - `exiting`: features disparues, à retirer après transition
//!
//! Un réordonnancement des features entre deux années ne produit jamais de
//! paire création/suppression.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::classify::Category;
use crate::types::{Feature, FeatureCollection, FeatureId};

/// État connu d'un élément visuel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderEntry {
    /// Dernière catégorie appliquée
    pub category: Category,
    /// Mise en évidence (sélection)
    pub highlighted: bool,
}

/// Éléments visuels actuellement matérialisés, par identifiant
///
/// Structure persistante de la session: mise à jour en place à chaque
/// réconciliation, jamais remplacée.
#[derive(Debug, Default)]
pub struct RenderSet {
    entries: HashMap<FeatureId, RenderEntry>,
    highlight: Option<FeatureId>,
}

impl RenderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RenderEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Identifiants rendus, triés
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cible de la mise en évidence, même si elle n'est pas rendue
    pub fn highlighted(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    /// Déplace la mise en évidence
    ///
    /// La cible est conservée même si elle n'est pas rendue: elle sera mise
    /// en évidence dès qu'elle réapparaît dans un millésime.
    pub fn set_highlight(&mut self, id: Option<&str>) {
        if let Some(previous) = self.highlight.take() {
            if let Some(entry) = self.entries.get_mut(&previous) {
                entry.highlighted = false;
            }
        }

        if let Some(id) = id {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.highlighted = true;
            }
            self.highlight = Some(id.to_string());
        }
    }
}

/// Feature à créer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entering {
    pub id: FeatureId,
    pub category: Category,
    pub highlighted: bool,
}

/// Feature conservée, catégorie recalculée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updating {
    pub id: FeatureId,
    pub previous: Category,
    pub category: Category,
    pub highlighted: bool,
}

impl Updating {
    /// Le remplissage doit-il être animé vers une nouvelle couleur
    pub fn changed(&self) -> bool {
        self.previous != self.category
    }
}

/// Feature à retirer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exiting {
    pub id: FeatureId,
    pub category: Category,
}

/// Résultat d'une réconciliation
///
/// Les trois ensembles sont disjoints. `entering` et `updating` suivent
/// l'ordre de la collection entrante, `exiting` est trié par identifiant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub entering: Vec<Entering>,
    pub updating: Vec<Updating>,
    pub exiting: Vec<Exiting>,
}

impl ReconciliationResult {
    /// Nombre de features dont la couleur change
    pub fn changed_count(&self) -> usize {
        self.updating.iter().filter(|u| u.changed()).count()
    }

    /// Aucun ajout ni retrait
    pub fn is_stable(&self) -> bool {
        self.entering.is_empty() && self.exiting.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} entering, {} updating ({} changed), {} exiting",
            self.entering.len(),
            self.updating.len(),
            self.changed_count(),
            self.exiting.len()
        )
    }
}

/// Réconcilie le `RenderSet` avec une nouvelle collection
///
/// Après l'appel, les clés du `RenderSet` sont exactement les identifiants
/// de `incoming`. L'appel ne contient aucun point de suspension: aucun état
/// intermédiaire n'est observable.
pub fn reconcile<F>(
    render_set: &mut RenderSet,
    incoming: &FeatureCollection,
    classify: F,
) -> ReconciliationResult
where
    F: Fn(&Feature) -> Category,
{
    let mut result = ReconciliationResult::default();

    let mut exiting: Vec<Exiting> = render_set
        .entries
        .iter()
        .filter(|(id, _)| !incoming.contains(id))
        .map(|(id, entry)| Exiting {
            id: id.clone(),
            category: entry.category,
        })
        .collect();
    exiting.sort_by(|a, b| a.id.cmp(&b.id));

    for gone in &exiting {
        render_set.entries.remove(&gone.id);
    }
    result.exiting = exiting;

    for feature in incoming {
        let category = classify(feature);

        match render_set.entries.get_mut(&feature.id) {
            Some(entry) => {
                let previous = entry.category;
                entry.category = category;
                result.updating.push(Updating {
                    id: feature.id.clone(),
                    previous,
                    category,
                    highlighted: entry.highlighted,
                });
            }
            None => {
                let highlighted = render_set.highlight.as_deref() == Some(feature.id.as_str());
                render_set.entries.insert(
                    feature.id.clone(),
                    RenderEntry {
                        category,
                        highlighted,
                    },
                );
                trace!(id = %feature.id, ?category, "Feature entering");
                result.entering.push(Entering {
                    id: feature.id.clone(),
                    category,
                    highlighted,
                });
            }
        }
    }

    debug!(
        year = ?incoming.year(),
        entering = result.entering.len(),
        updating = result.updating.len(),
        changed = result.changed_count(),
        exiting = result.exiting.len(),
        "Reconciled render set"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(ids: &[&str], value: f64) -> FeatureCollection {
        FeatureCollection::new(
            None,
            ids.iter()
                .map(|id| Feature::new(*id).with_metric("v", Some(value)))
                .collect(),
        )
    }

    fn by_value(feature: &Feature) -> Category {
        match feature.metric("v") {
            Some(v) if v >= 10.0 => Category::Bucket(1),
            Some(_) => Category::Bucket(0),
            None => Category::NoData,
        }
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        let mut out: Vec<String> = items.iter().map(|i| id(i).to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn test_enter_update_exit() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["A", "B", "C"], 1.0), by_value);

        let result = reconcile(&mut render_set, &collection(&["B", "C", "D"], 1.0), by_value);

        assert_eq!(ids(&result.entering, |e| e.id.as_str()), vec!["D"]);
        assert_eq!(ids(&result.updating, |u| u.id.as_str()), vec!["B", "C"]);
        assert_eq!(ids(&result.exiting, |e| e.id.as_str()), vec!["A"]);
        assert_eq!(render_set.ids(), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_reorder_is_not_churn() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["A", "B", "C"], 1.0), by_value);

        let result = reconcile(&mut render_set, &collection(&["C", "A", "B"], 1.0), by_value);

        assert!(result.is_stable());
        assert_eq!(result.updating.len(), 3);
        assert_eq!(result.changed_count(), 0);
    }

    #[test]
    fn test_category_change_is_reported() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["A"], 1.0), by_value);

        let result = reconcile(&mut render_set, &collection(&["A"], 50.0), by_value);

        assert_eq!(result.changed_count(), 1);
        assert_eq!(result.updating[0].previous, Category::Bucket(0));
        assert_eq!(result.updating[0].category, Category::Bucket(1));
        assert_eq!(render_set.get("A").unwrap().category, Category::Bucket(1));
    }

    #[test]
    fn test_highlight_survives_gap() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["A", "B"], 1.0), by_value);
        render_set.set_highlight(Some("A"));
        assert!(render_set.get("A").unwrap().highlighted);

        let result = reconcile(&mut render_set, &collection(&["B"], 1.0), by_value);
        assert_eq!(ids(&result.exiting, |e| e.id.as_str()), vec!["A"]);
        assert_eq!(render_set.highlighted(), Some("A"));

        let result = reconcile(&mut render_set, &collection(&["A", "B"], 1.0), by_value);
        assert_eq!(result.entering.len(), 1);
        assert!(result.entering[0].highlighted);
        assert!(render_set.get("A").unwrap().highlighted);
        assert!(!render_set.get("B").unwrap().highlighted);
    }

    #[test]
    fn test_moving_highlight_clears_previous() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["A", "B"], 1.0), by_value);

        render_set.set_highlight(Some("A"));
        render_set.set_highlight(Some("B"));
        assert!(!render_set.get("A").unwrap().highlighted);
        assert!(render_set.get("B").unwrap().highlighted);

        render_set.set_highlight(None);
        assert!(!render_set.get("B").unwrap().highlighted);
        assert_eq!(render_set.highlighted(), None);
    }

    #[test]
    fn test_empty_incoming_exits_everything() {
        let mut render_set = RenderSet::new();
        reconcile(&mut render_set, &collection(&["B", "A"], 1.0), by_value);

        let result = reconcile(&mut render_set, &FeatureCollection::default(), by_value);

        assert_eq!(ids(&result.exiting, |e| e.id.as_str()), vec!["A", "B"]);
        assert!(render_set.is_empty());
    }
}
