//! Frise temporelle et lecture automatique
//!
//! Machine à états `Stopped` / `Playing` sur une suite ordonnée d'années.
//! Le minuteur périodique est externe: il appelle [`TimelineController::advance`]
//! à chaque tick tant que l'état est `Playing`.
//!
//! Les index hors bornes ne sont jamais une erreur: ils sont ramenés dans
//! `[0, len)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChoroplethError;

/// Comportement en fin de lecture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnEnd {
    /// Reprendre à la première année
    #[default]
    Loop,
    /// S'arrêter sur la dernière année
    Stop,
}

impl std::str::FromStr for OnEnd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loop" => Ok(OnEnd::Loop),
            "stop" => Ok(OnEnd::Stop),
            _ => Err(format!("Invalid end policy: {}. Use: loop, stop", s)),
        }
    }
}

/// État de lecture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Changement d'année à transmettre au chargeur de données
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearChange {
    pub index: usize,
    pub year: i32,
}

/// Contrôleur de la frise temporelle
#[derive(Debug, Clone)]
pub struct TimelineController {
    years: Vec<i32>,
    index: usize,
    state: PlaybackState,
    on_end: OnEnd,
}

impl TimelineController {
    /// Crée une frise à partir d'une liste d'années (triée et dédoublonnée)
    ///
    /// # Errors
    ///
    /// [`ChoroplethError::EmptyTimeline`] si la liste est vide.
    pub fn new(mut years: Vec<i32>, on_end: OnEnd) -> Result<Self, ChoroplethError> {
        years.sort_unstable();
        years.dedup();

        if years.is_empty() {
            return Err(ChoroplethError::EmptyTimeline);
        }

        Ok(Self {
            years,
            index: 0,
            state: PlaybackState::Stopped,
            on_end,
        })
    }

    /// Crée une frise sur une plage d'années contiguës (bornes incluses)
    pub fn from_range(first: i32, last: i32, on_end: OnEnd) -> Result<Self, ChoroplethError> {
        Self::new((first..=last).collect(), on_end)
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Toujours faux: une frise contient au moins une année
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_year(&self) -> i32 {
        self.years[self.index]
    }

    pub fn current(&self) -> YearChange {
        YearChange {
            index: self.index,
            year: self.current_year(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn on_end(&self) -> OnEnd {
        self.on_end
    }

    pub fn set_on_end(&mut self, on_end: OnEnd) {
        self.on_end = on_end;
    }

    fn last_index(&self) -> usize {
        self.years.len() - 1
    }

    /// Sélectionne une année par index (valeur brute du curseur)
    ///
    /// Un index hors bornes est ramené dans `[0, len)`.
    pub fn select_year(&mut self, index: i64) -> YearChange {
        let clamped = index.clamp(0, self.last_index() as i64) as usize;
        if clamped as i64 != index {
            debug!(requested = index, clamped = clamped, "Timeline index clamped");
        }
        self.index = clamped;
        self.current()
    }

    /// Sélectionne une année par valeur, ramenée à la plage de la frise
    pub fn select_by_year(&mut self, year: i32) -> YearChange {
        let index = match self.years.binary_search(&year) {
            Ok(i) => i,
            Err(i) => i.min(self.last_index()),
        };
        self.index = index;
        self.current()
    }

    /// Démarre la lecture
    ///
    /// Retourne un changement d'année si la lecture repart du début: c'est
    /// le cas lorsqu'elle s'était arrêtée sur la dernière année avec la
    /// politique `Stop`.
    pub fn play(&mut self) -> Option<YearChange> {
        if self.is_playing() {
            return None;
        }
        self.state = PlaybackState::Playing;

        if self.on_end == OnEnd::Stop && self.index == self.last_index() && self.len() > 1 {
            self.index = 0;
            return Some(self.current());
        }
        None
    }

    /// Met la lecture en pause
    ///
    /// Retourne `true` si l'état a changé.
    pub fn pause(&mut self) -> bool {
        let was_playing = self.is_playing();
        self.state = PlaybackState::Stopped;
        was_playing
    }

    /// Bascule lecture/pause (bouton unique)
    pub fn toggle(&mut self) -> Option<YearChange> {
        if self.is_playing() {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    /// Avance d'une année (tick du minuteur)
    ///
    /// En fin de frise: retour à l'index 0 avec `Loop`; avec `Stop`, l'index
    /// reste sur la dernière année, l'état passe à `Stopped` et `None` est
    /// retourné.
    pub fn advance(&mut self) -> Option<YearChange> {
        if self.index < self.last_index() {
            self.index += 1;
            return Some(self.current());
        }

        match self.on_end {
            OnEnd::Loop => {
                self.index = 0;
                Some(self.current())
            }
            OnEnd::Stop => {
                self.state = PlaybackState::Stopped;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_timeline_rejected() {
        assert!(matches!(
            TimelineController::new(vec![], OnEnd::Loop),
            Err(ChoroplethError::EmptyTimeline)
        ));
        assert!(TimelineController::from_range(2023, 1980, OnEnd::Loop).is_err());
    }

    #[test]
    fn test_select_year_clamps() {
        let mut timeline = TimelineController::from_range(1980, 2023, OnEnd::Loop).unwrap();

        assert_eq!(timeline.select_year(-3), YearChange { index: 0, year: 1980 });
        assert_eq!(timeline.select_year(10), YearChange { index: 10, year: 1990 });
        assert_eq!(timeline.select_year(500), YearChange { index: 43, year: 2023 });
        assert_eq!(timeline.select_year(i64::MIN).index, 0);
        assert_eq!(timeline.select_year(i64::MAX).index, 43);
    }

    #[test]
    fn test_select_by_year_clamps() {
        let mut timeline = TimelineController::from_range(1980, 2023, OnEnd::Loop).unwrap();

        assert_eq!(timeline.select_by_year(2000).index, 20);
        assert_eq!(timeline.select_by_year(1950).year, 1980);
        assert_eq!(timeline.select_by_year(2100).year, 2023);
    }

    #[test]
    fn test_advance_loops() {
        let mut timeline = TimelineController::from_range(1980, 1982, OnEnd::Loop).unwrap();
        timeline.play();

        assert_eq!(timeline.advance().map(|c| c.year), Some(1981));
        assert_eq!(timeline.advance().map(|c| c.year), Some(1982));
        assert_eq!(timeline.advance().map(|c| c.index), Some(0));
        assert!(timeline.is_playing());
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut timeline = TimelineController::from_range(1980, 1982, OnEnd::Stop).unwrap();
        timeline.play();
        timeline.select_year(2);

        assert_eq!(timeline.advance(), None);
        assert_eq!(timeline.current_index(), 2);
        assert_eq!(timeline.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_advance_runs_to_last_year() {
        let mut timeline = TimelineController::from_range(1980, 1983, OnEnd::Stop).unwrap();
        timeline.play();

        let mut years = Vec::new();
        while let Some(change) = timeline.advance() {
            years.push(change.year);
        }

        assert_eq!(years, vec![1981, 1982, 1983]);
        assert_eq!(timeline.current_year(), 1983);
        assert!(!timeline.is_playing());
        assert_eq!(timeline.advance(), None);
        assert_eq!(timeline.current_index(), 3);
    }

    #[test]
    fn test_play_after_stop_rewinds() {
        let mut timeline = TimelineController::from_range(1980, 1982, OnEnd::Stop).unwrap();
        timeline.select_year(2);

        assert_eq!(timeline.play(), Some(YearChange { index: 0, year: 1980 }));
        assert!(timeline.is_playing());
        assert_eq!(timeline.play(), None);
    }

    #[test]
    fn test_toggle() {
        let mut timeline = TimelineController::from_range(1980, 1990, OnEnd::Loop).unwrap();

        assert_eq!(timeline.toggle(), None);
        assert!(timeline.is_playing());
        timeline.toggle();
        assert_eq!(timeline.state(), PlaybackState::Stopped);
        assert!(!timeline.pause());
    }

    #[test]
    fn test_on_end_from_str() {
        assert_eq!("loop".parse::<OnEnd>().unwrap(), OnEnd::Loop);
        assert_eq!("STOP".parse::<OnEnd>().unwrap(), OnEnd::Stop);
        assert!("rewind".parse::<OnEnd>().is_err());
    }
}
