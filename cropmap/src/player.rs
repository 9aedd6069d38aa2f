//! Boucle de lecture: minuteur, commandes et chargements en vol
//!
//! Une seule tâche possède la [`MapSession`]. Les chargements tournent en
//! parallèle dans un `FuturesUnordered`; la session écarte les réponses
//! périmées, donc une année lente peut être sautée si la cadence est plus
//! rapide que le chargement.

use std::sync::Arc;
use std::time::Duration;

use choropleth::FeatureCollection;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::loader::{DataSource, LoadError};
use crate::session::{Applied, FrameUpdate, MapSession, YearTicket};

/// Commandes de l'interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    /// Bouton unique lecture/pause
    Toggle,
    /// Position brute du curseur (ramenée dans la frise)
    Select(i64),
    Metric(String),
    Click(String),
    /// Efface la sélection courante
    ClearSelection,
    Shutdown,
}

type Load = BoxFuture<'static, (YearTicket, Result<FeatureCollection, LoadError>)>;

/// Lecteur d'une session
pub struct Player<S> {
    session: MapSession,
    source: Arc<S>,
    tick: Duration,
    stop_when_idle: bool,
}

impl<S: DataSource> Player<S> {
    pub fn new(session: MapSession, source: Arc<S>, tick: Duration) -> Self {
        Self {
            session,
            source,
            tick,
            stop_when_idle: false,
        }
    }

    /// Termine la boucle quand la lecture est arrêtée et qu'aucun
    /// chargement n'est en vol
    pub fn stop_when_idle(mut self, stop: bool) -> Self {
        self.stop_when_idle = stop;
        self
    }

    fn load(&self, ticket: YearTicket) -> Load {
        let source = Arc::clone(&self.source);
        async move {
            let result = source.load_year(ticket.year).await;
            (ticket, result)
        }
        .boxed()
    }

    /// Exécute la boucle jusqu'à `Shutdown`, la fermeture du canal de
    /// commandes, la fermeture du canal de frames, ou l'inactivité si
    /// demandée. Retourne la session pour son rapport.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        frames: mpsc::Sender<FrameUpdate>,
    ) -> MapSession {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut loads: FuturesUnordered<Load> = FuturesUnordered::new();

        let start = self.session.timeline().current_index() as i64;
        let ticket = self.session.request_year(start);
        loads.push(self.load(ticket));

        info!(
            year = self.session.timeline().current_year(),
            tick_ms = self.tick.as_millis() as u64,
            playing = self.session.timeline().is_playing(),
            "Player started"
        );

        loop {
            if self.stop_when_idle && !self.session.timeline().is_playing() && loads.is_empty() {
                debug!("Player idle, stopping");
                break;
            }

            tokio::select! {
                _ = ticker.tick(), if self.session.timeline().is_playing() => {
                    match self.session.timeline_mut().advance() {
                        Some(change) => {
                            let ticket = self.session.request_change(change);
                            loads.push(self.load(ticket));
                        }
                        None => info!(year = self.session.timeline().current_year(), "Playback reached the last year"),
                    }
                }

                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    debug!(command = ?command, "Command received");

                    match command {
                        Command::Play => {
                            if let Some(change) = self.session.timeline_mut().play() {
                                let ticket = self.session.request_change(change);
                                loads.push(self.load(ticket));
                            }
                            ticker.reset();
                        }
                        Command::Toggle => {
                            if let Some(change) = self.session.timeline_mut().toggle() {
                                let ticket = self.session.request_change(change);
                                loads.push(self.load(ticket));
                            }
                            ticker.reset();
                        }
                        Command::Pause => {
                            self.session.timeline_mut().pause();
                        }
                        Command::Select(index) => {
                            let ticket = self.session.request_year(index);
                            loads.push(self.load(ticket));
                        }
                        Command::Metric(metric) => match self.session.on_metric_changed(&metric) {
                            Ok(frame) => {
                                if frames.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(metric = %metric, error = %e, "Metric change rejected"),
                        },
                        Command::Click(id) => {
                            let frame = self.session.on_feature_clicked(&id);
                            if frames.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Command::ClearSelection => {
                            let frame = self.session.clear_selection();
                            if frames.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Command::Shutdown => break,
                    }
                }

                Some((ticket, result)) = loads.next(), if !loads.is_empty() => {
                    match self.session.apply_loaded(ticket, result) {
                        Applied::Rendered(frame) => {
                            if frames.send(frame).await.is_err() {
                                debug!("Frame receiver dropped");
                                break;
                            }
                        }
                        Applied::Stale | Applied::Failed(_) => {}
                    }
                }
            }
        }

        info!(summary = %self.session.report().summary(), "Player stopped");
        self.session
    }
}
