use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{
    broadcast,
    mpsc::{self, WeakSender},
    oneshot,
};
use tracing::{debug, warn};

use crate::{
    core::{
        document::ExportDocument,
        store::{Scorebook, Stats, StoreError},
    },
    engine::scoring::{ShooterScore, TeamStanding},
    logo::LogoCompressor,
    model::{ResultEntry, Shooter, Team},
    settings::{LabelLayout, Settings},
    types::{CompetitionType, Discipline, ResultId, ShooterId, TeamId},
};

use super::events::ScorebookEvent;

/// Failure of a handle call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The store rejected the command.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The scorebook task has stopped.
    #[error("Scorebook wurde beendet")]
    ChannelClosed,
}

/// Runtime tuning knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Pending commands before callers wait.
    pub command_queue_bound: usize,
    /// Events buffered per subscriber.
    pub event_capacity: usize,
    /// Re-encode an uploaded logo in the background right after saving it.
    pub compress_logo_on_upload: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
            compress_logo_on_upload: true,
        }
    }
}

/// Rankings under the competition type active when they were computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standings {
    /// Regime the rankings were computed under.
    pub competition_type: CompetitionType,
    /// Visible teams, best first.
    pub teams: Vec<TeamStanding>,
    /// Visible standalone shooters, best first.
    pub standalone: Vec<ShooterScore>,
}

/// Cloneable handle to the single task that owns the [`Scorebook`].
#[derive(Clone)]
pub struct ScorebookHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<ScorebookEvent>,
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum Command {
    AddTeam { team: Team, resp: Reply<TeamId> },
    UpdateTeam { team: Team, resp: Reply<bool> },
    DeleteTeam { id: TeamId, resp: Reply<bool> },
    AddShooter { shooter: Shooter, resp: Reply<ShooterId> },
    UpdateShooter { shooter: Shooter, resp: Reply<bool> },
    DeleteShooter { id: ShooterId, resp: Reply<bool> },
    SaveResult { entry: ResultEntry, resp: Reply<ResultId> },
    DeleteResult { id: ResultId, resp: Reply<bool> },
    DeleteResultsForShooter { shooter_id: ShooterId, resp: Reply<usize> },
    SelectDiscipline { discipline: Discipline, resp: Reply<()> },
    SetCompetitionType { competition: CompetitionType, resp: Reply<()> },
    AddDiscipline { name: String, resp: Reply<usize> },
    UpdateDiscipline { index: usize, name: String, resp: Reply<bool> },
    DeleteDiscipline { index: usize, resp: Reply<bool> },
    SetTeamFilter { ids: Option<Vec<String>>, resp: Reply<()> },
    SetShooterFilter { ids: Option<Vec<String>>, resp: Reply<()> },
    SetSetting { key: String, value: serde_json::Value, resp: Reply<()> },
    SetLabelLayout { layout: LabelLayout, resp: Reply<()> },
    SaveLogo { data_url: String, resp: Reply<()> },
    DeleteLogo { resp: Reply<bool> },
    LogoCompressed { original: String, compressed: String },
    Import { data: serde_json::Value, resp: Reply<()> },
    Export { resp: oneshot::Sender<ExportDocument> },
    FindShooter { id: ShooterId, resp: oneshot::Sender<Option<Shooter>> },
    ResultsForShooter {
        shooter_id: ShooterId,
        discipline: Option<Discipline>,
        team_id: Option<TeamId>,
        resp: oneshot::Sender<Vec<ResultEntry>>,
    },
    FilteredTeams { resp: oneshot::Sender<Vec<Team>> },
    FilteredShooters { resp: oneshot::Sender<Vec<Shooter>> },
    Disciplines { resp: oneshot::Sender<Vec<String>> },
    Settings { resp: oneshot::Sender<Settings> },
    Standings { resp: oneshot::Sender<Standings> },
    Stats { resp: oneshot::Sender<Stats> },
    Reset { resp: Reply<()> },
    Shutdown { resp: Reply<()> },
}

/// Moves `store` onto its own task and returns a handle to it.
///
/// Commands run one at a time in arrival order, so every read-modify-save
/// sequence has exclusive access to the store.
pub fn spawn_scorebook(store: Scorebook, config: RuntimeConfig) -> ScorebookHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<ScorebookEvent>(config.event_capacity);

    let events_tx_loop = events_tx.clone();
    let self_tx = cmd_tx.downgrade();

    tokio::spawn(async move {
        let mut store = store;
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &mut store, &events_tx_loop, &self_tx, &config) {
                break;
            }
        }
        debug!("scorebook task stopped");
    });

    ScorebookHandle { cmd_tx, events_tx }
}

impl ScorebookHandle {
    /// Receiver for events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScorebookEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Adds a team and returns its id.
    pub async fn add_team(&self, team: Team) -> Result<TeamId, RuntimeError> {
        Ok(self.request(|resp| Command::AddTeam { team, resp }).await??)
    }

    /// Replaces a team. Returns false for an unknown id.
    pub async fn update_team(&self, team: Team) -> Result<bool, RuntimeError> {
        Ok(self.request(|resp| Command::UpdateTeam { team, resp }).await??)
    }

    /// Deletes a team with its results.
    pub async fn delete_team(&self, id: impl Into<TeamId>) -> Result<bool, RuntimeError> {
        let id = id.into();
        Ok(self.request(|resp| Command::DeleteTeam { id, resp }).await??)
    }

    /// Adds a standalone shooter and returns its id.
    pub async fn add_standalone_shooter(&self, shooter: Shooter) -> Result<ShooterId, RuntimeError> {
        Ok(self.request(|resp| Command::AddShooter { shooter, resp }).await??)
    }

    /// Replaces a standalone shooter. Returns false for an unknown id.
    pub async fn update_standalone_shooter(&self, shooter: Shooter) -> Result<bool, RuntimeError> {
        Ok(self.request(|resp| Command::UpdateShooter { shooter, resp }).await??)
    }

    /// Deletes a standalone shooter with its results.
    pub async fn delete_standalone_shooter(&self, id: impl Into<ShooterId>) -> Result<bool, RuntimeError> {
        let id = id.into();
        Ok(self.request(|resp| Command::DeleteShooter { id, resp }).await??)
    }

    /// Upserts a result and returns its id.
    pub async fn save_result(&self, entry: ResultEntry) -> Result<ResultId, RuntimeError> {
        Ok(self.request(|resp| Command::SaveResult { entry, resp }).await??)
    }

    /// Deletes one result by id.
    pub async fn delete_result(&self, id: impl Into<ResultId>) -> Result<bool, RuntimeError> {
        let id = id.into();
        Ok(self.request(|resp| Command::DeleteResult { id, resp }).await??)
    }

    /// Deletes every result of a shooter and returns how many went.
    pub async fn delete_results_for_shooter(&self, shooter_id: impl Into<ShooterId>) -> Result<usize, RuntimeError> {
        let shooter_id = shooter_id.into();
        Ok(self
            .request(|resp| Command::DeleteResultsForShooter { shooter_id, resp })
            .await??)
    }

    /// Selects a discipline and its competition type.
    pub async fn select_discipline(&self, discipline: Discipline) -> Result<(), RuntimeError> {
        Ok(self
            .request(|resp| Command::SelectDiscipline { discipline, resp })
            .await??)
    }

    /// Switches competition type.
    pub async fn set_competition_type(&self, competition: CompetitionType) -> Result<(), RuntimeError> {
        Ok(self
            .request(|resp| Command::SetCompetitionType { competition, resp })
            .await??)
    }

    /// Appends a discipline name and returns its index.
    pub async fn add_discipline(&self, name: impl Into<String>) -> Result<usize, RuntimeError> {
        let name = name.into();
        Ok(self.request(|resp| Command::AddDiscipline { name, resp }).await??)
    }

    /// Renames the discipline at `index`.
    pub async fn update_discipline(&self, index: usize, name: impl Into<String>) -> Result<bool, RuntimeError> {
        let name = name.into();
        Ok(self
            .request(|resp| Command::UpdateDiscipline { index, name, resp })
            .await??)
    }

    /// Removes the discipline at `index`.
    pub async fn delete_discipline(&self, index: usize) -> Result<bool, RuntimeError> {
        Ok(self.request(|resp| Command::DeleteDiscipline { index, resp }).await??)
    }

    /// Replaces the team filter.
    pub async fn set_team_filter(&self, ids: Option<Vec<String>>) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::SetTeamFilter { ids, resp }).await??)
    }

    /// Replaces the standalone shooter filter.
    pub async fn set_shooter_filter(&self, ids: Option<Vec<String>>) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::SetShooterFilter { ids, resp }).await??)
    }

    /// Writes one settings key.
    pub async fn set_setting(&self, key: impl Into<String>, value: serde_json::Value) -> Result<(), RuntimeError> {
        let key = key.into();
        Ok(self.request(|resp| Command::SetSetting { key, value, resp }).await??)
    }

    /// Writes the label layout.
    pub async fn set_label_layout(&self, layout: LabelLayout) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::SetLabelLayout { layout, resp }).await??)
    }

    /// Stores the logo immediately; the compressed replacement, if any,
    /// arrives later with a [`ScorebookEvent::LogoChanged`] event.
    pub async fn save_logo(&self, data_url: impl Into<String>) -> Result<(), RuntimeError> {
        let data_url = data_url.into();
        Ok(self.request(|resp| Command::SaveLogo { data_url, resp }).await??)
    }

    /// Removes the logo. Returns false when none was stored.
    pub async fn delete_logo(&self) -> Result<bool, RuntimeError> {
        Ok(self.request(|resp| Command::DeleteLogo { resp }).await??)
    }

    /// Imports a backup or legacy settings export.
    pub async fn import_data(&self, data: serde_json::Value) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::Import { data, resp }).await??)
    }

    /// Full-state snapshot.
    pub async fn export_data(&self) -> Result<ExportDocument, RuntimeError> {
        self.request(|resp| Command::Export { resp }).await
    }

    /// Looks through team rosters first, then standalone shooters.
    pub async fn find_shooter(&self, id: impl Into<ShooterId>) -> Result<Option<Shooter>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::FindShooter { id, resp }).await
    }

    /// Results of a shooter, optionally narrowed to a discipline and a team.
    pub async fn results_for_shooter(
        &self,
        shooter_id: impl Into<ShooterId>,
        discipline: Option<Discipline>,
        team_id: Option<TeamId>,
    ) -> Result<Vec<ResultEntry>, RuntimeError> {
        let shooter_id = shooter_id.into();
        self.request(|resp| Command::ResultsForShooter {
            shooter_id,
            discipline,
            team_id,
            resp,
        })
        .await
    }

    /// Teams passing the team filter.
    pub async fn filtered_teams(&self) -> Result<Vec<Team>, RuntimeError> {
        self.request(|resp| Command::FilteredTeams { resp }).await
    }

    /// Standalone shooters passing the shooter filter.
    pub async fn filtered_standalone_shooters(&self) -> Result<Vec<Shooter>, RuntimeError> {
        self.request(|resp| Command::FilteredShooters { resp }).await
    }

    /// Discipline names offered for selection.
    pub async fn disciplines(&self) -> Result<Vec<String>, RuntimeError> {
        self.request(|resp| Command::Disciplines { resp }).await
    }

    /// Copy of the settings bag.
    pub async fn settings(&self) -> Result<Settings, RuntimeError> {
        self.request(|resp| Command::Settings { resp }).await
    }

    /// Current rankings.
    pub async fn standings(&self) -> Result<Standings, RuntimeError> {
        self.request(|resp| Command::Standings { resp }).await
    }

    /// Collection counts and document size.
    pub async fn stats(&self) -> Result<Stats, RuntimeError> {
        self.request(|resp| Command::Stats { resp }).await
    }

    /// Clears everything and erases the durable slot.
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::Reset { resp }).await??)
    }

    /// Writes the state one final time and stops the task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::Shutdown { resp }).await??)
    }
}

fn handle_command(
    cmd: Command,
    store: &mut Scorebook,
    events_tx: &broadcast::Sender<ScorebookEvent>,
    self_tx: &WeakSender<Command>,
    config: &RuntimeConfig,
) -> bool {
    match cmd {
        Command::AddTeam { team, resp } => {
            let res = store.add_team(team);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::TeamsChanged));
        }
        Command::UpdateTeam { team, resp } => {
            let res = store.update_team(team);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::TeamsChanged));
        }
        Command::DeleteTeam { id, resp } => {
            let res = store.delete_team(&id);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::TeamsChanged));
        }
        Command::AddShooter { shooter, resp } => {
            let res = store.add_standalone_shooter(shooter);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::ShootersChanged));
        }
        Command::UpdateShooter { shooter, resp } => {
            let res = store.update_standalone_shooter(shooter);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::ShootersChanged));
        }
        Command::DeleteShooter { id, resp } => {
            let res = store.delete_standalone_shooter(&id);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::ShootersChanged));
        }
        Command::SaveResult { entry, resp } => {
            let shooter_id = entry.shooter_id.clone();
            let res = store.save_result(entry);
            reply(events_tx, resp, res, |_| {
                Some(ScorebookEvent::ResultsChanged { shooter_id })
            });
        }
        Command::DeleteResult { id, resp } => {
            let res = store.delete_result(&id);
            reply(events_tx, resp, res, |found| {
                found.then(|| ScorebookEvent::ResultDeleted { result_id: id })
            });
        }
        Command::DeleteResultsForShooter { shooter_id, resp } => {
            let res = store.delete_results_for_shooter(&shooter_id);
            reply(events_tx, resp, res, |removed| {
                (*removed > 0).then(|| ScorebookEvent::ResultsChanged { shooter_id })
            });
        }
        Command::SelectDiscipline { discipline, resp } => {
            let res = store.set_selected_discipline(discipline);
            let competition_type = store.competition_type();
            reply(events_tx, resp, res, |_| {
                Some(ScorebookEvent::SelectionChanged {
                    discipline,
                    competition_type,
                })
            });
        }
        Command::SetCompetitionType { competition, resp } => {
            let res = store.set_competition_type(competition);
            let discipline = store.selected_discipline();
            reply(events_tx, resp, res, |_| {
                Some(ScorebookEvent::SelectionChanged {
                    discipline,
                    competition_type: competition,
                })
            });
        }
        Command::AddDiscipline { name, resp } => {
            let res = store.add_discipline(&name);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::DisciplinesChanged));
        }
        Command::UpdateDiscipline { index, name, resp } => {
            let res = store.update_discipline(index, &name);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::DisciplinesChanged));
        }
        Command::DeleteDiscipline { index, resp } => {
            let res = store.delete_discipline(index);
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::DisciplinesChanged));
        }
        Command::SetTeamFilter { ids, resp } => {
            let res = store.set_team_filter(ids);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::FiltersChanged));
        }
        Command::SetShooterFilter { ids, resp } => {
            let res = store.set_shooter_filter(ids);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::FiltersChanged));
        }
        Command::SetSetting { key, value, resp } => {
            let res = store.set_setting(&key, value);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::SettingsChanged));
        }
        Command::SetLabelLayout { layout, resp } => {
            let res = store.set_label_layout(&layout);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::SettingsChanged));
        }
        Command::SaveLogo { data_url, resp } => {
            let res = store.save_logo(&data_url);
            if res.is_ok() && config.compress_logo_on_upload {
                if let Some(stored) = store.logo() {
                    spawn_logo_compression(store.compressor(), stored.to_string(), self_tx.clone());
                }
            }
            reply(events_tx, resp, res, |_| {
                Some(ScorebookEvent::LogoChanged { compressed: false })
            });
        }
        Command::DeleteLogo { resp } => {
            let res = store.delete_logo();
            reply(events_tx, resp, res, |found| found.then_some(ScorebookEvent::LogoDeleted));
        }
        Command::LogoCompressed { original, compressed } => {
            match store.apply_compressed_logo(&original, compressed) {
                Ok(true) => {
                    let _ = events_tx.send(ScorebookEvent::LogoChanged { compressed: true });
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, "saving compressed logo failed");
                    emit_storage_full(events_tx, &err);
                }
            }
        }
        Command::Import { data, resp } => {
            let res = store.import_data(data);
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::Imported));
        }
        Command::Export { resp } => {
            let _ = resp.send(store.export_data());
        }
        Command::FindShooter { id, resp } => {
            let _ = resp.send(store.find_shooter_by_id(&id).cloned());
        }
        Command::ResultsForShooter {
            shooter_id,
            discipline,
            team_id,
            resp,
        } => {
            let found = store
                .results_for_shooter(&shooter_id, discipline, team_id.as_deref())
                .into_iter()
                .cloned()
                .collect();
            let _ = resp.send(found);
        }
        Command::FilteredTeams { resp } => {
            let _ = resp.send(store.filtered_teams().into_iter().cloned().collect());
        }
        Command::FilteredShooters { resp } => {
            let _ = resp.send(store.filtered_standalone_shooters().into_iter().cloned().collect());
        }
        Command::Disciplines { resp } => {
            let _ = resp.send(store.disciplines().to_vec());
        }
        Command::Settings { resp } => {
            let _ = resp.send(store.settings().clone());
        }
        Command::Standings { resp } => {
            let _ = resp.send(Standings {
                competition_type: store.competition_type(),
                teams: store.team_standings(),
                standalone: store.standalone_standings(),
            });
        }
        Command::Stats { resp } => {
            let _ = resp.send(store.stats());
        }
        Command::Reset { resp } => {
            let res = store.reset();
            reply(events_tx, resp, res, |_| Some(ScorebookEvent::Reset));
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(store.save());
            return true;
        }
    }

    false
}

fn reply<T>(
    events_tx: &broadcast::Sender<ScorebookEvent>,
    resp: Reply<T>,
    res: Result<T, StoreError>,
    event: impl FnOnce(&T) -> Option<ScorebookEvent>,
) {
    match &res {
        Ok(value) => {
            if let Some(ev) = event(value) {
                let _ = events_tx.send(ev);
            }
        }
        Err(err) => emit_storage_full(events_tx, err),
    }
    let _ = resp.send(res);
}

fn emit_storage_full(events_tx: &broadcast::Sender<ScorebookEvent>, err: &StoreError) {
    if matches!(err, StoreError::StorageFull(_)) {
        let _ = events_tx.send(ScorebookEvent::StorageFull {
            message: err.to_string(),
        });
    }
}

fn spawn_logo_compression(compressor: Arc<dyn LogoCompressor>, original: String, self_tx: WeakSender<Command>) {
    tokio::spawn(async move {
        let input = original.clone();
        let res = tokio::task::spawn_blocking(move || compressor.compress(&input)).await;
        let compressed = match res {
            Ok(Ok(compressed)) => compressed,
            Ok(Err(err)) => {
                warn!(%err, "background logo compression failed");
                return;
            }
            Err(err) => {
                warn!(%err, "logo compression task failed");
                return;
            }
        };
        if let Some(tx) = self_tx.upgrade() {
            let _ = tx.send(Command::LogoCompressed { original, compressed }).await;
        }
    });
}
