use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use hashbrown::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    engine::scoring::{self, ShooterScore, TeamStanding},
    filter::VisibilityFilter,
    logo::{self, JpegLogoCompressor, LogoCompressor, LogoError},
    model::{ResultEntry, Shooter, Team},
    persist::{Slot, SlotError},
    settings::{LabelLayout, Settings},
    types::{CompetitionType, Discipline, ResultId, ShooterId, TeamId, generate_id},
    validate::{ValidationError, validate_discipline_name, validate_name},
};

use super::document::{
    DocumentView, EXPORT_TYPE_COMPLETE, ExportDocument, ImportDocument, StoreDocument,
    default_disciplines,
};

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before any mutation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The slot is out of capacity even after compressing the logo.
    #[error("Speicher voll: Die Daten konnten auch nach Komprimierung des Logos nicht gespeichert werden")]
    StorageFull(#[source] SlotError),
    /// Any other write or serialization failure.
    #[error("Speichern fehlgeschlagen: {0}")]
    Persist(#[from] SlotError),
    /// Import payload rejected; nothing was applied.
    #[error("Import fehlgeschlagen: {0}")]
    Import(String),
    /// Decoded logo exceeds the configured cap.
    #[error("Logo ist zu groß ({size} Bytes, maximal {max} Bytes)")]
    LogoTooLarge {
        /// Decoded size in bytes.
        size: usize,
        /// Configured cap in bytes.
        max: usize,
    },
    /// Logo is not a usable data URL.
    #[error(transparent)]
    Logo(#[from] LogoError),
    /// Id already taken by another entity.
    #[error("ID {0} ist bereits vergeben")]
    DuplicateId(String),
    /// Discipline name already in the list.
    #[error("Disziplin {0:?} existiert bereits")]
    DuplicateDiscipline(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Persist(SlotError::Serde(value))
    }
}

/// Store tuning knobs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of the durable slot holding the document.
    pub slot_key: String,
    /// Document size above which the logo is compressed before writing.
    pub compress_threshold_chars: usize,
    /// Largest accepted decoded logo, in bytes.
    pub max_logo_bytes: usize,
    /// Bounding box edge for the default compressor, in pixels.
    pub logo_max_dimension: u32,
    /// JPEG quality for the default compressor.
    pub logo_jpeg_quality: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slot_key: "shootingCompetitionData".to_string(),
            compress_threshold_chars: 5_000_000,
            max_logo_bytes: 5 * 1024 * 1024,
            logo_max_dimension: 300,
            logo_jpeg_quality: 70,
        }
    }
}

/// Aggregate counts for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Number of teams.
    pub teams: usize,
    /// Shooters across all rosters.
    pub team_shooters: usize,
    /// Number of standalone shooters.
    pub standalone_shooters: usize,
    /// Number of result entries.
    pub results: usize,
    /// Length of the discipline list.
    pub disciplines: usize,
    /// Teams passing the team filter.
    pub visible_teams: usize,
    /// Standalone shooters passing the shooter filter.
    pub visible_standalone_shooters: usize,
    /// True when a club logo is stored.
    pub has_logo: bool,
    /// Length of the logo data URL.
    pub logo_chars: usize,
    /// Length of the serialized document.
    pub document_chars: usize,
}

/// Authoritative in-memory state backed by one durable slot.
///
/// Every mutator ends with [`Scorebook::save`]. When that write fails the
/// in-memory state keeps the mutation and the error is returned.
pub struct Scorebook {
    teams: Vec<Team>,
    standalone_shooters: Vec<Shooter>,
    results: Vec<ResultEntry>,
    visible_teams: VisibilityFilter,
    visible_shooters: VisibilityFilter,
    disciplines: Vec<String>,
    selected_discipline: Discipline,
    competition_type: CompetitionType,
    settings: Settings,
    slot: Box<dyn Slot>,
    compressor: Arc<dyn LogoCompressor>,
    config: StoreConfig,
}

impl fmt::Debug for Scorebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scorebook")
            .field("teams", &self.teams.len())
            .field("standalone_shooters", &self.standalone_shooters.len())
            .field("results", &self.results.len())
            .field("selected_discipline", &self.selected_discipline)
            .field("competition_type", &self.competition_type)
            .finish_non_exhaustive()
    }
}

impl Scorebook {
    /// Creates an empty store with default disciplines. Nothing is read.
    pub fn new(slot: Box<dyn Slot>, config: StoreConfig) -> Self {
        let compressor = Arc::new(JpegLogoCompressor {
            max_dimension: config.logo_max_dimension,
            quality: config.logo_jpeg_quality,
        });
        Self {
            teams: Vec::new(),
            standalone_shooters: Vec::new(),
            results: Vec::new(),
            visible_teams: VisibilityFilter::unset(),
            visible_shooters: VisibilityFilter::unset(),
            disciplines: default_disciplines(),
            selected_discipline: Discipline::Precision,
            competition_type: CompetitionType::PrecisionDuel,
            settings: Settings::new(),
            slot,
            compressor,
            config,
        }
    }

    /// Creates a store and loads whatever the slot holds.
    pub fn open(slot: Box<dyn Slot>, config: StoreConfig) -> Self {
        let mut store = Self::new(slot, config);
        store.load();
        store
    }

    /// Replaces the logo compressor.
    pub fn with_compressor(mut self, compressor: Arc<dyn LogoCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn compressor(&self) -> Arc<dyn LogoCompressor> {
        Arc::clone(&self.compressor)
    }

    // ---- lifecycle ----

    /// Reads the durable slot. Missing or corrupt data falls back to
    /// [`Scorebook::setup_initial_data`]. Returns true when stored data was used.
    pub fn load(&mut self) -> bool {
        let raw = match self.slot.read(&self.config.slot_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("no stored data, starting with defaults");
                self.setup_initial_data();
                return false;
            }
            Err(err) => {
                warn!(%err, "reading stored data failed, starting with defaults");
                self.setup_initial_data();
                return false;
            }
        };

        match serde_json::from_str::<StoreDocument>(&raw) {
            Ok(doc) => {
                self.apply_document(doc);
                info!(
                    teams = self.teams.len(),
                    standalone = self.standalone_shooters.len(),
                    results = self.results.len(),
                    "loaded stored data"
                );
                true
            }
            Err(err) => {
                warn!(%err, "stored data is corrupt, starting with defaults");
                self.setup_initial_data();
                false
            }
        }
    }

    /// Empty collections, unset filters, default disciplines and selection.
    pub fn setup_initial_data(&mut self) {
        self.teams.clear();
        self.standalone_shooters.clear();
        self.results.clear();
        self.visible_teams = VisibilityFilter::unset();
        self.visible_shooters = VisibilityFilter::unset();
        self.disciplines = default_disciplines();
        self.selected_discipline = Discipline::Precision;
        self.competition_type = CompetitionType::PrecisionDuel;
    }

    /// Writes the full state to the durable slot.
    ///
    /// Large documents get their logo compressed first. A capacity failure
    /// compresses the logo and retries once before returning
    /// [`StoreError::StorageFull`].
    pub fn save(&mut self) -> Result<(), StoreError> {
        let mut payload = self.serialize()?;
        debug!(chars = payload.len(), "saving");

        if payload.len() > self.config.compress_threshold_chars && self.settings.club_logo().is_some() {
            debug!(
                chars = payload.len(),
                threshold = self.config.compress_threshold_chars,
                "document is large, compressing logo before write"
            );
            if self.compress_logo() {
                payload = self.serialize()?;
            }
        }

        match self.slot.write(&self.config.slot_key, &payload) {
            Ok(()) => Ok(()),
            Err(err) if err.is_quota_exceeded() => {
                warn!(%err, "storage full, compressing logo and retrying");
                if self.compress_logo() {
                    payload = self.serialize()?;
                }
                self.slot
                    .write(&self.config.slot_key, &payload)
                    .map_err(|err| {
                        if err.is_quota_exceeded() {
                            StoreError::StorageFull(err)
                        } else {
                            StoreError::Persist(err)
                        }
                    })
            }
            Err(err) => Err(StoreError::Persist(err)),
        }
    }

    /// Clears everything, including settings, and erases the durable slot.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.setup_initial_data();
        self.settings = Settings::new();
        self.slot.remove(&self.config.slot_key)?;
        info!("store reset");
        Ok(())
    }

    fn serialize(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(&self.view())?)
    }

    fn view(&self) -> DocumentView<'_> {
        DocumentView {
            teams: &self.teams,
            standalone_shooters: &self.standalone_shooters,
            results: &self.results,
            visible_team_ids: &self.visible_teams,
            visible_shooter_ids: &self.visible_shooters,
            available_disciplines: &self.disciplines,
            selected_discipline: self.selected_discipline,
            selected_competition_type: self.competition_type,
            settings: &self.settings,
        }
    }

    fn apply_document(&mut self, doc: StoreDocument) {
        self.teams = doc.teams;
        self.standalone_shooters = doc.standalone_shooters;
        self.results = doc.results;
        self.visible_teams = doc.visible_team_ids;
        self.visible_shooters = doc.visible_shooter_ids;
        self.disciplines = if doc.available_disciplines.is_empty() {
            default_disciplines()
        } else {
            doc.available_disciplines
        };
        self.settings = doc.settings;
        self.apply_selection(doc.selected_discipline, doc.selected_competition_type);
    }

    // The competition type wins when the two disagree.
    fn apply_selection(&mut self, discipline: Option<Discipline>, competition: Option<CompetitionType>) {
        let competition = competition
            .or(discipline.map(Discipline::competition_type))
            .unwrap_or(self.competition_type);
        let discipline = discipline
            .filter(|d| d.competition_type() == competition)
            .unwrap_or_else(|| competition.default_discipline());
        self.competition_type = competition;
        self.selected_discipline = discipline;
    }

    // ---- teams ----

    /// All teams in insertion order.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Team by id.
    pub fn find_team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Team whose roster contains `shooter_id`.
    pub fn team_of_shooter(&self, shooter_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.shooter(shooter_id).is_some())
    }

    /// Adds a team. An empty id is replaced by a generated one.
    pub fn add_team(&mut self, team: Team) -> Result<TeamId, StoreError> {
        let mut team = self.normalize_team(team)?;
        if team.id.is_empty() {
            team.id = generate_id();
        }
        if self.find_team(&team.id).is_some() {
            return Err(StoreError::DuplicateId(team.id));
        }
        for shooter in &team.shooters {
            if self.find_shooter_by_id(&shooter.id).is_some() {
                return Err(StoreError::DuplicateId(shooter.id.clone()));
            }
        }

        let id = team.id.clone();
        self.teams.push(team);
        self.save()?;
        Ok(id)
    }

    /// Replaces a team. Results of shooters dropped from the roster are deleted.
    pub fn update_team(&mut self, team: Team) -> Result<bool, StoreError> {
        if team.id.is_empty() {
            return Err(ValidationError::MissingField("Mannschafts-ID").into());
        }
        let team = self.normalize_team(team)?;
        let Some(idx) = self.teams.iter().position(|t| t.id == team.id) else {
            warn!(team_id = %team.id, "update of unknown team");
            return Ok(false);
        };
        for shooter in &team.shooters {
            let owned_elsewhere = self.teams[idx].shooter(&shooter.id).is_none()
                && self.find_shooter_by_id(&shooter.id).is_some();
            if owned_elsewhere {
                return Err(StoreError::DuplicateId(shooter.id.clone()));
            }
        }

        let removed: Vec<ShooterId> = self.teams[idx]
            .shooters
            .iter()
            .filter(|old| team.shooter(&old.id).is_none())
            .map(|old| old.id.clone())
            .collect();
        for shooter_id in &removed {
            self.purge_results_for_shooter(shooter_id);
        }
        if !removed.is_empty() {
            debug!(team_id = %team.id, removed = removed.len(), "roster shrank, results deleted");
        }

        self.teams[idx] = team;
        self.save()?;
        Ok(true)
    }

    /// Deletes a team together with every result of its roster.
    pub fn delete_team(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(idx) = self.teams.iter().position(|t| t.id == id) else {
            warn!(team_id = %id, "delete of unknown team");
            return Ok(false);
        };
        let team = self.teams.remove(idx);
        for shooter in &team.shooters {
            self.purge_results_for_shooter(&shooter.id);
        }
        self.results.retain(|r| r.team_id.as_deref() != Some(id));
        self.visible_teams.remove(id);
        self.save()?;
        Ok(true)
    }

    fn normalize_team(&self, mut team: Team) -> Result<Team, StoreError> {
        team.name = validate_name(&team.name)?;
        for shooter in &mut team.shooters {
            shooter.name = validate_name(&shooter.name)?;
            if shooter.id.is_empty() {
                shooter.id = generate_id();
            }
        }
        if let Some(dup) = first_repeated(team.shooters.iter().map(|s| s.id.as_str())) {
            return Err(StoreError::DuplicateId(dup.to_string()));
        }
        Ok(team)
    }

    // ---- standalone shooters ----

    /// Standalone shooters in insertion order.
    pub fn standalone_shooters(&self) -> &[Shooter] {
        &self.standalone_shooters
    }

    /// Adds a standalone shooter. An empty id is replaced by a generated one.
    pub fn add_standalone_shooter(&mut self, mut shooter: Shooter) -> Result<ShooterId, StoreError> {
        shooter.name = validate_name(&shooter.name)?;
        if shooter.id.is_empty() {
            shooter.id = generate_id();
        }
        if self.find_shooter_by_id(&shooter.id).is_some() {
            return Err(StoreError::DuplicateId(shooter.id));
        }

        let id = shooter.id.clone();
        self.standalone_shooters.push(shooter);
        self.save()?;
        Ok(id)
    }

    /// Replaces a standalone shooter. Returns false for an unknown id.
    pub fn update_standalone_shooter(&mut self, mut shooter: Shooter) -> Result<bool, StoreError> {
        if shooter.id.is_empty() {
            return Err(ValidationError::MissingField("Schützen-ID").into());
        }
        shooter.name = validate_name(&shooter.name)?;
        let Some(existing) = self.standalone_shooters.iter_mut().find(|s| s.id == shooter.id) else {
            warn!(shooter_id = %shooter.id, "update of unknown standalone shooter");
            return Ok(false);
        };
        *existing = shooter;
        self.save()?;
        Ok(true)
    }

    /// Deletes a standalone shooter with its results and filter entry.
    pub fn delete_standalone_shooter(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(idx) = self.standalone_shooters.iter().position(|s| s.id == id) else {
            warn!(shooter_id = %id, "delete of unknown standalone shooter");
            return Ok(false);
        };
        self.standalone_shooters.remove(idx);
        self.purge_results_for_shooter(id);
        self.visible_shooters.remove(id);
        self.save()?;
        Ok(true)
    }

    /// Looks through team rosters first, then standalone shooters.
    pub fn find_shooter_by_id(&self, id: &str) -> Option<&Shooter> {
        self.teams
            .iter()
            .find_map(|t| t.shooter(id))
            .or_else(|| self.standalone_shooters.iter().find(|s| s.id == id))
    }

    // ---- results ----

    /// All result entries.
    pub fn results(&self) -> &[ResultEntry] {
        &self.results
    }

    /// Upserts by `(shooter, discipline, team)`. A matching entry keeps its id
    /// and position.
    pub fn save_result(&mut self, mut entry: ResultEntry) -> Result<ResultId, StoreError> {
        check_result(&entry)?;

        let existing = self.results.iter().position(|r| {
            r.matches_key(&entry.shooter_id, entry.discipline, entry.team_id.as_deref())
        });
        let id = match existing {
            Some(idx) => {
                entry.id = self.results[idx].id.clone();
                let id = entry.id.clone();
                self.results[idx] = entry;
                id
            }
            None => {
                if entry.id.is_empty() {
                    entry.id = generate_id();
                }
                let id = entry.id.clone();
                self.results.push(entry);
                id
            }
        };
        self.save()?;
        Ok(id)
    }

    /// Deletes one result by id.
    pub fn delete_result(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.results.len();
        self.results.retain(|r| r.id != id);
        if self.results.len() == before {
            warn!(result_id = %id, "delete of unknown result");
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Deletes every result of a shooter; nothing to delete is not an error.
    pub fn delete_results_for_shooter(&mut self, shooter_id: &str) -> Result<usize, StoreError> {
        let removed = self.purge_results_for_shooter(shooter_id);
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    fn purge_results_for_shooter(&mut self, shooter_id: &str) -> usize {
        let before = self.results.len();
        self.results.retain(|r| r.shooter_id != shooter_id);
        before - self.results.len()
    }

    /// The entry occupying the `(shooter, discipline, team)` slot.
    pub fn result_for(&self, shooter_id: &str, discipline: Discipline, team_id: Option<&str>) -> Option<&ResultEntry> {
        self.results
            .iter()
            .find(|r| r.matches_key(shooter_id, discipline, team_id))
    }

    /// Results of a shooter, optionally narrowed to a discipline and a team.
    pub fn results_for_shooter(
        &self,
        shooter_id: &str,
        discipline: Option<Discipline>,
        team_id: Option<&str>,
    ) -> Vec<&ResultEntry> {
        self.results
            .iter()
            .filter(|r| r.shooter_id == shooter_id)
            .filter(|r| discipline.is_none_or(|d| r.discipline == d))
            .filter(|r| team_id.is_none_or(|t| r.team_id.as_deref() == Some(t)))
            .collect()
    }

    /// Results recorded in a team context, optionally narrowed to a discipline.
    pub fn results_for_team(&self, team_id: &str, discipline: Option<Discipline>) -> Vec<&ResultEntry> {
        self.results
            .iter()
            .filter(|r| r.team_id.as_deref() == Some(team_id))
            .filter(|r| discipline.is_none_or(|d| r.discipline == d))
            .collect()
    }

    // ---- disciplines and selection ----

    /// Discipline names offered for selection.
    pub fn disciplines(&self) -> &[String] {
        &self.disciplines
    }

    /// Appends a discipline name and returns its index.
    pub fn add_discipline(&mut self, name: &str) -> Result<usize, StoreError> {
        let name = validate_discipline_name(name)?;
        if self.disciplines.contains(&name) {
            return Err(StoreError::DuplicateDiscipline(name));
        }
        self.disciplines.push(name);
        self.save()?;
        Ok(self.disciplines.len() - 1)
    }

    /// Renames the discipline at `index`.
    pub fn update_discipline(&mut self, index: usize, name: &str) -> Result<bool, StoreError> {
        let name = validate_discipline_name(name)?;
        if index >= self.disciplines.len() {
            warn!(index, "update of unknown discipline index");
            return Ok(false);
        }
        let taken = self
            .disciplines
            .iter()
            .enumerate()
            .any(|(i, d)| i != index && *d == name);
        if taken {
            return Err(StoreError::DuplicateDiscipline(name));
        }
        self.disciplines[index] = name;
        self.save()?;
        Ok(true)
    }

    /// Removes the discipline at `index`.
    pub fn delete_discipline(&mut self, index: usize) -> Result<bool, StoreError> {
        if index >= self.disciplines.len() {
            warn!(index, "delete of unknown discipline index");
            return Ok(false);
        }
        self.disciplines.remove(index);
        self.save()?;
        Ok(true)
    }

    /// Currently selected discipline.
    pub fn selected_discipline(&self) -> Discipline {
        self.selected_discipline
    }

    /// Competition type used for scoring.
    pub fn competition_type(&self) -> CompetitionType {
        self.competition_type
    }

    /// Selects a discipline and switches to its competition type.
    pub fn set_selected_discipline(&mut self, discipline: Discipline) -> Result<(), StoreError> {
        self.selected_discipline = discipline;
        self.competition_type = discipline.competition_type();
        self.save()
    }

    /// Switches competition type, selecting its default discipline if the
    /// current one does not belong to it.
    pub fn set_competition_type(&mut self, competition: CompetitionType) -> Result<(), StoreError> {
        self.apply_selection(Some(self.selected_discipline), Some(competition));
        self.save()
    }

    // ---- visibility ----

    /// Team visibility filter.
    pub fn team_filter(&self) -> &VisibilityFilter {
        &self.visible_teams
    }

    /// Standalone shooter visibility filter.
    pub fn shooter_filter(&self) -> &VisibilityFilter {
        &self.visible_shooters
    }

    /// Replaces the team filter; `None` shows every team.
    pub fn set_team_filter(&mut self, ids: Option<Vec<String>>) -> Result<(), StoreError> {
        self.visible_teams.set(ids);
        self.save()
    }

    /// Replaces the shooter filter; `None` shows every standalone shooter.
    pub fn set_shooter_filter(&mut self, ids: Option<Vec<String>>) -> Result<(), StoreError> {
        self.visible_shooters.set(ids);
        self.save()
    }

    /// Teams passing the team filter, in insertion order.
    pub fn filtered_teams(&self) -> Vec<&Team> {
        self.visible_teams.apply(&self.teams, |t| &t.id)
    }

    /// Standalone shooters passing the shooter filter.
    pub fn filtered_standalone_shooters(&self) -> Vec<&Shooter> {
        self.visible_shooters.apply(&self.standalone_shooters, |s| &s.id)
    }

    // ---- scoring ----

    /// Score of a shooter under the current competition type.
    pub fn shooter_total(&self, shooter_id: &str, team_id: Option<&str>) -> u32 {
        scoring::shooter_total(&self.results, shooter_id, team_id, self.competition_type)
    }

    /// Standing of one team under the current competition type.
    pub fn team_standing(&self, team_id: &str) -> Option<TeamStanding> {
        self.find_team(team_id)
            .map(|t| scoring::team_standing(t, &self.results, self.competition_type))
    }

    /// Standings of the visible teams, best first.
    pub fn team_standings(&self) -> Vec<TeamStanding> {
        scoring::rank_teams(self.filtered_teams(), &self.results, self.competition_type)
    }

    /// Ranking of the visible standalone shooters, best first.
    pub fn standalone_standings(&self) -> Vec<ShooterScore> {
        scoring::rank_standalone(
            self.filtered_standalone_shooters(),
            &self.results,
            self.competition_type,
        )
    }

    // ---- settings and logo ----

    /// Settings bag.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Writes one settings key.
    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.settings.set(key, value);
        self.save()
    }

    /// Label-print layout with defaults filled in.
    pub fn label_layout(&self) -> LabelLayout {
        self.settings.label_layout()
    }

    /// Writes every label layout key.
    pub fn set_label_layout(&mut self, layout: &LabelLayout) -> Result<(), StoreError> {
        self.settings.set_label_layout(layout);
        self.save()
    }

    /// Stored club logo data URL.
    pub fn logo(&self) -> Option<&str> {
        self.settings.club_logo()
    }

    /// Stores a logo data URL, rejecting images above the size cap.
    pub fn save_logo(&mut self, data_url: &str) -> Result<(), StoreError> {
        if logo::parse_data_url(data_url).is_none() {
            return Err(LogoError::NotADataUrl.into());
        }
        let size = logo::decoded_len(data_url);
        if size > self.config.max_logo_bytes {
            return Err(StoreError::LogoTooLarge {
                size,
                max: self.config.max_logo_bytes,
            });
        }
        self.settings.set_club_logo(data_url.to_string());
        self.save()
    }

    /// Stores raw image bytes as a logo.
    pub fn save_logo_bytes(&mut self, bytes: &[u8], mime: &str) -> Result<(), StoreError> {
        if bytes.len() > self.config.max_logo_bytes {
            return Err(StoreError::LogoTooLarge {
                size: bytes.len(),
                max: self.config.max_logo_bytes,
            });
        }
        self.save_logo(&logo::to_data_url(bytes, mime))
    }

    /// Removes the logo. Returns false when none was stored.
    pub fn delete_logo(&mut self) -> Result<bool, StoreError> {
        if !self.settings.clear_club_logo() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Compresses the stored logo in memory. Returns true when it was replaced.
    ///
    /// The result is kept only if strictly shorter. Compression failures are
    /// logged and leave the logo untouched.
    pub fn compress_logo(&mut self) -> bool {
        let Some(current) = self.settings.club_logo() else {
            return false;
        };
        match self.compressor.compress(current) {
            Ok(compressed) => self.replace_logo_if_smaller(compressed),
            Err(err) => {
                warn!(%err, "logo compression failed");
                false
            }
        }
    }

    /// Applies a compression result computed elsewhere for `original`.
    ///
    /// Ignored when the stored logo changed in the meantime. Saves when the
    /// logo was replaced.
    pub fn apply_compressed_logo(&mut self, original: &str, compressed: String) -> Result<bool, StoreError> {
        if self.settings.club_logo() != Some(original) {
            debug!("stored logo changed during compression, dropping result");
            return Ok(false);
        }
        if !self.replace_logo_if_smaller(compressed) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn replace_logo_if_smaller(&mut self, compressed: String) -> bool {
        let current = self.settings.club_logo().map(str::len).unwrap_or(0);
        if compressed.len() >= current {
            debug!(current, compressed = compressed.len(), "compressed logo is not smaller");
            return false;
        }
        debug!(from = current, to = compressed.len(), "logo compressed");
        self.settings.set_club_logo(compressed);
        true
    }

    // ---- import / export ----

    /// Full-state snapshot with export metadata.
    pub fn export_data(&self) -> ExportDocument {
        ExportDocument {
            data: StoreDocument {
                teams: self.teams.clone(),
                standalone_shooters: self.standalone_shooters.clone(),
                results: self.results.clone(),
                visible_team_ids: self.visible_teams.clone(),
                visible_shooter_ids: self.visible_shooters.clone(),
                available_disciplines: self.disciplines.clone(),
                selected_discipline: Some(self.selected_discipline),
                selected_competition_type: Some(self.competition_type),
                settings: self.settings.clone(),
            },
            export_date: Utc::now().to_rfc3339(),
            export_type: EXPORT_TYPE_COMPLETE.to_string(),
        }
    }

    /// Imports a document. The whole payload is checked before any field is
    /// applied, so a malformed import leaves the state untouched.
    ///
    /// Full backups replace each top-level key they carry. Legacy settings
    /// exports only merge settings, the discipline list, the selection and the
    /// logo.
    pub fn import_data(&mut self, data: serde_json::Value) -> Result<(), StoreError> {
        if !data.is_object() {
            return Err(StoreError::Import("Importdatei enthält kein JSON-Objekt".to_string()));
        }
        let mut doc: ImportDocument =
            serde_json::from_value(data).map_err(|e| StoreError::Import(e.to_string()))?;
        self.check_import(&mut doc)
            .map_err(|e| StoreError::Import(e.to_string()))?;

        if doc.is_complete() {
            self.apply_complete_import(doc);
            info!("complete backup imported");
        } else {
            self.apply_legacy_import(doc);
            info!("legacy settings imported");
        }
        self.save()
    }

    // Runs the edit-time checks over the import and trims names in place.
    // Uniqueness is checked against the state the import would produce.
    fn check_import(&self, doc: &mut ImportDocument) -> Result<(), StoreError> {
        if let Some(disciplines) = doc.available_disciplines.as_mut() {
            for name in disciplines.iter_mut() {
                *name = validate_discipline_name(name)?;
            }
        }
        if !doc.is_complete() {
            return Ok(());
        }

        if let Some(teams) = doc.teams.as_mut() {
            for team in teams.iter_mut() {
                if team.id.is_empty() {
                    return Err(ValidationError::MissingField("Mannschafts-ID").into());
                }
                team.name = validate_name(&team.name)?;
                for shooter in team.shooters.iter_mut() {
                    if shooter.id.is_empty() {
                        return Err(ValidationError::MissingField("Schützen-ID").into());
                    }
                    shooter.name = validate_name(&shooter.name)?;
                }
            }
        }
        if let Some(shooters) = doc.standalone_shooters.as_mut() {
            for shooter in shooters.iter_mut() {
                if shooter.id.is_empty() {
                    return Err(ValidationError::MissingField("Schützen-ID").into());
                }
                shooter.name = validate_name(&shooter.name)?;
            }
        }
        if let Some(results) = &doc.results {
            for entry in results {
                check_result(entry)?;
            }
        }

        let teams = doc.teams.as_deref().unwrap_or(self.teams.as_slice());
        let standalone = doc
            .standalone_shooters
            .as_deref()
            .unwrap_or(self.standalone_shooters.as_slice());
        if let Some(dup) = first_repeated(teams.iter().map(|t| t.id.as_str())) {
            return Err(StoreError::DuplicateId(dup.to_string()));
        }
        let shooter_ids = teams
            .iter()
            .flat_map(|t| t.shooters.iter())
            .chain(standalone)
            .map(|s| s.id.as_str());
        if let Some(dup) = first_repeated(shooter_ids) {
            return Err(StoreError::DuplicateId(dup.to_string()));
        }
        Ok(())
    }

    fn apply_complete_import(&mut self, doc: ImportDocument) {
        if let Some(teams) = doc.teams {
            self.teams = teams;
        }
        if let Some(shooters) = doc.standalone_shooters {
            self.standalone_shooters = shooters;
        }
        if let Some(results) = doc.results {
            self.results = results;
        }
        if let Some(ids) = doc.visible_team_ids {
            self.visible_teams.set(ids);
        }
        if let Some(ids) = doc.visible_shooter_ids {
            self.visible_shooters.set(ids);
        }
        if let Some(disciplines) = doc.available_disciplines {
            self.disciplines = disciplines;
        }
        if doc.selected_discipline.is_some() || doc.selected_competition_type.is_some() {
            self.apply_selection(
                doc.selected_discipline.or(Some(self.selected_discipline)),
                doc.selected_competition_type,
            );
        }
        if let Some(settings) = doc.settings {
            self.settings = settings;
        }
        if let Some(logo) = doc.club_logo {
            self.settings.set_club_logo(logo);
        }
    }

    fn apply_legacy_import(&mut self, doc: ImportDocument) {
        if doc.teams.is_some() || doc.results.is_some() || doc.standalone_shooters.is_some() {
            warn!("legacy import carries competition data, ignoring it");
        }
        if let Some(settings) = doc.settings {
            self.settings.merge(settings);
        }
        if let Some(disciplines) = doc.available_disciplines {
            self.disciplines = disciplines;
        }
        if doc.selected_discipline.is_some() || doc.selected_competition_type.is_some() {
            self.apply_selection(
                doc.selected_discipline.or(Some(self.selected_discipline)),
                doc.selected_competition_type,
            );
        }
        if let Some(logo) = doc.club_logo {
            self.settings.set_club_logo(logo);
        }
    }

    // ---- diagnostics ----

    /// Collection counts and document size.
    pub fn stats(&self) -> Stats {
        Stats {
            teams: self.teams.len(),
            team_shooters: self.teams.iter().map(|t| t.shooters.len()).sum(),
            standalone_shooters: self.standalone_shooters.len(),
            results: self.results.len(),
            disciplines: self.disciplines.len(),
            visible_teams: self.filtered_teams().len(),
            visible_standalone_shooters: self.filtered_standalone_shooters().len(),
            has_logo: self.logo().is_some(),
            logo_chars: self.logo().map(str::len).unwrap_or(0),
            document_chars: self.serialize().map(|s| s.len()).unwrap_or(0),
        }
    }
}

// Non-empty shooter id and every set shot within the discipline's bound.
fn check_result(entry: &ResultEntry) -> Result<(), ValidationError> {
    if entry.shooter_id.is_empty() {
        return Err(ValidationError::MissingField("Schützen-ID"));
    }
    let max = entry.discipline.competition_type().max_shot_value();
    if let Some(value) = entry.shots.as_slice().iter().flatten().find(|v| **v > max) {
        return Err(ValidationError::ShotOutOfRange {
            value: i64::from(*value),
            max,
        });
    }
    Ok(())
}

fn first_repeated<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
