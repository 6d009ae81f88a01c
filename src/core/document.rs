use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    filter::VisibilityFilter,
    model::{ResultEntry, Shooter, Team},
    settings::Settings,
    types::{CompetitionType, Discipline},
};

/// Marker distinguishing a full backup from a legacy settings export.
pub const EXPORT_TYPE_COMPLETE: &str = "complete";

/// Disciplines available after first start or reset.
pub fn default_disciplines() -> Vec<String> {
    Discipline::ALL.iter().map(|d| d.name().to_string()).collect()
}

/// Borrowed view of the full state, as written to the durable slot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentView<'a> {
    pub teams: &'a [Team],
    pub standalone_shooters: &'a [Shooter],
    pub results: &'a [ResultEntry],
    pub visible_team_ids: &'a VisibilityFilter,
    pub visible_shooter_ids: &'a VisibilityFilter,
    pub available_disciplines: &'a [String],
    pub selected_discipline: Discipline,
    pub selected_competition_type: CompetitionType,
    pub settings: &'a Settings,
}

/// Owned durable document. Absent keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    /// Teams with their rosters.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Shooters competing without a team.
    #[serde(default)]
    pub standalone_shooters: Vec<Shooter>,
    /// All recorded results.
    #[serde(default)]
    pub results: Vec<ResultEntry>,
    /// Team filter; `null` shows every team.
    #[serde(default)]
    pub visible_team_ids: VisibilityFilter,
    /// Standalone shooter filter; `null` shows everyone.
    #[serde(default)]
    pub visible_shooter_ids: VisibilityFilter,
    /// Discipline names offered for selection.
    #[serde(default = "default_disciplines")]
    pub available_disciplines: Vec<String>,
    /// Selected discipline, if stored and recognized.
    #[serde(default, deserialize_with = "lenient")]
    pub selected_discipline: Option<Discipline>,
    /// Selected competition type, if stored and recognized.
    #[serde(default, deserialize_with = "lenient")]
    pub selected_competition_type: Option<CompetitionType>,
    /// Open settings bag, including the club logo.
    #[serde(default)]
    pub settings: Settings,
}

/// Full backup: the durable document plus export metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Exported state.
    #[serde(flatten)]
    pub data: StoreDocument,
    /// RFC 3339 timestamp.
    pub export_date: String,
    /// Always `"complete"` for full backups.
    pub export_type: String,
}

/// Import payload, validated as a whole before anything is applied.
///
/// Every key is optional; a present key replaces the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportDocument {
    pub teams: Option<Vec<Team>>,
    pub standalone_shooters: Option<Vec<Shooter>>,
    pub results: Option<Vec<ResultEntry>>,
    #[serde(default, deserialize_with = "present")]
    pub visible_team_ids: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present")]
    pub visible_shooter_ids: Option<Option<Vec<String>>>,
    pub available_disciplines: Option<Vec<String>>,
    pub selected_discipline: Option<Discipline>,
    pub selected_competition_type: Option<CompetitionType>,
    pub settings: Option<Settings>,
    /// Legacy settings exports carried the logo at top level.
    pub club_logo: Option<String>,
    pub export_type: Option<String>,
}

impl ImportDocument {
    pub fn is_complete(&self) -> bool {
        self.export_type.as_deref() == Some(EXPORT_TYPE_COMPLETE)
    }
}

// Unknown enum values in a stored document fall back to the default instead
// of discarding the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// Distinguishes an explicit `null` (Some(None)) from an absent key (None).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
