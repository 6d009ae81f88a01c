//! Runtime event stream payloads.

use crate::types::{CompetitionType, Discipline, ResultId, ShooterId};

/// Events emitted from the single-writer scorebook task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScorebookEvent {
    /// A team was added, changed, or removed.
    TeamsChanged,
    /// A standalone shooter was added, changed, or removed.
    ShootersChanged,
    /// A result of this shooter was saved.
    ResultsChanged {
        /// Shooter whose result changed.
        shooter_id: ShooterId,
    },
    /// A single result was deleted.
    ResultDeleted {
        /// Deleted result id.
        result_id: ResultId,
    },
    /// The scored discipline changed.
    SelectionChanged {
        /// Newly selected discipline.
        discipline: Discipline,
        /// Competition type derived from it.
        competition_type: CompetitionType,
    },
    /// The discipline list was edited.
    DisciplinesChanged,
    /// A settings key or the label layout was written.
    SettingsChanged,
    /// A visibility filter was replaced.
    FiltersChanged,
    /// The club logo was replaced.
    LogoChanged {
        /// True when this is the background-compressed replacement.
        compressed: bool,
    },
    /// The club logo was removed.
    LogoDeleted,
    /// An import was applied.
    Imported,
    /// All data was cleared.
    Reset,
    /// A write failed even after compressing the logo.
    StorageFull {
        /// Displayable error message.
        message: String,
    },
}
