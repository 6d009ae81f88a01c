use crate::{
    model::ResultEntry,
    types::{CompetitionType, SERIES_COUNT},
};

/// Per-shooter aggregation rule for one competition type.
///
/// Implementations must treat a missing result entry exactly like an entry
/// with every slot unset.
pub trait CompetitionScorer: Send + Sync + 'static {
    /// Regime this scorer implements.
    fn competition_type(&self) -> CompetitionType;

    /// Score of `shooter_id` in the given team context (`None` = standalone).
    fn shooter_total(&self, results: &[ResultEntry], shooter_id: &str, team_id: Option<&str>) -> u32;

    /// Per-series breakdown, for regimes that score in series.
    fn series_sums(
        &self,
        _results: &[ResultEntry],
        _shooter_id: &str,
        _team_id: Option<&str>,
    ) -> Option<[u32; SERIES_COUNT]> {
        None
    }
}
