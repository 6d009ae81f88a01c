use serde::{Deserialize, Serialize};

use crate::{
    model::{ResultEntry, Shooter, Team},
    types::{COUNTING_SHOOTERS, CompetitionType, Discipline, MAX_TEAM_SIZE, SERIES_COUNT, ShooterId, TeamId},
};

use super::traits::CompetitionScorer;

/// Sums every Präzision and Duell entry of a shooter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrecisionDuelScorer;

impl CompetitionScorer for PrecisionDuelScorer {
    fn competition_type(&self) -> CompetitionType {
        CompetitionType::PrecisionDuel
    }

    fn shooter_total(&self, results: &[ResultEntry], shooter_id: &str, team_id: Option<&str>) -> u32 {
        results
            .iter()
            .filter(|r| r.shooter_id == shooter_id && r.team_id.as_deref() == team_id)
            .filter(|r| matches!(r.discipline, Discipline::Precision | Discipline::Duel))
            .map(ResultEntry::total)
            .sum()
    }
}

/// Scores the single Annex entry of a shooter.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnexScorer;

impl AnnexScorer {
    fn entry<'a>(results: &'a [ResultEntry], shooter_id: &str, team_id: Option<&str>) -> Option<&'a ResultEntry> {
        results
            .iter()
            .find(|r| r.matches_key(shooter_id, Discipline::Annex, team_id))
    }
}

impl CompetitionScorer for AnnexScorer {
    fn competition_type(&self) -> CompetitionType {
        CompetitionType::Annex
    }

    fn shooter_total(&self, results: &[ResultEntry], shooter_id: &str, team_id: Option<&str>) -> u32 {
        Self::entry(results, shooter_id, team_id)
            .map(ResultEntry::total)
            .unwrap_or(0)
    }

    fn series_sums(
        &self,
        results: &[ResultEntry],
        shooter_id: &str,
        team_id: Option<&str>,
    ) -> Option<[u32; SERIES_COUNT]> {
        Some(
            Self::entry(results, shooter_id, team_id)
                .map(ResultEntry::series_sums)
                .unwrap_or([0; SERIES_COUNT]),
        )
    }
}

static PRECISION_DUEL: PrecisionDuelScorer = PrecisionDuelScorer;
static ANNEX: AnnexScorer = AnnexScorer;

/// Scorer for the given competition type.
pub fn scorer_for(competition: CompetitionType) -> &'static dyn CompetitionScorer {
    match competition {
        CompetitionType::PrecisionDuel => &PRECISION_DUEL,
        CompetitionType::Annex => &ANNEX,
    }
}

/// One shooter's line in a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShooterScore {
    /// Shooter id.
    pub shooter_id: ShooterId,
    /// Display name.
    pub name: String,
    /// Score under the active competition type.
    pub total: u32,
    /// Annex series breakdown; `None` in Präzision/Duell mode.
    pub series: Option<[u32; SERIES_COUNT]>,
    /// Counts towards the team total.
    pub counted: bool,
    /// Lowest contributor of a full team.
    pub worst: bool,
}

/// Aggregated team result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    /// Team id.
    pub team_id: TeamId,
    /// Team name.
    pub name: String,
    /// Sum of the best three shooter totals.
    pub total: u32,
    /// Roster order is preserved.
    pub shooters: Vec<ShooterScore>,
    /// Lowest contributor, only for full teams.
    pub worst_shooter_id: Option<ShooterId>,
}

/// Score of a shooter in a team (or standalone) context.
pub fn shooter_total(
    results: &[ResultEntry],
    shooter_id: &str,
    team_id: Option<&str>,
    competition: CompetitionType,
) -> u32 {
    scorer_for(competition).shooter_total(results, shooter_id, team_id)
}

/// Indices of the best three totals, highest first; ties keep input order.
pub fn counting_indices(totals: &[u32]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..totals.len()).collect();
    // sort_by is stable
    idx.sort_by(|a, b| totals[*b].cmp(&totals[*a]));
    idx.truncate(COUNTING_SHOOTERS);
    idx
}

/// Sum of the three highest totals, or of all when fewer exist.
pub fn best_three_total(totals: &[u32]) -> u32 {
    counting_indices(totals).into_iter().map(|i| totals[i]).sum()
}

/// Index of the lowest total, only for full teams; first wins on ties.
pub fn worst_index(totals: &[u32]) -> Option<usize> {
    if totals.len() < MAX_TEAM_SIZE {
        return None;
    }
    totals
        .iter()
        .enumerate()
        .min_by_key(|(_, total)| **total)
        .map(|(i, _)| i)
}

/// Computes the standing of one team.
pub fn team_standing(team: &Team, results: &[ResultEntry], competition: CompetitionType) -> TeamStanding {
    let scorer = scorer_for(competition);
    let team_id = Some(team.id.as_str());

    let totals: Vec<u32> = team
        .shooters
        .iter()
        .map(|s| scorer.shooter_total(results, &s.id, team_id))
        .collect();
    let counting = counting_indices(&totals);
    let worst = worst_index(&totals);

    let shooters = team
        .shooters
        .iter()
        .enumerate()
        .map(|(i, s)| ShooterScore {
            shooter_id: s.id.clone(),
            name: s.name.clone(),
            total: totals[i],
            series: scorer.series_sums(results, &s.id, team_id),
            counted: counting.contains(&i),
            worst: worst == Some(i),
        })
        .collect();

    TeamStanding {
        team_id: team.id.clone(),
        name: team.name.clone(),
        total: counting.iter().map(|i| totals[*i]).sum(),
        shooters,
        worst_shooter_id: worst.map(|i| team.shooters[i].id.clone()),
    }
}

/// Team total under the given competition type.
pub fn team_total(team: &Team, results: &[ResultEntry], competition: CompetitionType) -> u32 {
    team_standing(team, results, competition).total
}

/// Lowest contributor of a team with at least four shooters.
pub fn worst_shooter<'a>(team: &'a Team, results: &[ResultEntry], competition: CompetitionType) -> Option<&'a Shooter> {
    let scorer = scorer_for(competition);
    let totals: Vec<u32> = team
        .shooters
        .iter()
        .map(|s| scorer.shooter_total(results, &s.id, Some(&team.id)))
        .collect();
    worst_index(&totals).map(|i| &team.shooters[i])
}

/// Standings of `teams`, highest total first; ties keep input order.
pub fn rank_teams<'a>(
    teams: impl IntoIterator<Item = &'a Team>,
    results: &[ResultEntry],
    competition: CompetitionType,
) -> Vec<TeamStanding> {
    let mut out: Vec<TeamStanding> = teams
        .into_iter()
        .map(|t| team_standing(t, results, competition))
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total));
    out
}

/// Standalone shooter ranking, highest total first; ties keep input order.
pub fn rank_standalone<'a>(
    shooters: impl IntoIterator<Item = &'a Shooter>,
    results: &[ResultEntry],
    competition: CompetitionType,
) -> Vec<ShooterScore> {
    let scorer = scorer_for(competition);
    let mut out: Vec<ShooterScore> = shooters
        .into_iter()
        .map(|s| ShooterScore {
            shooter_id: s.id.clone(),
            name: s.name.clone(),
            total: scorer.shooter_total(results, &s.id, None),
            series: scorer.series_sums(results, &s.id, None),
            counted: true,
            worst: false,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Shots;

    fn entry(team: Option<&str>, shooter: &str, d: Discipline, values: &[u8]) -> ResultEntry {
        ResultEntry::new(team.map(str::to_string), shooter, d, Shots::from_values(values))
    }

    #[test]
    fn best_three_ignores_lowest() {
        assert_eq!(best_three_total(&[50, 40, 30, 20]), 120);
        assert_eq!(best_three_total(&[20, 50, 30, 40]), 120);
        assert_eq!(best_three_total(&[7, 9]), 16);
        assert_eq!(best_three_total(&[]), 0);
    }

    #[test]
    fn ties_keep_roster_order() {
        assert_eq!(counting_indices(&[10, 10, 10, 10]), vec![0, 1, 2]);
        assert_eq!(worst_index(&[10, 5, 5, 10]), Some(1));
        assert_eq!(worst_index(&[10, 5, 5]), None);
    }

    #[test]
    fn precision_duel_sums_both_disciplines_in_context() {
        let results = vec![
            entry(Some("t1"), "s1", Discipline::Precision, &[10, 10]),
            entry(Some("t1"), "s1", Discipline::Duel, &[5]),
            entry(Some("t1"), "s1", Discipline::Annex, &[3, 3]),
            entry(None, "s1", Discipline::Precision, &[9]),
        ];
        assert_eq!(shooter_total(&results, "s1", Some("t1"), CompetitionType::PrecisionDuel), 25);
        assert_eq!(shooter_total(&results, "s1", None, CompetitionType::PrecisionDuel), 9);
        assert_eq!(shooter_total(&results, "s1", Some("t1"), CompetitionType::Annex), 6);
    }

    #[test]
    fn missing_entry_scores_like_empty_entry() {
        let empty = vec![entry(None, "s1", Discipline::Annex, &[])];
        assert_eq!(shooter_total(&[], "s1", None, CompetitionType::Annex), 0);
        assert_eq!(shooter_total(&empty, "s1", None, CompetitionType::Annex), 0);
        assert_eq!(
            scorer_for(CompetitionType::Annex).series_sums(&[], "s1", None),
            scorer_for(CompetitionType::Annex).series_sums(&empty, "s1", None),
        );
    }

    #[test]
    fn annex_standing_exposes_series_without_changing_total() {
        let team = Team::with_id("t1", "Annex", vec![Shooter::with_id("a", "A")]);
        let mut shots = Shots::empty();
        for i in 0..40 {
            shots.set(i, Some(if i < 8 { 3 } else { 1 }));
        }
        let results = vec![ResultEntry::new(Some("t1".into()), "a", Discipline::Annex, shots)];
        let standing = team_standing(&team, &results, CompetitionType::Annex);
        assert_eq!(standing.total, 56);
        assert_eq!(standing.shooters[0].series, Some([24, 8, 8, 8, 8]));
    }

    #[test]
    fn full_team_flags_worst() {
        let team = Team::with_id(
            "t1",
            "Vier",
            ["a", "b", "c", "d"].iter().map(|id| Shooter::with_id(*id, *id)).collect(),
        );
        let results = vec![
            entry(Some("t1"), "a", Discipline::Precision, &[10, 10, 10, 10, 10]),
            entry(Some("t1"), "b", Discipline::Precision, &[10, 10, 10, 10]),
            entry(Some("t1"), "c", Discipline::Duel, &[10, 10, 10]),
            entry(Some("t1"), "d", Discipline::Duel, &[10, 10]),
        ];
        let standing = team_standing(&team, &results, CompetitionType::PrecisionDuel);
        assert_eq!(standing.total, 120);
        assert_eq!(standing.worst_shooter_id.as_deref(), Some("d"));
        assert!(standing.shooters[3].worst && !standing.shooters[3].counted);
        assert_eq!(
            worst_shooter(&team, &results, CompetitionType::PrecisionDuel).map(|s| s.id.as_str()),
            Some("d")
        );
    }

    #[test]
    fn ranking_is_stable_and_descending() {
        let teams = vec![
            Team::with_id("t1", "Eins", vec![Shooter::with_id("a", "A")]),
            Team::with_id("t2", "Zwei", vec![Shooter::with_id("b", "B")]),
            Team::with_id("t3", "Drei", vec![Shooter::with_id("c", "C")]),
        ];
        let results = vec![
            entry(Some("t1"), "a", Discipline::Precision, &[5]),
            entry(Some("t2"), "b", Discipline::Precision, &[9]),
            entry(Some("t3"), "c", Discipline::Precision, &[5]),
        ];
        let ids: Vec<_> = rank_teams(&teams, &results, CompetitionType::PrecisionDuel)
            .into_iter()
            .map(|t| t.team_id)
            .collect();
        assert_eq!(ids, vec!["t2", "t1", "t3"]);
    }
}
