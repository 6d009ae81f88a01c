//! Shared primitive IDs, disciplines, and competition-type enums.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier of a shooter (team member or standalone).
pub type ShooterId = String;
/// Identifier of a team.
pub type TeamId = String;
/// Identifier of a result entry.
pub type ResultId = String;

/// Number of shot slots recorded per result entry.
pub const SHOT_COUNT: usize = 40;
/// Number of shots in one Annex series.
pub const SERIES_LEN: usize = 8;
/// Number of Annex series in a full record.
pub const SERIES_COUNT: usize = SHOT_COUNT / SERIES_LEN;
/// Maximum roster size accepted at the edit boundary.
pub const MAX_TEAM_SIZE: usize = 4;
/// Number of best shooters that count towards a team total.
pub const COUNTING_SHOOTERS: usize = 3;

const ID_SUFFIX_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Scored event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discipline {
    /// Precision shooting.
    #[serde(rename = "Präzision")]
    Precision,
    /// Duel shooting.
    #[serde(rename = "Duell")]
    Duel,
    /// Annex target, scored in five series of eight shots.
    #[serde(rename = "Annex Scheibe")]
    Annex,
}

impl Discipline {
    /// All disciplines in their canonical order.
    pub const ALL: [Discipline; 3] = [Discipline::Precision, Discipline::Duel, Discipline::Annex];

    /// Display and storage name.
    pub fn name(self) -> &'static str {
        match self {
            Discipline::Precision => "Präzision",
            Discipline::Duel => "Duell",
            Discipline::Annex => "Annex Scheibe",
        }
    }

    /// Parses a stored discipline name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name.trim())
    }

    /// Competition type this discipline is scored under.
    pub fn competition_type(self) -> CompetitionType {
        match self {
            Discipline::Precision | Discipline::Duel => CompetitionType::PrecisionDuel,
            Discipline::Annex => CompetitionType::Annex,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scoring regime governing which disciplines apply and the shot bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetitionType {
    /// Präzision and Duell results summed per shooter.
    #[serde(rename = "Präzision/Duell")]
    PrecisionDuel,
    /// Single Annex target per shooter.
    #[serde(rename = "Annex Scheibe")]
    Annex,
}

impl CompetitionType {
    /// Display and storage name.
    pub fn name(self) -> &'static str {
        match self {
            CompetitionType::PrecisionDuel => "Präzision/Duell",
            CompetitionType::Annex => "Annex Scheibe",
        }
    }

    /// Competition type for a free-form discipline name.
    ///
    /// Names that are not a known discipline fall into Präzision/Duell.
    pub fn for_discipline_name(name: &str) -> Self {
        Discipline::from_name(name)
            .map(Discipline::competition_type)
            .unwrap_or(CompetitionType::PrecisionDuel)
    }

    /// Highest value a single shot may take under this regime.
    pub fn max_shot_value(self) -> u8 {
        match self {
            CompetitionType::PrecisionDuel => 10,
            CompetitionType::Annex => 3,
        }
    }

    /// Disciplines whose results count under this regime.
    pub fn disciplines(self) -> &'static [Discipline] {
        match self {
            CompetitionType::PrecisionDuel => &[Discipline::Precision, Discipline::Duel],
            CompetitionType::Annex => &[Discipline::Annex],
        }
    }

    /// Discipline selected when switching to this regime.
    pub fn default_discipline(self) -> Discipline {
        match self {
            CompetitionType::PrecisionDuel => Discipline::Precision,
            CompetitionType::Annex => Discipline::Annex,
        }
    }
}

impl fmt::Display for CompetitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generates an id from a base-36 millisecond timestamp and a random suffix.
pub fn generate_id() -> String {
    let ts = to_base36(now_ms());
    let suffix = nanoid::nanoid!(9, &ID_SUFFIX_ALPHABET);
    format!("{ts}{suffix}")
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn to_base36(mut v: u64) -> String {
    if v == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while v > 0 {
        out.push(ID_SUFFIX_ALPHABET[(v % 36) as usize]);
        v /= 36;
    }
    out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discipline_names_round_trip() {
        for d in Discipline::ALL {
            assert_eq!(Discipline::from_name(d.name()), Some(d));
        }
        assert_eq!(Discipline::from_name("Luftgewehr"), None);
    }

    #[test]
    fn discipline_maps_to_competition_type() {
        assert_eq!(Discipline::Precision.competition_type(), CompetitionType::PrecisionDuel);
        assert_eq!(Discipline::Duel.competition_type(), CompetitionType::PrecisionDuel);
        assert_eq!(Discipline::Annex.competition_type(), CompetitionType::Annex);
        assert_eq!(
            CompetitionType::for_discipline_name("Sonstiges"),
            CompetitionType::PrecisionDuel
        );
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&Discipline::Annex).unwrap();
        assert_eq!(json, "\"Annex Scheibe\"");
        let ct: CompetitionType = serde_json::from_str("\"Präzision/Duell\"").unwrap();
        assert_eq!(ct, CompetitionType::PrecisionDuel);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: hashbrown::HashSet<String> = (0..500).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn base36_encodes() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
