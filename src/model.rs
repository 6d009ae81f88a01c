//! Shooter, team, and result-entry records.

use serde::{Deserialize, Serialize};

use crate::{
    types::{
        Discipline, ResultId, SERIES_COUNT, SERIES_LEN, SHOT_COUNT, ShooterId, TeamId,
        generate_id,
    },
    validate::{ValidationError, validate_shot_value},
};

/// An individual competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shooter {
    /// Stable shooter identifier.
    pub id: ShooterId,
    /// Display name.
    pub name: String,
}

impl Shooter {
    /// Creates a shooter with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(generate_id(), name)
    }

    /// Creates a shooter with an existing id.
    pub fn with_id(id: impl Into<ShooterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Serializes to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Deserializes from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// A roster of shooters scored together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable team identifier.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Ordered roster; the order breaks scoring ties.
    #[serde(default)]
    pub shooters: Vec<Shooter>,
}

impl Team {
    /// Creates a team with a freshly generated id.
    pub fn new(name: impl Into<String>, shooters: Vec<Shooter>) -> Self {
        Self::with_id(generate_id(), name, shooters)
    }

    /// Creates a team with an existing id.
    pub fn with_id(id: impl Into<TeamId>, name: impl Into<String>, shooters: Vec<Shooter>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            shooters,
        }
    }

    /// Returns the roster member with `shooter_id`.
    pub fn shooter(&self, shooter_id: &str) -> Option<&Shooter> {
        self.shooters.iter().find(|s| s.id == shooter_id)
    }

    /// Serializes to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Deserializes from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Fixed-length shot record; `None` marks an unset slot.
///
/// Serialized as a JSON array of numbers and `null`. Shorter arrays are padded
/// with unset slots, longer arrays are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<u8>>", into = "Vec<Option<u8>>")]
pub struct Shots(Vec<Option<u8>>);

impl Shots {
    /// All slots unset.
    pub fn empty() -> Self {
        Self(vec![None; SHOT_COUNT])
    }

    /// Builds a record from the given leading values; the rest stays unset.
    pub fn from_values(values: &[u8]) -> Self {
        let mut shots = Self::empty();
        for (slot, v) in shots.0.iter_mut().zip(values) {
            *slot = Some(*v);
        }
        shots
    }

    /// Value at `idx`, `None` if unset or out of range.
    pub fn get(&self, idx: usize) -> Option<u8> {
        self.0.get(idx).copied().flatten()
    }

    /// Sets or clears slot `idx`. Out-of-range indices are ignored.
    pub fn set(&mut self, idx: usize, value: Option<u8>) {
        if let Some(slot) = self.0.get_mut(idx) {
            *slot = value;
        }
    }

    /// Read-only slot view.
    pub fn as_slice(&self) -> &[Option<u8>] {
        &self.0
    }

    /// Sum of all set slots.
    pub fn total(&self) -> u32 {
        self.0.iter().flatten().map(|v| u32::from(*v)).sum()
    }

    /// Sums of the consecutive 8-slot windows.
    pub fn series_sums(&self) -> [u32; SERIES_COUNT] {
        let mut sums = [0u32; SERIES_COUNT];
        for (sum, window) in sums.iter_mut().zip(self.0.chunks(SERIES_LEN)) {
            *sum = window.iter().flatten().map(|v| u32::from(*v)).sum();
        }
        sums
    }

    /// Number of set slots.
    pub fn filled(&self) -> usize {
        self.0.iter().filter(|s| s.is_some()).count()
    }
}

impl Default for Shots {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Vec<Option<u8>>> for Shots {
    type Error = String;

    fn try_from(mut value: Vec<Option<u8>>) -> Result<Self, Self::Error> {
        if value.len() > SHOT_COUNT {
            return Err(format!(
                "shot record has {} slots, at most {SHOT_COUNT} allowed",
                value.len()
            ));
        }
        value.resize(SHOT_COUNT, None);
        Ok(Self(value))
    }
}

impl From<Shots> for Vec<Option<u8>> {
    fn from(value: Shots) -> Self {
        value.0
    }
}

/// One shooter's recorded shots for one discipline and team context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    /// Stable result identifier.
    pub id: ResultId,
    /// Owning team, `None` for standalone shooters.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Shooter the shots belong to.
    pub shooter_id: ShooterId,
    /// Discipline the shots were fired in.
    pub discipline: Discipline,
    /// Shot slots.
    #[serde(default)]
    pub shots: Shots,
}

impl ResultEntry {
    /// Creates an entry with a freshly generated id.
    pub fn new(
        team_id: Option<TeamId>,
        shooter_id: impl Into<ShooterId>,
        discipline: Discipline,
        shots: Shots,
    ) -> Self {
        Self::with_id(generate_id(), team_id, shooter_id, discipline, shots)
    }

    /// Creates an entry with an existing id.
    pub fn with_id(
        id: impl Into<ResultId>,
        team_id: Option<TeamId>,
        shooter_id: impl Into<ShooterId>,
        discipline: Discipline,
        shots: Shots,
    ) -> Self {
        Self {
            id: id.into(),
            team_id,
            shooter_id: shooter_id.into(),
            discipline,
            shots,
        }
    }

    /// Sum of all set shot values.
    pub fn total(&self) -> u32 {
        self.shots.total()
    }

    /// Per-series sums for the Annex layout.
    pub fn series_sums(&self) -> [u32; SERIES_COUNT] {
        self.shots.series_sums()
    }

    /// True when this entry occupies the `(shooter, discipline, team)` slot.
    pub fn matches_key(&self, shooter_id: &str, discipline: Discipline, team_id: Option<&str>) -> bool {
        self.shooter_id == shooter_id
            && self.discipline == discipline
            && self.team_id.as_deref() == team_id
    }

    /// Parses and stores one shot, bounded by this entry's discipline.
    pub fn set_shot(&mut self, idx: usize, input: &str) -> Result<u8, ValidationError> {
        if idx >= SHOT_COUNT {
            return Err(ValidationError::ShotIndex(idx));
        }
        let value = validate_shot_value(input, self.discipline.name())?;
        self.shots.set(idx, Some(value));
        Ok(value)
    }

    /// Serializes to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Deserializes from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_slots_sum_to_zero() {
        let entry = ResultEntry::new(None, "s1", Discipline::Precision, Shots::empty());
        assert_eq!(entry.total(), 0);
        assert_eq!(entry.series_sums(), [0; SERIES_COUNT]);
    }

    #[test]
    fn series_windows_cover_eight_slots() {
        let values: Vec<u8> = (0..SHOT_COUNT).map(|i| (i / SERIES_LEN) as u8).collect();
        let shots = Shots::from_values(&values);
        assert_eq!(shots.series_sums(), [0, 8, 16, 24, 32]);
        assert_eq!(shots.series_sums().iter().sum::<u32>(), shots.total());
    }

    #[test]
    fn short_arrays_are_padded_and_long_rejected() {
        let shots: Shots = serde_json::from_str("[1, null, 3]").unwrap();
        assert_eq!(shots.as_slice().len(), SHOT_COUNT);
        assert_eq!(shots.total(), 4);

        let long = serde_json::to_string(&vec![1u8; SHOT_COUNT + 1]).unwrap();
        assert!(serde_json::from_str::<Shots>(&long).is_err());
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let shooter = Shooter::new("Anna");
        assert_eq!(Shooter::from_json(shooter.to_json()).unwrap(), shooter);

        let team = Team::new("SV Nord", vec![shooter.clone(), Shooter::new("Ben")]);
        assert_eq!(Team::from_json(team.to_json()).unwrap(), team);

        let mut shots = Shots::from_values(&[10, 9, 8]);
        shots.set(20, Some(7));
        let entry = ResultEntry::new(Some(team.id.clone()), shooter.id, Discipline::Duel, shots);
        assert_eq!(ResultEntry::from_json(entry.to_json()).unwrap(), entry);
    }

    #[test]
    fn result_json_uses_camel_case_and_null_team() {
        let entry = ResultEntry::with_id("r1", None, "s1", Discipline::Annex, Shots::empty());
        let json = entry.to_json();
        assert_eq!(json["teamId"], serde_json::Value::Null);
        assert_eq!(json["shooterId"], "s1");
        assert_eq!(json["discipline"], "Annex Scheibe");
    }

    #[test]
    fn set_shot_respects_discipline_bounds() {
        let mut annex = ResultEntry::new(None, "s1", Discipline::Annex, Shots::empty());
        assert_eq!(annex.set_shot(0, "3").unwrap(), 3);
        assert!(annex.set_shot(1, "4").is_err());
        assert!(annex.set_shot(SHOT_COUNT, "1").is_err());
        assert_eq!(annex.total(), 3);
    }
}
