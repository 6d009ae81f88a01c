//! Stateless input checks applied before entities enter the store.

use thiserror::Error;

use crate::{
    model::Team,
    types::{CompetitionType, MAX_TEAM_SIZE, SHOT_COUNT},
};

/// Maximum characters in a shooter or team name.
pub const MAX_NAME_LEN: usize = 50;
/// Maximum characters in a discipline name.
pub const MAX_DISCIPLINE_NAME_LEN: usize = 100;

/// Rejected input, with a message suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name is empty after trimming.
    #[error("Name darf nicht leer sein")]
    EmptyName,
    /// Name exceeds [`MAX_NAME_LEN`] characters.
    #[error("Name darf maximal {max} Zeichen lang sein", max = MAX_NAME_LEN)]
    NameTooLong,
    /// Name contains script markup or an event handler.
    #[error("Name enthält unzulässige Zeichen")]
    UnsafeContent,
    /// Discipline name is empty after trimming.
    #[error("Disziplinname darf nicht leer sein")]
    EmptyDiscipline,
    /// Discipline name exceeds [`MAX_DISCIPLINE_NAME_LEN`] characters.
    #[error("Disziplinname darf maximal {max} Zeichen lang sein", max = MAX_DISCIPLINE_NAME_LEN)]
    DisciplineTooLong,
    /// Shot input is not an integer.
    #[error("Ungültiger Schusswert: {0:?}")]
    NotAnInteger(String),
    /// Shot value outside `0..=max`.
    #[error("Schusswert muss zwischen 0 und {max} liegen")]
    ShotOutOfRange {
        /// Parsed value.
        value: i64,
        /// Highest allowed value.
        max: u8,
    },
    /// Shot slot index out of range.
    #[error("Schussindex {0} liegt außerhalb von 0..{count}", count = SHOT_COUNT)]
    ShotIndex(usize),
    /// More than [`MAX_TEAM_SIZE`] shooters.
    #[error("Eine Mannschaft darf maximal {max} Schützen haben", max = MAX_TEAM_SIZE)]
    RosterTooLarge,
    /// Same shooter twice in one roster.
    #[error("Schütze {0} ist mehrfach in der Mannschaft")]
    DuplicateShooter(String),
    /// Required field is empty.
    #[error("{0} fehlt")]
    MissingField(&'static str),
}

/// Validates a shooter or team name and returns it trimmed.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if contains_script(trimmed) {
        return Err(ValidationError::UnsafeContent);
    }
    Ok(trimmed.to_string())
}

/// Validates a discipline name and returns it trimmed.
pub fn validate_discipline_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDiscipline);
    }
    if trimmed.chars().count() > MAX_DISCIPLINE_NAME_LEN {
        return Err(ValidationError::DisciplineTooLong);
    }
    Ok(trimmed.to_string())
}

/// Parses a shot value bounded by the competition type of `discipline_name`.
pub fn validate_shot_value(input: &str, discipline_name: &str) -> Result<u8, ValidationError> {
    let value: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotAnInteger(input.to_string()))?;
    let max = CompetitionType::for_discipline_name(discipline_name).max_shot_value();
    if value < 0 || value > i64::from(max) {
        return Err(ValidationError::ShotOutOfRange { value, max });
    }
    Ok(value as u8)
}

/// Checks a roster at the edit boundary: size, unique ids, valid names.
pub fn validate_roster(team: &Team) -> Result<(), ValidationError> {
    if team.shooters.len() > MAX_TEAM_SIZE {
        return Err(ValidationError::RosterTooLarge);
    }
    for (idx, shooter) in team.shooters.iter().enumerate() {
        validate_name(&shooter.name)?;
        if team.shooters[..idx].iter().any(|s| s.id == shooter.id) {
            return Err(ValidationError::DuplicateShooter(shooter.name.clone()));
        }
    }
    Ok(())
}

fn contains_script(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<script") || lower.contains("javascript:") || has_event_handler(&lower)
}

// Matches `on<letters>` followed by optional whitespace and `=`.
fn has_event_handler(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    let mut start = 0;
    while let Some(pos) = lower[start..].find("on") {
        let at = start + pos;
        let boundary = at == 0 || !bytes[at - 1].is_ascii_alphanumeric();
        let mut i = at + 2;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let has_letters = i > at + 2;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if boundary && has_letters && i < bytes.len() && bytes[i] == b'=' {
            return true;
        }
        start = at + 2;
    }
    false
}
