//! Ranking totals under the two competition formats.

/// Aggregation strategies, standings, and ranking helpers.
pub mod scoring;
/// Scorer trait implemented by each competition format.
pub mod traits;
