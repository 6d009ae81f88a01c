//! Authoritative store and its durable document format.

/// Durable, export, and import document shapes.
pub mod document;
/// The scorebook store: CRUD, cascades, persistence, logo handling.
pub mod store;
