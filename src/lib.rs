//! Shooting-competition scorebook: teams, shooters and results persisted in a
//! single durable slot, with team rankings under two competition formats.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::Scorebook`]:
//! ```
//! use scorebook::{
//!     core::store::{Scorebook, StoreConfig},
//!     model::{ResultEntry, Shooter, Shots, Team},
//!     persist::MemorySlot,
//!     types::Discipline,
//! };
//!
//! let mut store = Scorebook::open(Box::new(MemorySlot::new()), StoreConfig::default());
//! let anna = Shooter::new("Anna");
//! let team_id = store
//!     .add_team(Team::new("SV Nord", vec![anna.clone()]))
//!     .expect("add team");
//! store
//!     .save_result(ResultEntry::new(
//!         Some(team_id.clone()),
//!         anna.id.clone(),
//!         Discipline::Precision,
//!         Shots::from_values(&[10, 9, 8]),
//!     ))
//!     .expect("save result");
//! assert_eq!(store.team_standing(&team_id).map(|s| s.total), Some(27));
//! ```
//!
//! Runtime usage with a SQLite slot:
//! ```no_run
//! use scorebook::{
//!     core::store::{Scorebook, StoreConfig},
//!     model::Shooter,
//!     persist::sqlite::SqliteSlot,
//!     runtime::handle::{spawn_scorebook, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let slot = SqliteSlot::open("scorebook.db", Some(5_000_000)).expect("open sqlite");
//! let store = Scorebook::open(Box::new(slot), StoreConfig::default());
//! let handle = spawn_scorebook(store, RuntimeConfig::default());
//! let _id = handle
//!     .add_standalone_shooter(Shooter::new("Ben"))
//!     .await
//!     .expect("add shooter");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Authoritative store and durable document format.
pub mod core;
/// Scoring strategies and standings.
pub mod engine;
/// Visibility filters over teams and shooters.
pub mod filter;
/// Club logo encoding and compression.
pub mod logo;
/// Shooter, team, and result records.
pub mod model;
/// Durable slot abstraction with memory and SQLite backends.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Open settings bag and typed accessors.
pub mod settings;
/// Shared ids, enums, and constants.
pub mod types;
/// Input validation.
pub mod validate;
