#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Tally scoreboard.
//!
//! This crate hosts the scoreboard and score table state, the durable
//! key-value store, the write-through persistence mirror and configuration
//! used by the terminal UI and any future frontends.

pub mod config;
pub mod error;
pub mod mirror;
pub mod models;
pub mod numeric;
pub mod scoreboard;
pub mod store;
pub mod table;

pub use config::{AppConfig, StartView};
pub use error::{SnapshotError, StoreError};
pub use mirror::{Applied, Mirror, Persisted, RestoreOutcome};
pub use models::{Player, PlayerId};
pub use numeric::{parse_int, THRESHOLD};
pub use scoreboard::{ScoreOutcome, Scoreboard};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use table::ScoreTable;
