//! Match-protocol ingestion and reconciliation pipeline for a floorball
//! statistics source.
//!
//! Fetches published match-report pages, extracts goal and penalty events
//! from their HTML tables, resolves free-text team and player names to
//! store identifiers, and persists normalized event rows idempotently.
//! The CLI crate drives this library as a batch orchestrator and a
//! reconciliation scanner for under-reported matches.

pub mod config;
pub mod db;
pub mod events;
pub mod fetch;
pub mod ingest;
pub mod materialize;
pub mod normalize;
pub mod points;
pub mod protocol;
pub mod resolve;

pub use config::{Config, ConfigError};
pub use db::{Db, DbError, EventCounts, MatchRow, PlayerRow, StoredEvent, TeamRow};
pub use events::{to_parsed_events, EventType, ParsedEvent};
pub use fetch::{FetchError, ProtocolClient};
pub use ingest::{ingest_html, ingest_match, IngestError, IngestOutcome};
pub use materialize::{materialize, InsertableEvent, Materialized};
pub use normalize::normalize;
pub use points::{CommandPointsStep, PointsError};
pub use protocol::{parse_period, parse_protocol, parse_time_to_seconds, ProtocolTables};
pub use resolve::{PlayerLookup, ResolutionStats, TeamLookup};
