//! Single-match ingestion: fetch, parse, resolve, persist.
//!
//! The pipeline for one match is a straight line through the components:
//! fetch the protocol page, parse its tables, interpret rows as events,
//! resolve names, then replace the match's persisted event set. Only the
//! endpoints can fail — a missing protocol URL before the fetch, the fetch
//! itself, or the persistence step. Everything in between is tolerant:
//! malformed tables produce fewer rows and unresolved names produce
//! diagnostics, never errors. Re-running with unchanged source HTML yields
//! an identical event set because persistence deletes before inserting.

use serde::Serialize;

use crate::db::{Db, DbError, MatchRow};
use crate::events::{to_parsed_events, EventType};
use crate::fetch::{FetchError, ProtocolClient};
use crate::materialize::materialize;
use crate::protocol::parse_protocol;
use crate::resolve::{PlayerLookup, TeamLookup};

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("match {0} has no protocol url")]
    MissingProtocolUrl(i64),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to persist events: {0}")]
    Store(#[from] DbError),
}

/// What one match's ingestion produced, for run summaries.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestOutcome {
    pub match_id: i64,
    pub goal_rows: usize,
    pub penalty_rows: usize,
    pub events_inserted: usize,
    pub goals: usize,
    pub assists: usize,
    pub penalties: usize,
    pub unresolved_teams: Vec<String>,
    pub unresolved_players: Vec<String>,
}

/// Ingest one match end to end.
///
/// A match without a protocol URL aborts before fetching. A 404 from the
/// source is treated as an empty protocol: ingestion completes with zero
/// rows and the caller decides what that means.
pub async fn ingest_match(
    db: &mut Db,
    client: &ProtocolClient,
    m: &MatchRow,
    teams: &TeamLookup,
    players: &mut PlayerLookup,
) -> Result<IngestOutcome, IngestError> {
    let url = m
        .protocol_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or(IngestError::MissingProtocolUrl(m.id))?;

    let html = client.fetch_protocol(url).await?.unwrap_or_default();
    ingest_html(db, m.id, &html, teams, players)
}

/// The pipeline below the fetch, testable without a network.
pub fn ingest_html(
    db: &mut Db,
    match_id: i64,
    html: &str,
    teams: &TeamLookup,
    players: &mut PlayerLookup,
) -> Result<IngestOutcome, IngestError> {
    let tables = parse_protocol(html);
    if tables.goal_rows.is_empty() && tables.penalty_rows.is_empty() {
        tracing::warn!(match_id, "no goal or penalty tables found in protocol");
    }

    let events = to_parsed_events(&tables);
    let materialized = materialize(match_id, &events, teams, players);

    if !materialized.unresolved_teams.is_empty() {
        tracing::warn!(
            match_id,
            count = materialized.unresolved_teams.len(),
            sample = ?materialized.unresolved_teams.first(),
            "unresolved team references"
        );
    }
    if !materialized.unresolved_players.is_empty() {
        tracing::warn!(
            match_id,
            count = materialized.unresolved_players.len(),
            sample = ?materialized.unresolved_players.first(),
            "unresolved player references, events dropped"
        );
    }

    db.replace_match_events(match_id, &materialized.rows)?;

    let count_of = |t: EventType| {
        materialized
            .rows
            .iter()
            .filter(|r| r.event_type == t)
            .count()
    };
    let outcome = IngestOutcome {
        match_id,
        goal_rows: tables.goal_rows.len(),
        penalty_rows: tables.penalty_rows.len(),
        events_inserted: materialized.rows.len(),
        goals: count_of(EventType::Goal),
        assists: count_of(EventType::Assist),
        penalties: count_of(EventType::Minor2) + count_of(EventType::DoubleMinor),
        unresolved_teams: materialized.unresolved_teams,
        unresolved_players: materialized.unresolved_players,
    };
    tracing::info!(
        match_id,
        events = outcome.events_inserted,
        goals = outcome.goals,
        assists = outcome.assists,
        penalties = outcome.penalties,
        "match ingested"
    );
    Ok(outcome)
}
