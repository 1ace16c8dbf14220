//! SQLite interface to the floorstats store.
//!
//! Rosters and match metadata are read-only here; the one write path this
//! pipeline owns is `match_events`, replaced wholesale per match inside a
//! single transaction. The remaining tables belong to out-of-scope
//! collaborators (schedule sync, goalie-stat ingestion, point computation)
//! and are only read for selection and reporting.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::events::EventType;
use crate::materialize::InsertableEvent;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
}

/// One row of the `matches` table.
#[derive(Debug, Clone)]
pub struct MatchRow {
    pub id: i64,
    pub external_id: String,
    pub protocol_url: Option<String>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub status: String,
    pub season: Option<String>,
    pub date: Option<NaiveDate>,
}

/// One row of the `teams` table.
#[derive(Debug, Clone)]
pub struct TeamRow {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub external_id: Option<String>,
}

/// One row of the `players` table.
#[derive(Debug, Clone)]
pub struct PlayerRow {
    pub id: i64,
    pub name: String,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub jersey_number: Option<i64>,
    pub external_id: Option<String>,
}

/// Per-match event counts used by the reconciliation scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCounts {
    pub total: i64,
    pub goals: i64,
}

pub struct Db {
    conn: Connection,
}

const MATCH_COLUMNS: &str = "id, external_id, protocol_url, home_team_id, away_team_id, \
     home_score, away_score, status, season, date";

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    // ---- roster reads -------------------------------------------------

    pub fn all_teams(&self) -> Result<Vec<TeamRow>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, code, external_id FROM teams")?;
        let rows = stmt.query_map([], |row| {
            Ok(TeamRow {
                id: row.get(0)?,
                name: row.get(1)?,
                code: row.get(2)?,
                external_id: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn all_players(&self) -> Result<Vec<PlayerRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, team_id, team_name, jersey_number, external_id FROM players",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PlayerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                team_id: row.get(2)?,
                team_name: row.get(3)?,
                jersey_number: row.get(4)?,
                external_id: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- match reads --------------------------------------------------

    pub fn match_by_id(&self, id: i64) -> Result<Option<MatchRow>, DbError> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], match_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn match_by_external_id(&self, external_id: &str) -> Result<Option<MatchRow>, DbError> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE external_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![external_id], match_from_row)
            .optional()?;
        Ok(row)
    }

    /// Finished matches needing (re-)ingestion: no recorded events, no
    /// goalie-stat rows, or a date inside the trailing recency window.
    /// The recency clause exists because protocol pages are sometimes
    /// edited after initial publication.
    pub fn matches_needing_ingest(&self, cutoff: NaiveDate) -> Result<Vec<MatchRow>, DbError> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches m
             WHERE m.status = 'finished'
               AND (
                 NOT EXISTS (SELECT 1 FROM match_events e WHERE e.match_id = m.id)
                 OR NOT EXISTS (SELECT 1 FROM goalie_stats g WHERE g.match_id = m.id)
                 OR (m.date IS NOT NULL AND m.date >= ?1)
               )
             ORDER BY m.date, m.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![cutoff.to_string()], match_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every finished match of one season, for backfill.
    pub fn finished_matches_for_season(&self, season: &str) -> Result<Vec<MatchRow>, DbError> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status = 'finished' AND season = ?1
             ORDER BY date, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![season], match_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Finished matches dated on or after the cutoff (scanner window).
    pub fn finished_matches_since(&self, cutoff: NaiveDate) -> Result<Vec<MatchRow>, DbError> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status = 'finished' AND date IS NOT NULL AND date >= ?1
             ORDER BY date, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![cutoff.to_string()], match_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- event writes -------------------------------------------------

    /// Replace the full event set of one match: delete by match id, then
    /// bulk insert, in one transaction. Re-running with the same rows is
    /// idempotent; a crash leaves either the old or the new set visible,
    /// never a gap.
    pub fn replace_match_events(
        &mut self,
        match_id: i64,
        rows: &[InsertableEvent],
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM match_events WHERE match_id = ?1", params![match_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO match_events
                   (match_id, team_id, player_id, event_type, ts_seconds,
                    minute, period, value, raw_player, raw_team)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.match_id,
                    row.team_id,
                    row.player_id,
                    row.event_type.as_str(),
                    row.ts_seconds,
                    row.minute,
                    row.period,
                    row.value,
                    row.raw_player,
                    row.raw_team,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ---- reporting reads ----------------------------------------------

    pub fn event_counts(&self, match_id: i64) -> Result<EventCounts, DbError> {
        let total = self.conn.query_row(
            "SELECT COUNT(*) FROM match_events WHERE match_id = ?1",
            params![match_id],
            |row| row.get(0),
        )?;
        let goals = self.conn.query_row(
            "SELECT COUNT(*) FROM match_events WHERE match_id = ?1 AND event_type = ?2",
            params![match_id, EventType::Goal.as_str()],
            |row| row.get(0),
        )?;
        Ok(EventCounts { total, goals })
    }

    pub fn goalie_stat_count(&self, match_id: i64) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM goalie_stats WHERE match_id = ?1",
            params![match_id],
            |row| row.get(0),
        )?)
    }

    pub fn player_points_count(&self, match_id: i64) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM player_match_points WHERE match_id = ?1",
            params![match_id],
            |row| row.get(0),
        )?)
    }

    pub fn total_assists(&self) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM match_events WHERE event_type = ?1",
            params![EventType::Assist.as_str()],
            |row| row.get(0),
        )?)
    }

    pub fn matches_with_saves(&self) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(DISTINCT match_id) FROM goalie_stats WHERE saves > 0",
            [],
            |row| row.get(0),
        )?)
    }

    /// Persisted events of one match in insertion order (test and
    /// diagnostics surface).
    pub fn events_for_match(&self, match_id: i64) -> Result<Vec<StoredEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT match_id, team_id, player_id, event_type, ts_seconds,
                    minute, period, value, raw_player, raw_team
             FROM match_events WHERE match_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![match_id], |row| {
            Ok(StoredEvent {
                match_id: row.get(0)?,
                team_id: row.get(1)?,
                player_id: row.get(2)?,
                event_type: row.get(3)?,
                ts_seconds: row.get(4)?,
                minute: row.get(5)?,
                period: row.get(6)?,
                value: row.get(7)?,
                raw_player: row.get(8)?,
                raw_team: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- seeding (schedule/roster sync surface, also used by tests) ----

    pub fn upsert_team(&self, team: &TeamRow) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO teams (id, name, code, external_id) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name, code = excluded.code, external_id = excluded.external_id",
            params![team.id, team.name, team.code, team.external_id],
        )?;
        Ok(())
    }

    pub fn upsert_player(&self, player: &PlayerRow) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO players (id, name, team_id, team_name, jersey_number, external_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name, team_id = excluded.team_id,
               team_name = excluded.team_name, jersey_number = excluded.jersey_number,
               external_id = excluded.external_id",
            params![
                player.id,
                player.name,
                player.team_id,
                player.team_name,
                player.jersey_number,
                player.external_id,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_match(&self, m: &MatchRow) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO matches
               (id, external_id, protocol_url, home_team_id, away_team_id,
                home_score, away_score, status, season, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               external_id = excluded.external_id, protocol_url = excluded.protocol_url,
               home_team_id = excluded.home_team_id, away_team_id = excluded.away_team_id,
               home_score = excluded.home_score, away_score = excluded.away_score,
               status = excluded.status, season = excluded.season, date = excluded.date",
            params![
                m.id,
                m.external_id,
                m.protocol_url,
                m.home_team_id,
                m.away_team_id,
                m.home_score,
                m.away_score,
                m.status,
                m.season,
                m.date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn insert_goalie_stat(
        &self,
        match_id: i64,
        player_id: Option<i64>,
        saves: i64,
        goals_against: i64,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO goalie_stats (match_id, player_id, saves, goals_against)
             VALUES (?1, ?2, ?3, ?4)",
            params![match_id, player_id, saves, goals_against],
        )?;
        Ok(())
    }
}

/// A `match_events` row as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub match_id: i64,
    pub team_id: Option<i64>,
    pub player_id: Option<i64>,
    pub event_type: String,
    pub ts_seconds: Option<i64>,
    pub minute: Option<i64>,
    pub period: Option<i64>,
    pub value: Option<i64>,
    pub raw_player: String,
    pub raw_team: String,
}

fn match_from_row(row: &Row) -> rusqlite::Result<MatchRow> {
    let date: Option<String> = row.get(9)?;
    Ok(MatchRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        protocol_url: row.get(2)?,
        home_team_id: row.get(3)?,
        away_team_id: row.get(4)?,
        home_score: row.get(5)?,
        away_score: row.get(6)?,
        status: row.get(7)?,
        season: row.get(8)?,
        date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
    })
}
