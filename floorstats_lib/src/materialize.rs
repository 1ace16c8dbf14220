//! Event materialization: resolved, persistable rows from parsed events.

use serde::Serialize;

use crate::events::{EventType, ParsedEvent};
use crate::resolve::{PlayerLookup, TeamLookup};

/// The persisted shape of one match event.
///
/// Raw team and player text is always carried for audit, even when
/// resolution succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertableEvent {
    pub match_id: i64,
    pub team_id: Option<i64>,
    pub player_id: Option<i64>,
    pub event_type: EventType,
    pub ts_seconds: Option<i64>,
    pub minute: Option<i64>,
    pub period: Option<i64>,
    pub value: Option<i64>,
    pub raw_player: String,
    pub raw_team: String,
}

/// Persistable rows plus diagnostics for events that failed to resolve.
#[derive(Debug, Default)]
pub struct Materialized {
    /// Rows eligible for persistence: player resolved.
    pub rows: Vec<InsertableEvent>,
    /// Raw team texts that resolved to no team.
    pub unresolved_teams: Vec<String>,
    /// Raw player texts that resolved to no player. Events behind these
    /// are dropped from persistence, not silently lost.
    pub unresolved_players: Vec<String>,
}

/// Resolve each event's team and player and split the results into
/// persistable rows and unresolved diagnostics.
///
/// Player resolution is team-scoped when the team resolved. An event with
/// a resolved team but unresolved player is excluded from `rows` but still
/// counted in `unresolved_players`; orphan player references never reach
/// the event log.
pub fn materialize(
    match_id: i64,
    events: &[ParsedEvent],
    teams: &TeamLookup,
    players: &mut PlayerLookup,
) -> Materialized {
    let mut out = Materialized::default();

    for event in events {
        let team_id = teams.resolve(&event.raw_team);
        if team_id.is_none() {
            out.unresolved_teams.push(event.raw_team.clone());
        }

        let player_id = players.resolve(team_id, &event.raw_player);

        let row = InsertableEvent {
            match_id,
            team_id,
            player_id,
            event_type: event.event_type,
            ts_seconds: event.ts_seconds,
            minute: event.minute,
            period: event.period,
            value: event.value,
            raw_player: event.raw_player.clone(),
            raw_team: event.raw_team.clone(),
        };

        if row.player_id.is_some() {
            out.rows.push(row);
        } else {
            out.unresolved_players.push(event.raw_player.clone());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PlayerRow, TeamRow};

    fn lookups() -> (TeamLookup, PlayerLookup) {
        let teams = TeamLookup::build(&[TeamRow {
            id: 1,
            name: "Team A".to_string(),
            code: None,
            external_id: None,
        }]);
        let players = PlayerLookup::build(
            &[PlayerRow {
                id: 10,
                name: "J. Bērziņš".to_string(),
                team_id: Some(1),
                team_name: None,
                jersey_number: None,
                external_id: None,
            }],
            &teams,
        );
        (teams, players)
    }

    fn goal(raw_team: &str, raw_player: &str) -> ParsedEvent {
        ParsedEvent {
            event_type: EventType::Goal,
            raw_team: raw_team.to_string(),
            raw_player: raw_player.to_string(),
            ts_seconds: Some(754),
            minute: Some(12),
            period: Some(1),
            value: None,
        }
    }

    #[test]
    fn resolved_event_is_persistable_with_audit_text() {
        let (teams, mut players) = lookups();
        let out = materialize(7, &[goal("Team A", "J. Berzins")], &teams, &mut players);
        assert_eq!(out.rows.len(), 1);
        let row = &out.rows[0];
        assert_eq!(row.match_id, 7);
        assert_eq!(row.team_id, Some(1));
        assert_eq!(row.player_id, Some(10));
        assert_eq!(row.raw_player, "J. Berzins");
        assert_eq!(row.raw_team, "Team A");
    }

    #[test]
    fn resolved_team_unresolved_player_is_dropped_but_counted() {
        let (teams, mut players) = lookups();
        let out = materialize(7, &[goal("Team A", "Nobody")], &teams, &mut players);
        assert!(out.rows.is_empty());
        assert_eq!(out.unresolved_players, vec!["Nobody"]);
        assert!(out.unresolved_teams.is_empty());
    }

    #[test]
    fn unresolved_team_is_diagnosed_but_unique_player_still_resolves() {
        let (teams, mut players) = lookups();
        let out = materialize(7, &[goal("Mystery FC", "J. Berzins")], &teams, &mut players);
        assert_eq!(out.unresolved_teams, vec!["Mystery FC"]);
        // Cross-team fallback found a unique roster match.
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].player_id, Some(10));
        assert_eq!(out.rows[0].team_id, None);
    }
}
