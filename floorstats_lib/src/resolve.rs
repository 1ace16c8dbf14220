//! Entity resolution: raw team and player text to store identifiers.
//!
//! Lookup tables are built once per run from the full roster and are
//! read-only afterwards (the fallback counters are the one exception).
//! A wrong silent attribution is worse than a dropped event, so the
//! cross-team player fallback only ever returns a globally unique match.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{PlayerRow, TeamRow};
use crate::normalize::normalize;

/// Normalized team key (name, code, or external id) to team id.
pub struct TeamLookup {
    map: HashMap<String, i64>,
}

impl TeamLookup {
    /// Index each team under its normalized name, short code, and external
    /// id. Colliding keys keep the last write; distinct teams do not share
    /// keys in a closed league roster.
    pub fn build(teams: &[TeamRow]) -> Self {
        let mut map = HashMap::new();
        for team in teams {
            let mut insert = |raw: &str| {
                let key = normalize(raw);
                if !key.is_empty() {
                    map.insert(key, team.id);
                }
            };
            insert(&team.name);
            if let Some(code) = &team.code {
                insert(code);
            }
            if let Some(external_id) = &team.external_id {
                insert(external_id);
            }
        }
        Self { map }
    }

    pub fn resolve(&self, raw: &str) -> Option<i64> {
        self.map.get(&normalize(raw)).copied()
    }
}

/// Counters for how player resolution succeeded or failed across a run.
///
/// The cross-team fallback rests on the assumption that player names are
/// globally unique enough; these counters make the assumption observable
/// instead of silent.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ResolutionStats {
    pub scoped_hits: u64,
    pub fallback_hits: u64,
    pub fallback_ambiguous: u64,
    pub fallback_misses: u64,
}

/// Team id to (normalized player name to player id), plus fallback counters.
pub struct PlayerLookup {
    by_team: HashMap<i64, HashMap<String, i64>>,
    stats: ResolutionStats,
}

impl PlayerLookup {
    /// Index players by team, then by normalized name. A player whose row
    /// lacks a team id is attached via its team-name text when that text
    /// resolves; otherwise the player is unreachable by scoped lookup but
    /// still absent from the fallback (it has no team bucket).
    pub fn build(players: &[PlayerRow], teams: &TeamLookup) -> Self {
        let mut by_team: HashMap<i64, HashMap<String, i64>> = HashMap::new();
        for player in players {
            let team_id = player
                .team_id
                .or_else(|| player.team_name.as_deref().and_then(|t| teams.resolve(t)));
            let Some(team_id) = team_id else {
                tracing::debug!(player = %player.name, "player has no resolvable team, not indexed");
                continue;
            };
            let key = normalize(&player.name);
            if key.is_empty() {
                continue;
            }
            by_team.entry(team_id).or_default().insert(key, player.id);
        }
        Self {
            by_team,
            stats: ResolutionStats::default(),
        }
    }

    /// Resolve a raw player name, scoped to a team when one resolved.
    ///
    /// Misses in the team's own map (or an unresolved team) fall back to a
    /// cross-team uniqueness search: exactly one team rostering the name
    /// resolves to that player, zero or several resolve to `None`.
    pub fn resolve(&mut self, team_id: Option<i64>, raw_name: &str) -> Option<i64> {
        let key = normalize(raw_name);
        if key.is_empty() {
            return None;
        }

        if let Some(team_id) = team_id {
            if let Some(player_id) = self.by_team.get(&team_id).and_then(|m| m.get(&key)) {
                self.stats.scoped_hits += 1;
                return Some(*player_id);
            }
        }

        let mut matches = self.by_team.values().filter_map(|m| m.get(&key));
        match (matches.next(), matches.next()) {
            (Some(player_id), None) => {
                self.stats.fallback_hits += 1;
                Some(*player_id)
            }
            (Some(_), Some(_)) => {
                self.stats.fallback_ambiguous += 1;
                None
            }
            _ => {
                self.stats.fallback_misses += 1;
                None
            }
        }
    }

    pub fn stats(&self) -> &ResolutionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: i64, name: &str, code: Option<&str>, external_id: Option<&str>) -> TeamRow {
        TeamRow {
            id,
            name: name.to_string(),
            code: code.map(str::to_string),
            external_id: external_id.map(str::to_string),
        }
    }

    fn player(id: i64, name: &str, team_id: Option<i64>) -> PlayerRow {
        PlayerRow {
            id,
            name: name.to_string(),
            team_id,
            team_name: None,
            jersey_number: None,
            external_id: None,
        }
    }

    #[test]
    fn team_indexed_under_name_code_and_external_id() {
        let lookup = TeamLookup::build(&[team(1, "FK Kurbads", Some("KUR"), Some("309"))]);
        assert_eq!(lookup.resolve("fk kurbads"), Some(1));
        assert_eq!(lookup.resolve("KUR"), Some(1));
        assert_eq!(lookup.resolve("309"), Some(1));
        assert_eq!(lookup.resolve("unknown"), None);
    }

    #[test]
    fn scoped_resolution_hits_own_roster() {
        let teams = TeamLookup::build(&[team(1, "Team A", None, None)]);
        let mut players = PlayerLookup::build(&[player(10, "Jānis Bērziņš", Some(1))], &teams);
        assert_eq!(players.resolve(Some(1), "Janis Berzins"), Some(10));
        assert_eq!(players.stats().scoped_hits, 1);
    }

    #[test]
    fn fallback_resolves_globally_unique_name() {
        let teams = TeamLookup::build(&[team(1, "Team A", None, None)]);
        let mut players = PlayerLookup::build(&[player(10, "P. Kalns", Some(1))], &teams);
        assert_eq!(players.resolve(None, "P. Kalns"), Some(10));
        assert_eq!(players.stats().fallback_hits, 1);
    }

    #[test]
    fn ambiguous_fallback_refuses_to_guess() {
        let teams = TeamLookup::build(&[
            team(1, "Team A", None, None),
            team(2, "Team B", None, None),
        ]);
        let mut players = PlayerLookup::build(
            &[player(10, "K. Liepa", Some(1)), player(20, "K. Liepa", Some(2))],
            &teams,
        );
        assert_eq!(players.resolve(None, "K. Liepa"), None);
        assert_eq!(players.stats().fallback_ambiguous, 1);
    }

    #[test]
    fn unknown_name_counts_as_miss() {
        let teams = TeamLookup::build(&[team(1, "Team A", None, None)]);
        let mut players = PlayerLookup::build(&[player(10, "P. Kalns", Some(1))], &teams);
        assert_eq!(players.resolve(Some(1), "Nobody"), None);
        assert_eq!(players.stats().fallback_misses, 1);
    }

    #[test]
    fn player_attached_through_team_name_text() {
        let teams = TeamLookup::build(&[team(1, "FK Kurbads", None, None)]);
        let mut players = PlayerLookup::build(
            &[PlayerRow {
                id: 10,
                name: "M. Zariņš".to_string(),
                team_id: None,
                team_name: Some("FK Kurbads".to_string()),
                jersey_number: Some(7),
                external_id: None,
            }],
            &teams,
        );
        assert_eq!(players.resolve(Some(1), "M. Zarins"), Some(10));
    }
}
