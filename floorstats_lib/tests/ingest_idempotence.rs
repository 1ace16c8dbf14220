//! End-to-end ingestion against an in-memory store and a fixture protocol.

use floorstats_lib::{
    ingest_html, Db, MatchRow, PlayerLookup, PlayerRow, TeamLookup, TeamRow,
};

const PROTOCOL_HTML: &str = r#"
<html><body>
<h1>Match report</h1>
<table>
  <tr><th>Nr</th><th>Name</th><th>Position</th></tr>
  <tr><td>9</td><td>J. Bērziņš</td><td>F</td></tr>
</table>
<table>
  <tr><th>Time</th><th>Team</th><th>Scorer</th><th>Assists</th></tr>
  <tr><td>12:34</td><td>Team A</td><td>J. Berzins</td><td>P. Kalns</td></tr>
</table>
</body></html>
"#;

fn seeded_db() -> Db {
    let db = Db::open_in_memory().unwrap();
    db.init().unwrap();
    db.upsert_team(&TeamRow {
        id: 1,
        name: "Team A".to_string(),
        code: Some("TMA".to_string()),
        external_id: Some("501".to_string()),
    })
    .unwrap();
    for (id, name) in [(10, "J. Bērziņš"), (11, "P. Kalns")] {
        db.upsert_player(&PlayerRow {
            id,
            name: name.to_string(),
            team_id: Some(1),
            team_name: None,
            jersey_number: None,
            external_id: None,
        })
        .unwrap();
    }
    db.upsert_match(&MatchRow {
        id: 7,
        external_id: "100".to_string(),
        protocol_url: Some("https://example.test/protocols/100".to_string()),
        home_team_id: Some(1),
        away_team_id: None,
        home_score: Some(1),
        away_score: Some(0),
        status: "finished".to_string(),
        season: Some("2025/2026".to_string()),
        date: None,
    })
    .unwrap();
    db
}

fn lookups(db: &Db) -> (TeamLookup, PlayerLookup) {
    let teams = TeamLookup::build(&db.all_teams().unwrap());
    let players = PlayerLookup::build(&db.all_players().unwrap(), &teams);
    (teams, players)
}

#[test]
fn clean_single_match_produces_goal_and_assist() {
    let mut db = seeded_db();
    let (teams, mut players) = lookups(&db);

    let outcome = ingest_html(&mut db, 7, PROTOCOL_HTML, &teams, &mut players).unwrap();
    assert_eq!(outcome.events_inserted, 2);
    assert_eq!(outcome.goals, 1);
    assert_eq!(outcome.assists, 1);
    assert!(outcome.unresolved_players.is_empty());

    let events = db.events_for_match(7).unwrap();
    assert_eq!(events.len(), 2);

    let goal = &events[0];
    assert_eq!(goal.event_type, "goal");
    assert_eq!(goal.player_id, Some(10));
    assert_eq!(goal.team_id, Some(1));
    assert_eq!(goal.ts_seconds, Some(754));
    assert_eq!(goal.minute, Some(12));
    assert_eq!(goal.raw_player, "J. Berzins");

    let assist = &events[1];
    assert_eq!(assist.event_type, "assist");
    assert_eq!(assist.player_id, Some(11));
    assert_eq!(assist.ts_seconds, Some(754));
    assert_eq!(assist.minute, Some(12));
}

#[test]
fn reingestion_is_idempotent() {
    let mut db = seeded_db();
    let (teams, mut players) = lookups(&db);

    ingest_html(&mut db, 7, PROTOCOL_HTML, &teams, &mut players).unwrap();
    let first = db.events_for_match(7).unwrap();

    ingest_html(&mut db, 7, PROTOCOL_HTML, &teams, &mut players).unwrap();
    let second = db.events_for_match(7).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
}

#[test]
fn unresolvable_scorer_is_dropped_with_diagnostic() {
    let mut db = seeded_db();
    let (teams, mut players) = lookups(&db);

    let html = r#"
        <table>
          <tr><th>Time</th><th>Team</th><th>Scorer</th><th>Assists</th></tr>
          <tr><td>03:00</td><td>Team A</td><td>Unknown Player</td><td></td></tr>
        </table>
    "#;
    let outcome = ingest_html(&mut db, 7, html, &teams, &mut players).unwrap();
    assert_eq!(outcome.events_inserted, 0);
    assert_eq!(outcome.unresolved_players, vec!["Unknown Player"]);
    assert!(db.events_for_match(7).unwrap().is_empty());
}

#[test]
fn empty_protocol_yields_zero_rows_without_error() {
    let mut db = seeded_db();
    let (teams, mut players) = lookups(&db);

    let outcome = ingest_html(&mut db, 7, "", &teams, &mut players).unwrap();
    assert_eq!(outcome.goal_rows, 0);
    assert_eq!(outcome.penalty_rows, 0);
    assert_eq!(outcome.events_inserted, 0);
}
