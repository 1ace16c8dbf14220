//! Row interpretation: typed events from raw goal and penalty rows.

use serde::Serialize;

use crate::protocol::{parse_period, parse_time_to_seconds, ProtocolTables};

/// Event kinds recorded in `match_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Goal,
    Assist,
    /// Two-minute minor penalty.
    Minor2,
    /// Four-minute double minor.
    DoubleMinor,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Goal => "goal",
            EventType::Assist => "assist",
            EventType::Minor2 => "minor_2",
            EventType::DoubleMinor => "double_minor",
        }
    }
}

/// A normalized intermediate event with unresolved free-text references.
///
/// Invariant: `ts_seconds` and `minute` are either both `None` or
/// `minute == ts_seconds / 60`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub event_type: EventType,
    pub raw_team: String,
    pub raw_player: String,
    pub ts_seconds: Option<i64>,
    pub minute: Option<i64>,
    pub period: Option<i64>,
    /// Penalty minutes for penalty events, `None` for goals and assists.
    pub value: Option<i64>,
}

/// Interpret parsed table rows as typed events.
///
/// A goal row with a non-empty scorer yields one `Goal` event plus one
/// `Assist` per assist name, all sharing the row's clock and period.
/// Scorerless rows yield nothing. Every penalty row yields exactly one
/// event, `DoubleMinor` from four minutes up, `Minor2` otherwise.
pub fn to_parsed_events(tables: &ProtocolTables) -> Vec<ParsedEvent> {
    let mut events = Vec::new();

    for row in &tables.goal_rows {
        if row.scorer.trim().is_empty() {
            continue;
        }
        let (ts_seconds, minute) = clock(row.time.as_deref());
        let period = parse_period(row.period.as_deref());

        events.push(ParsedEvent {
            event_type: EventType::Goal,
            raw_team: row.team.clone(),
            raw_player: row.scorer.clone(),
            ts_seconds,
            minute,
            period,
            value: None,
        });
        for assist in &row.assists {
            events.push(ParsedEvent {
                event_type: EventType::Assist,
                raw_team: row.team.clone(),
                raw_player: assist.clone(),
                ts_seconds,
                minute,
                period,
                value: None,
            });
        }
    }

    for row in &tables.penalty_rows {
        let (ts_seconds, minute) = clock(row.time.as_deref());
        let event_type = match row.minutes {
            Some(m) if m >= 4 => EventType::DoubleMinor,
            _ => EventType::Minor2,
        };
        events.push(ParsedEvent {
            event_type,
            raw_team: row.team.clone(),
            raw_player: row.player.clone(),
            ts_seconds,
            minute,
            period: parse_period(row.period.as_deref()),
            value: row.minutes,
        });
    }

    events
}

fn clock(time: Option<&str>) -> (Option<i64>, Option<i64>) {
    let ts_seconds = time.and_then(parse_time_to_seconds);
    (ts_seconds, ts_seconds.map(|s| s / 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{GoalRow, PenaltyRow};

    fn goal_row(time: &str, scorer: &str, assists: &[&str]) -> GoalRow {
        GoalRow {
            time: Some(time.to_string()),
            team: "Team A".to_string(),
            scorer: scorer.to_string(),
            assists: assists.iter().map(|s| s.to_string()).collect(),
            period: Some("1".to_string()),
        }
    }

    #[test]
    fn goal_row_yields_goal_and_assists_sharing_clock() {
        let tables = ProtocolTables {
            goal_rows: vec![goal_row("12:34", "J. Berzins", &["P. Kalns"])],
            penalty_rows: vec![],
        };
        let events = to_parsed_events(&tables);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].event_type, EventType::Goal);
        assert_eq!(events[0].raw_player, "J. Berzins");
        assert_eq!(events[0].ts_seconds, Some(754));
        assert_eq!(events[0].minute, Some(12));
        assert_eq!(events[0].period, Some(1));

        assert_eq!(events[1].event_type, EventType::Assist);
        assert_eq!(events[1].raw_player, "P. Kalns");
        assert_eq!(events[1].ts_seconds, Some(754));
        assert_eq!(events[1].minute, Some(12));
    }

    #[test]
    fn scorerless_row_yields_no_events() {
        let tables = ProtocolTables {
            goal_rows: vec![goal_row("12:34", "  ", &["P. Kalns"])],
            penalty_rows: vec![],
        };
        assert!(to_parsed_events(&tables).is_empty());
    }

    #[test]
    fn unparseable_time_leaves_clock_fields_unset() {
        let tables = ProtocolTables {
            goal_rows: vec![goal_row("garbage", "J. Berzins", &[])],
            penalty_rows: vec![],
        };
        let events = to_parsed_events(&tables);
        assert_eq!(events[0].ts_seconds, None);
        assert_eq!(events[0].minute, None);
    }

    #[test]
    fn penalty_typing_by_minutes() {
        let tables = ProtocolTables {
            goal_rows: vec![],
            penalty_rows: vec![
                PenaltyRow {
                    time: Some("05:10".to_string()),
                    team: "Team B".to_string(),
                    player: "K. Liepa".to_string(),
                    minutes: Some(2),
                    period: None,
                },
                PenaltyRow {
                    time: Some("41:02".to_string()),
                    team: "Team A".to_string(),
                    player: "M. Zarins".to_string(),
                    minutes: Some(4),
                    period: None,
                },
            ],
        };
        let events = to_parsed_events(&tables);
        assert_eq!(events[0].event_type, EventType::Minor2);
        assert_eq!(events[0].value, Some(2));
        assert_eq!(events[1].event_type, EventType::DoubleMinor);
        assert_eq!(events[1].value, Some(4));
    }

    #[test]
    fn event_type_storage_names() {
        assert_eq!(EventType::Goal.as_str(), "goal");
        assert_eq!(EventType::Assist.as_str(), "assist");
        assert_eq!(EventType::Minor2.as_str(), "minor_2");
        assert_eq!(EventType::DoubleMinor.as_str(), "double_minor");
    }
}
