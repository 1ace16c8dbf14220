//! Match-protocol HTML parsing: table classification and row extraction.
//!
//! A protocol page carries an unpredictable mix of tables (lineups,
//! officials, goals, penalties) whose headers are written in a mix of
//! English and Latvian. Each table is classified by its normalized header
//! tokens; tables that are neither goal nor penalty tables are skipped on
//! purpose, so unrelated tables never produce spurious rows.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::normalize;

/// Header tokens that mark a goal table. Checked first.
const GOAL_KEYWORDS: &[&str] = &[
    "goal",
    "goals",
    "scorer",
    "scorers",
    "assist",
    "assists",
    "varti",
    "vartu",
    "guvejs",
    "guveji",
    "piespele",
    "piespeles",
    "rezultativas",
];

/// Header tokens that mark a penalty table. Only consulted when the goal
/// keywords did not match.
const PENALTY_KEYWORDS: &[&str] = &[
    "penalty",
    "penalties",
    "pim",
    "minutes",
    "sods",
    "sodi",
    "soda",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TableKind {
    Goal,
    Penalty,
}

/// Positional meaning of a body-row cell.
#[derive(Clone, Copy)]
enum Column {
    Time,
    Team,
    Scorer,
    Assists,
    Player,
}

/// Ordered cell layout for one table kind. New protocol layouts are added
/// here rather than in the row-extraction code.
struct TableLayout {
    kind: TableKind,
    columns: &'static [Column],
}

const GOAL_LAYOUT: TableLayout = TableLayout {
    kind: TableKind::Goal,
    columns: &[Column::Time, Column::Team, Column::Scorer, Column::Assists],
};

const PENALTY_LAYOUT: TableLayout = TableLayout {
    kind: TableKind::Penalty,
    columns: &[Column::Time, Column::Team, Column::Player],
};

/// One row of a goal table, raw text only.
#[derive(Debug, Clone, Default)]
pub struct GoalRow {
    pub time: Option<String>,
    pub team: String,
    pub scorer: String,
    pub assists: Vec<String>,
    pub period: Option<String>,
}

/// One row of a penalty table, raw text only.
#[derive(Debug, Clone, Default)]
pub struct PenaltyRow {
    pub time: Option<String>,
    pub team: String,
    pub player: String,
    pub minutes: Option<i64>,
    pub period: Option<String>,
}

/// All goal and penalty rows extracted from one protocol page.
#[derive(Debug, Default)]
pub struct ProtocolTables {
    pub goal_rows: Vec<GoalRow>,
    pub penalty_rows: Vec<PenaltyRow>,
}

/// Parse a protocol page into goal and penalty rows.
///
/// Never fails: malformed tables simply contribute fewer rows.
pub fn parse_protocol(html: &str) -> ProtocolTables {
    let document = Html::parse_document(html);
    // Static selectors; parse failure would be a bug in the literal.
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("th, td").unwrap();
    let digits_re = Regex::new(r"\d+").unwrap();

    let mut tables = ProtocolTables::default();

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header_row
            .select(&cell_sel)
            .map(|cell| normalize(&cell_text(&cell)))
            .collect();

        let Some(layout) = classify(&headers) else {
            continue;
        };
        let period_col = headers.iter().position(|h| h.contains("per"));

        for row in rows {
            let cells: Vec<String> = row
                .select(&cell_sel)
                .map(|cell| cell_text(&cell))
                .collect();
            if cells.is_empty() {
                continue;
            }
            match layout.kind {
                TableKind::Goal => {
                    tables.goal_rows.push(extract_goal_row(layout.columns, &cells, period_col));
                }
                TableKind::Penalty => {
                    tables.penalty_rows.push(extract_penalty_row(
                        layout.columns,
                        &cells,
                        period_col,
                        &digits_re,
                    ));
                }
            }
        }
    }

    tables
}

/// Collapse an element's text nodes into one trimmed string.
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn classify(headers: &[String]) -> Option<&'static TableLayout> {
    let has_token = |keywords: &[&str]| {
        headers
            .iter()
            .flat_map(|h| h.split_whitespace())
            .any(|token| keywords.contains(&token))
    };

    if has_token(GOAL_KEYWORDS) {
        Some(&GOAL_LAYOUT)
    } else if has_token(PENALTY_KEYWORDS) {
        Some(&PENALTY_LAYOUT)
    } else {
        None
    }
}

fn extract_goal_row(columns: &[Column], cells: &[String], period_col: Option<usize>) -> GoalRow {
    let mut row = GoalRow::default();
    for (idx, column) in columns.iter().enumerate() {
        let Some(cell) = cells.get(idx) else {
            break;
        };
        match column {
            Column::Time => row.time = non_empty(cell),
            Column::Team => row.team = cell.clone(),
            Column::Scorer => row.scorer = cell.clone(),
            Column::Assists => row.assists = split_assists(cell),
            Column::Player => {}
        }
    }
    row.period = period_col.and_then(|idx| cells.get(idx)).and_then(|c| non_empty(c));
    row
}

fn extract_penalty_row(
    columns: &[Column],
    cells: &[String],
    period_col: Option<usize>,
    digits_re: &Regex,
) -> PenaltyRow {
    let mut row = PenaltyRow::default();
    for (idx, column) in columns.iter().enumerate() {
        let Some(cell) = cells.get(idx) else {
            break;
        };
        match column {
            Column::Time => row.time = non_empty(cell),
            Column::Team => row.team = cell.clone(),
            Column::Player => row.player = cell.clone(),
            Column::Scorer | Column::Assists => {}
        }
    }
    row.period = period_col.and_then(|idx| cells.get(idx)).and_then(|c| non_empty(c));

    // Penalty minutes live in whichever remaining cell carries a number.
    // Name and team cells are excluded so jersey digits cannot win, and
    // clock cells are recognized by their colon.
    let name_cols: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Column::Team | Column::Player))
        .map(|(idx, _)| idx)
        .collect();
    row.minutes = cells
        .iter()
        .enumerate()
        .filter(|(idx, cell)| {
            Some(*idx) != period_col && !name_cols.contains(idx) && !cell.contains(':')
        })
        .find_map(|(_, cell)| digits_re.find(cell))
        .and_then(|m| m.as_str().parse().ok());

    row
}

fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split an assists cell into candidate names.
pub fn split_assists(cell: &str) -> Vec<String> {
    cell.split(|c| matches!(c, ',' | ';' | '(' | ')' | '+'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce a clock string to total seconds.
///
/// One colon is `mm:ss`, two colons `hh:mm:ss`; anything else is `None`.
/// Negative components and values that overflow the seconds total are
/// treated as unparseable, like any other garbage in the cell.
pub fn parse_time_to_seconds(text: &str) -> Option<i64> {
    let parts: Result<Vec<i64>, _> = text.trim().split(':').map(|p| p.trim().parse()).collect();
    let parts = parts.ok()?;
    if parts.iter().any(|p| *p < 0) {
        return None;
    }
    match parts.as_slice() {
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        _ => None,
    }
}

/// Decode a period marker.
///
/// Numeric text is taken directly; `OT` maps to period 4 and `SO`
/// (shootout) to period 5 by convention.
pub fn parse_period(text: Option<&str>) -> Option<i64> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    let upper = text.to_uppercase();
    if upper.contains("OT") {
        return Some(4);
    }
    if upper.contains("SO") {
        return Some(5);
    }
    None
}
