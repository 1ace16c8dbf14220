//! The `backfill-scan` subcommand: the reconciliation scanner.
//!
//! A best-effort healing pass over a trailing window: matches whose
//! recorded goal events under-report the official scoreline (or that have
//! no events at all) are flagged suspicious and re-ingested. The scan
//! never hard-fails, even when every re-ingestion fails.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use floorstats_lib::{
    ingest_match, CommandPointsStep, Config, Db, MatchRow, PlayerLookup, ProtocolClient,
    TeamLookup,
};

#[derive(Args)]
pub struct BackfillScanArgs {
    /// SQLite database path
    #[arg(long, default_value = "floorstats.db")]
    pub db: PathBuf,

    /// Trailing window in days
    #[arg(long, default_value = "14")]
    pub days: i64,
}

pub async fn run(args: &BackfillScanArgs) -> Result<i32> {
    let config = Config::from_env()?;
    let points = CommandPointsStep::new(config.require_points_cmd()?)?;

    let mut db = Db::open(&args.db)?;
    db.init()?;

    let teams = TeamLookup::build(&db.all_teams()?);
    let mut players = PlayerLookup::build(&db.all_players()?, &teams);
    let client = ProtocolClient::new(&config.user_agent, config.cookie.clone())?;
    client
        .preflight(&config.source_url)
        .await
        .context("source pre-flight check failed, aborting scan")?;

    let cutoff = Utc::now().date_naive() - Duration::days(args.days);
    let matches = db.finished_matches_since(cutoff)?;
    eprintln!(
        "Scanning {} finished matches since {cutoff} for under-reporting",
        matches.len()
    );

    let mut suspicious: Vec<MatchRow> = Vec::new();
    let mut without_points = 0usize;
    for m in &matches {
        let counts = db.event_counts(m.id)?;
        if db.player_points_count(m.id)? == 0 {
            without_points += 1;
        }
        if is_suspicious(counts.total, counts.goals, m.home_score, m.away_score) {
            tracing::info!(
                match_id = m.id,
                external_id = %m.external_id,
                events = counts.total,
                goal_events = counts.goals,
                home_score = m.home_score,
                away_score = m.away_score,
                "suspicious match, scheduling re-ingestion"
            );
            suspicious.push(m.clone());
        }
    }
    eprintln!(
        "Found {} suspicious matches ({} in window without player points)",
        suspicious.len(),
        without_points
    );

    let mut healed = 0usize;
    let mut failed = 0usize;
    for m in &suspicious {
        let result = async {
            ingest_match(&mut db, &client, m, &teams, &mut players).await?;
            points.run_for_external(&m.external_id).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;
        match result {
            Ok(()) => healed += 1,
            Err(err) => {
                tracing::warn!(
                    match_id = m.id,
                    external_id = %m.external_id,
                    "re-ingestion failed: {err:#}"
                );
                failed += 1;
            }
        }
    }

    eprintln!("Scan complete: {healed} re-ingested, {failed} failed");
    if failed > 0 {
        tracing::warn!(failed, "some re-ingestions failed; scan is best-effort, not failing the run");
    }
    Ok(0)
}

/// A finished match under-reports when it has no events at all, or fewer
/// recorded goal events than its official combined scoreline.
fn is_suspicious(
    total_events: i64,
    goal_events: i64,
    home_score: Option<i64>,
    away_score: Option<i64>,
) -> bool {
    if total_events == 0 {
        return true;
    }
    match (home_score, away_score) {
        (Some(home), Some(away)) => goal_events < home + away,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_reported_scoreline_is_suspicious() {
        // Official 3-2, only 2 goal events recorded.
        assert!(is_suspicious(10, 2, Some(3), Some(2)));
    }

    #[test]
    fn fully_reported_match_is_clean() {
        assert!(!is_suspicious(12, 5, Some(3), Some(2)));
    }

    #[test]
    fn eventless_match_is_suspicious_even_without_scoreline() {
        assert!(is_suspicious(0, 0, None, None));
        assert!(is_suspicious(0, 0, Some(0), Some(0)));
    }

    #[test]
    fn missing_scoreline_with_events_is_clean() {
        assert!(!is_suspicious(4, 1, None, Some(2)));
    }

    #[test]
    fn goal_events_meeting_scoreline_are_clean() {
        assert!(!is_suspicious(7, 5, Some(3), Some(2)));
    }
}
