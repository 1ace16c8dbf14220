//! The `ingest-match` subcommand: run the single-match ingestor directly.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use floorstats_lib::{ingest_match, Config, Db, PlayerLookup, ProtocolClient, TeamLookup};

#[derive(Args)]
pub struct IngestMatchArgs {
    /// SQLite database path
    #[arg(long, default_value = "floorstats.db")]
    pub db: PathBuf,

    /// Store id of the match
    #[arg(long, conflicts_with = "external_id")]
    pub match_id: Option<i64>,

    /// External source id of the match
    #[arg(long)]
    pub external_id: Option<String>,
}

pub async fn run(args: &IngestMatchArgs) -> Result<i32> {
    let config = Config::from_env()?;

    let mut db = Db::open(&args.db)?;
    db.init()?;

    let m = match (args.match_id, args.external_id.as_deref()) {
        (Some(id), _) => db
            .match_by_id(id)?
            .ok_or_else(|| anyhow!("no match with id {id}"))?,
        (None, Some(external_id)) => db
            .match_by_external_id(external_id)?
            .ok_or_else(|| anyhow!("no match with external id {external_id}"))?,
        (None, None) => return Err(anyhow!("either --match-id or --external-id is required")),
    };

    let teams = TeamLookup::build(&db.all_teams()?);
    let mut players = PlayerLookup::build(&db.all_players()?, &teams);
    let client = ProtocolClient::new(&config.user_agent, config.cookie.clone())?;

    let outcome = ingest_match(&mut db, &client, &m, &teams, &mut players).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(0)
}
