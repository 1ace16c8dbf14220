//! CLI subcommand implementations.

pub mod backfill_scan;
pub mod ingest_match;
pub mod ingest_matches;
