//! Environment configuration.
//!
//! Missing required values are configuration errors: fatal, reported
//! before any batch work starts.

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) floorstats/0.3 protocol ingester";

#[derive(Debug, Clone)]
pub struct Config {
    /// Source site base URL, also the pre-flight reachability target.
    pub source_url: String,
    pub user_agent: String,
    /// Session cookie header value, when the source requires one.
    pub cookie: Option<String>,
    /// External point-computation command line.
    pub points_cmd: Option<String>,
    /// Default season for backfill runs.
    pub season: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source_url = get("FLOORSTATS_SOURCE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("FLOORSTATS_SOURCE_URL"))?;
        Ok(Self {
            source_url,
            user_agent: get("FLOORSTATS_USER_AGENT")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            cookie: get("FLOORSTATS_COOKIE").filter(|v| !v.is_empty()),
            points_cmd: get("FLOORSTATS_POINTS_CMD").filter(|v| !v.is_empty()),
            season: get("FLOORSTATS_SEASON").filter(|v| !v.is_empty()),
        })
    }

    /// Commands that invoke the downstream point computation call this
    /// before doing any work.
    pub fn require_points_cmd(&self) -> Result<&str, ConfigError> {
        self.points_cmd
            .as_deref()
            .ok_or(ConfigError::MissingVar("FLOORSTATS_POINTS_CMD"))
    }
}
