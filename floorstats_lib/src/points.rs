//! Downstream point computation, invoked as an external command.
//!
//! The contract is exit-code-shaped: zero is success, anything else is
//! failure. The command persists to `player_match_points` on its own;
//! this pipeline only observes that table through row counts.

use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum PointsError {
    #[error("points command is empty")]
    EmptyCommand,
    #[error("failed to run points command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("points command exited with code {0}")]
    NonZeroExit(i32),
}

pub struct CommandPointsStep {
    program: String,
    args: Vec<String>,
}

impl CommandPointsStep {
    /// Build from a whitespace-separated command line.
    pub fn new(command_line: &str) -> Result<Self, PointsError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(PointsError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub async fn run_for_match(&self, match_id: i64) -> Result<(), PointsError> {
        self.run(&["--match-id".to_string(), match_id.to_string()])
            .await
    }

    pub async fn run_for_external(&self, external_id: &str) -> Result<(), PointsError> {
        self.run(&["--external-id".to_string(), external_id.to_string()])
            .await
    }

    async fn run(&self, extra: &[String]) -> Result<(), PointsError> {
        tracing::debug!(program = %self.program, ?extra, "invoking points command");
        let status = Command::new(&self.program)
            .args(&self.args)
            .args(extra)
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(PointsError::NonZeroExit(status.code().unwrap_or(-1)))
        }
    }
}
