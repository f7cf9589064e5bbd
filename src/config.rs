use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::monitor::detect_task_id;

/// How long a started agent may go without writing to its log before it is
/// shown as stopped
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Number of characters of the latest assistant text kept for live display
pub const DEFAULT_PREVIEW_CHARS: usize = 150;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Reconciliation policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub stale_after: Duration,
    pub preview_chars: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no home directory found; pass --logs-dir and --comms-dir")]
    NoHomeDir,
    #[error("no task ID provided and no logs found in {}", .0.display())]
    NoTaskId(PathBuf),
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

/// Live monitor for gummy agent runs
#[derive(Debug, Parser)]
#[command(name = "gummy-watch", version, about)]
pub struct Cli {
    /// Task ID to follow (defaults to the newest planning log)
    pub task_id: Option<String>,

    /// Directory holding the agent logs
    #[arg(long)]
    pub logs_dir: Option<PathBuf>,

    /// Directory holding the completion reports
    #[arg(long)]
    pub comms_dir: Option<PathBuf>,

    /// Seconds without log writes before a started agent counts as stopped
    #[arg(long, default_value_t = DEFAULT_STALE_AFTER.as_secs())]
    pub stale_secs: u64,

    /// Characters of the latest assistant text shown while running
    #[arg(long, default_value_t = DEFAULT_PREVIEW_CHARS)]
    pub preview_chars: usize,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK.as_millis() as u64)]
    pub tick_ms: u64,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub task_id: String,
    pub logs_dir: PathBuf,
    pub comms_dir: PathBuf,
    /// Where the upward search for the specialists directory starts
    pub specialists_root: PathBuf,
    pub policy: Policy,
    pub tick: Duration,
}

impl Settings {
    pub fn resolve(cli: Cli) -> Result<Self, WatchError> {
        let home = dirs::home_dir();
        let claude_dir = |sub: &[&str]| -> Result<PathBuf, WatchError> {
            let mut dir = home.clone().ok_or(WatchError::NoHomeDir)?.join(".claude");
            for part in sub {
                dir.push(part);
            }
            Ok(dir)
        };

        let logs_dir = match cli.logs_dir {
            Some(dir) => dir,
            None => claude_dir(&["logs", "gummy"])?,
        };
        let comms_dir = match cli.comms_dir {
            Some(dir) => dir,
            None => claude_dir(&["agent_comms", "gummy"])?,
        };

        let task_id = match cli.task_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => detect_task_id(&logs_dir).ok_or_else(|| WatchError::NoTaskId(logs_dir.clone()))?,
        };

        Ok(Self {
            task_id,
            logs_dir,
            comms_dir,
            specialists_root: std::env::current_dir()?,
            policy: Policy {
                stale_after: Duration::from_secs(cli.stale_secs),
                preview_chars: cli.preview_chars,
            },
            tick: Duration::from_millis(cli.tick_ms.max(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["gummy-watch", "gummy-42"]);
        assert_eq!(cli.task_id.as_deref(), Some("gummy-42"));
        assert_eq!(cli.stale_secs, 30);
        assert_eq!(cli.preview_chars, 150);
        assert_eq!(cli.tick_ms, 1000);
    }

    #[test]
    fn test_resolve_detects_task_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gummy-100-plan.log"), "").unwrap();
        fs::write(dir.path().join("gummy-200-plan.log"), "").unwrap();

        let cli = Cli::parse_from([
            "gummy-watch",
            "--logs-dir",
            dir.path().to_str().unwrap(),
            "--comms-dir",
            dir.path().to_str().unwrap(),
            "--stale-secs",
            "5",
        ]);
        let settings = Settings::resolve(cli).unwrap();
        assert_eq!(settings.task_id, "gummy-200");
        assert_eq!(settings.policy.stale_after, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_without_logs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "gummy-watch",
            "--logs-dir",
            dir.path().to_str().unwrap(),
            "--comms-dir",
            dir.path().to_str().unwrap(),
        ]);
        assert!(matches!(
            Settings::resolve(cli),
            Err(WatchError::NoTaskId(_))
        ));
    }
}
