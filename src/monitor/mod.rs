mod events;
mod reconcile;
mod specialists;

pub use reconcile::{read_agent_state, AgentPaths, AgentState, AgentStatus};
pub use specialists::{read_specialists, SpecialistState};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::config::{Policy, Settings};

/// The three agent roles a gummy task can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Plan,
    Execute,
    Task,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Plan, AgentRole::Execute, AgentRole::Task];

    fn log_suffix(self) -> &'static str {
        match self {
            AgentRole::Plan => "plan.log",
            AgentRole::Execute => "execute.log",
            AgentRole::Task => "task.log",
        }
    }

    fn report_suffix(self) -> &'static str {
        match self {
            AgentRole::Plan => "plan-report.md",
            AgentRole::Execute => "execution-report.md",
            AgentRole::Task => "task-report.md",
        }
    }

    /// Panel heading
    pub fn title(self) -> &'static str {
        match self {
            AgentRole::Plan => "PLAN (HAIKU)",
            AgentRole::Execute => "EXECUTE (HAIKU)",
            AgentRole::Task => "TASK (HAIKU)",
        }
    }
}

impl AgentPaths {
    pub fn for_role(logs_dir: &Path, comms_dir: &Path, task_id: &str, role: AgentRole) -> Self {
        Self {
            log: logs_dir.join(format!("{}-{}", task_id, role.log_suffix())),
            report: comms_dir.join(format!("{}-{}", task_id, role.report_suffix())),
        }
    }
}

/// Everything reconciled in one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub planner: AgentState,
    pub executor: AgentState,
    pub task_runner: AgentState,
    pub specialists: Vec<SpecialistState>,
}

impl Snapshot {
    pub fn agent(&self, role: AgentRole) -> &AgentState {
        match role {
            AgentRole::Plan => &self.planner,
            AgentRole::Execute => &self.executor,
            AgentRole::Task => &self.task_runner,
        }
    }
}

/// Re-derives a [`Snapshot`] from disk on every poll.
///
/// Holds configuration only; no state survives between polls.
#[derive(Debug, Clone)]
pub struct Monitor {
    task_id: String,
    planner: AgentPaths,
    executor: AgentPaths,
    task_runner: AgentPaths,
    specialists_root: PathBuf,
    policy: Policy,
}

impl Monitor {
    pub fn new(settings: &Settings) -> Self {
        let paths = |role| {
            AgentPaths::for_role(&settings.logs_dir, &settings.comms_dir, &settings.task_id, role)
        };
        Self {
            task_id: settings.task_id.clone(),
            planner: paths(AgentRole::Plan),
            executor: paths(AgentRole::Execute),
            task_runner: paths(AgentRole::Task),
            specialists_root: settings.specialists_root.clone(),
            policy: settings.policy,
        }
    }

    pub fn paths(&self, role: AgentRole) -> &AgentPaths {
        match role {
            AgentRole::Plan => &self.planner,
            AgentRole::Execute => &self.executor,
            AgentRole::Task => &self.task_runner,
        }
    }

    /// Read every log, report marker and descriptor, sequentially.
    pub fn poll(&self, now: SystemTime) -> Snapshot {
        let snapshot = Snapshot {
            planner: read_agent_state(&self.planner, now, &self.policy),
            executor: read_agent_state(&self.executor, now, &self.policy),
            task_runner: read_agent_state(&self.task_runner, now, &self.policy),
            specialists: read_specialists(&self.specialists_root),
        };
        debug!(
            task_id = %self.task_id,
            plan = snapshot.planner.status.as_str(),
            execute = snapshot.executor.status.as_str(),
            task = snapshot.task_runner.status.as_str(),
            specialists = snapshot.specialists.len(),
            "polled"
        );
        snapshot
    }
}

static RE_PLAN_LOG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(gummy-.+)-plan\.log$").unwrap());

/// Task ID of the newest planning log (`gummy-*-plan.log`) in `logs_dir`.
///
/// Task IDs embed a timestamp, so the lexicographically last one is newest.
pub fn detect_task_id(logs_dir: &Path) -> Option<String> {
    fs::read_dir(logs_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let caps = RE_PLAN_LOG.captures(name.to_str()?)?;
            Some(caps[1].to_string())
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_paths_per_role() {
        let logs = Path::new("/logs");
        let comms = Path::new("/comms");
        let exec = AgentPaths::for_role(logs, comms, "gummy-5", AgentRole::Execute);
        assert_eq!(exec.log, logs.join("gummy-5-execute.log"));
        assert_eq!(exec.report, comms.join("gummy-5-execution-report.md"));

        let plan = AgentPaths::for_role(logs, comms, "gummy-5", AgentRole::Plan);
        assert_eq!(plan.log, logs.join("gummy-5-plan.log"));
        assert_eq!(plan.report, comms.join("gummy-5-plan-report.md"));
    }

    #[test]
    fn test_detect_picks_newest_plan_log() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "gummy-20261001-plan.log",
            "gummy-20261019-plan.log",
            "gummy-20261019-execute.log",
            "gummy-20261101-task.log",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(detect_task_id(dir.path()), Some("gummy-20261019".to_string()));
    }

    #[test]
    fn test_detect_in_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_task_id(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_poll_rederives_everything() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let comms = dir.path().join("comms");
        fs::create_dir_all(&logs).unwrap();
        fs::create_dir_all(&comms).unwrap();

        let settings = Settings {
            task_id: "gummy-9".to_string(),
            logs_dir: logs,
            comms_dir: comms,
            specialists_root: dir.path().to_path_buf(),
            policy: Policy::default(),
            tick: Duration::from_secs(1),
        };
        let monitor = Monitor::new(&settings);
        let now = SystemTime::now() + Duration::from_secs(1);

        let empty = monitor.poll(now);
        assert_eq!(empty.planner.status, AgentStatus::NotStarted);
        assert_eq!(empty.executor.status, AgentStatus::NotStarted);
        assert_eq!(empty.task_runner.status, AgentStatus::NotStarted);

        fs::write(
            &monitor.paths(AgentRole::Plan).log,
            "{\"type\":\"system\",\"session_id\":\"p1\"}\n{\"type\":\"result\",\"num_turns\":3}\n",
        )
        .unwrap();
        let done = monitor.poll(now);
        assert_eq!(done.agent(AgentRole::Plan).status, AgentStatus::Completed);
        assert_eq!(done.planner.turns, 3);

        fs::remove_file(&monitor.paths(AgentRole::Plan).log).unwrap();
        assert_eq!(monitor.poll(now).planner, AgentState::default());
    }
}
