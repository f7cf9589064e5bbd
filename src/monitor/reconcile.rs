use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use super::events::{parse_events, ContentBlock, LogEvent};
use crate::config::Policy;

/// Status of a monitored agent, derived from its log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// No log has been seen yet
    #[default]
    NotStarted,
    /// Started and still writing to its log
    Running,
    /// Finished cleanly or dropped a report
    Completed,
    /// Finished with an error result
    Failed,
    /// Started, never finished, and has gone quiet
    Stopped,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::NotStarted => "not_started",
            AgentStatus::Running => "running",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::Stopped => "stopped",
        }
    }
}

/// Reconciled view of one agent for a single tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentState {
    pub status: AgentStatus,
    pub session_id: String,
    pub turns: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    /// Name of the last tool invocation seen
    pub current_tool: String,
    /// Last assistant text, cut down for live display
    pub latest_text: String,
    /// Last assistant text, untruncated. This is the last text in the log,
    /// which is not necessarily what the agent said when it finished.
    pub final_message: String,
}

/// Filesystem signals read alongside the log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Liveness {
    /// Last modification time of the log, if it could be read
    pub log_modified: Option<SystemTime>,
    /// Whether the companion report file exists
    pub report_exists: bool,
}

/// Log and report locations for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    pub log: PathBuf,
    pub report: PathBuf,
}

/// Intermediate result of the forward pass over the events
#[derive(Debug, Default)]
pub struct Scan {
    state: AgentState,
    saw_start: bool,
    saw_result: bool,
}

/// Fold the events of an existing log into a scan.
pub fn scan<I>(events: I, policy: &Policy) -> Scan
where
    I: IntoIterator<Item = LogEvent>,
{
    let mut scan = Scan::default();
    let state = &mut scan.state;

    for event in events {
        match event {
            LogEvent::System { session_id } => {
                if let Some(id) = session_id {
                    state.session_id = id;
                    scan.saw_start = true;
                }
            }
            LogEvent::Result {
                num_turns,
                total_cost_usd,
                duration_ms,
                is_error,
            } => {
                scan.saw_result = true;
                state.turns = num_turns;
                state.cost_usd = total_cost_usd;
                state.duration_ms = duration_ms;
                state.status = if is_error {
                    AgentStatus::Failed
                } else {
                    AgentStatus::Completed
                };
            }
            LogEvent::Assistant { message } => {
                for block in message.content {
                    match block {
                        ContentBlock::Text { text } if !text.is_empty() => {
                            state.latest_text = truncate_preview(&text, policy.preview_chars);
                            state.final_message = text;
                        }
                        ContentBlock::ToolUse { name } => state.current_tool = name,
                        _ => {}
                    }
                }
            }
            LogEvent::Ignored => {}
        }
    }

    scan
}

/// Apply the liveness inference and the report override to a scan.
pub fn settle(scan: Scan, liveness: Liveness, now: SystemTime, policy: &Policy) -> AgentState {
    let Scan {
        mut state,
        saw_start,
        saw_result,
    } = scan;

    if !saw_result && saw_start {
        if let Some(modified) = liveness.log_modified {
            // A timestamp in the future counts as a fresh write
            let idle = now.duration_since(modified).unwrap_or(Duration::ZERO);
            state.status = if idle > policy.stale_after {
                AgentStatus::Stopped
            } else {
                AgentStatus::Running
            };
        }
    }

    if liveness.report_exists && state.status != AgentStatus::Failed {
        state.status = AgentStatus::Completed;
    }

    state
}

/// Reconcile the events of an existing log with its filesystem signals.
///
/// Pure: the result depends only on the arguments.
pub fn reconcile<I>(events: I, liveness: Liveness, now: SystemTime, policy: &Policy) -> AgentState
where
    I: IntoIterator<Item = LogEvent>,
{
    settle(scan(events, policy), liveness, now, policy)
}

/// Read one agent's log and report marker and reconcile them.
///
/// Never fails: a log that cannot be opened means the agent has not
/// started, whatever the report says.
pub fn read_agent_state(paths: &AgentPaths, now: SystemTime, policy: &Policy) -> AgentState {
    let file = match File::open(&paths.log) {
        Ok(file) => file,
        Err(_) => return AgentState::default(),
    };

    // Metadata of the open handle, so a rotated log cannot mix two files
    let liveness = Liveness {
        log_modified: file.metadata().and_then(|m| m.modified()).ok(),
        report_exists: paths.report.exists(),
    };

    reconcile(parse_events(BufReader::new(file)), liveness, now, policy)
}

/// Keep the first `limit` characters of `text`, marking the cut with `...`
pub fn truncate_preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
