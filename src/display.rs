//! Pure projection of reconciled state into display fragments.
//!
//! Nothing here touches the terminal; the app turns these fragments into
//! styled ratatui lines.

use crate::monitor::{AgentRole, AgentState, AgentStatus, Snapshot, SpecialistState};

/// Prefix of a session ID kept on screen
pub const SESSION_PREFIX: usize = 8;

/// Longest specialist name shown before it is cut
pub const SPECIALIST_NAME_MAX: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel {
    pub glyph: &'static str,
    pub label: &'static str,
}

/// Glyph and label for each agent status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabels {
    pub not_started: StatusLabel,
    pub running: StatusLabel,
    pub completed: StatusLabel,
    pub failed: StatusLabel,
    pub stopped: StatusLabel,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            not_started: StatusLabel {
                glyph: "○",
                label: "Waiting",
            },
            running: StatusLabel {
                glyph: "●",
                label: "Running",
            },
            completed: StatusLabel {
                glyph: "✓",
                label: "Completed",
            },
            failed: StatusLabel {
                glyph: "✗",
                label: "Failed",
            },
            stopped: StatusLabel {
                glyph: "◼",
                label: "Stopped",
            },
        }
    }
}

impl StatusLabels {
    pub fn get(&self, status: AgentStatus) -> StatusLabel {
        match status {
            AgentStatus::NotStarted => self.not_started,
            AgentStatus::Running => self.running,
            AgentStatus::Completed => self.completed,
            AgentStatus::Failed => self.failed,
            AgentStatus::Stopped => self.stopped,
        }
    }
}

/// Greedy word wrap.
///
/// Breaks at the last space inside the width window, or hard-breaks at the
/// width when the window has no usable space. Existing newlines are kept and
/// continuation lines lose their leading spaces.
pub fn wrap_text(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut wrapped = String::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= width {
            wrapped.push_str(line);
            wrapped.push('\n');
            continue;
        }

        let mut rest = chars.as_slice();
        while !rest.is_empty() {
            if rest.len() <= width {
                wrapped.extend(rest);
                wrapped.push('\n');
                break;
            }

            let cut = match rest[..width].iter().rposition(|&c| c == ' ') {
                Some(space) if space > 0 => space,
                _ => width,
            };
            wrapped.extend(&rest[..cut]);
            wrapped.push('\n');

            rest = &rest[cut..];
            while let [' ', tail @ ..] = rest {
                rest = tail;
            }
        }
    }

    wrapped.trim_end_matches('\n').to_string()
}

/// First `prefix` characters of `id`, with `...` when something was cut
pub fn short_id(id: &str, prefix: usize) -> String {
    match id.char_indices().nth(prefix) {
        Some((cut, _)) => format!("{}...", &id[..cut]),
        None => id.to_string(),
    }
}

/// Name cut to at most `max` characters, the last one becoming `…`
pub fn short_name(name: &str, max: usize) -> String {
    if max == 0 || name.chars().count() <= max {
        return name.to_string();
    }
    let kept: String = name.chars().take(max - 1).collect();
    format!("{}…", kept)
}

/// Date part of an ISO-8601 timestamp
pub fn date_part(timestamp: &str) -> &str {
    match timestamp.char_indices().nth(10) {
        Some((cut, _)) => &timestamp[..cut],
        None => timestamp,
    }
}

/// The one agent whose panel is shown.
///
/// Task mode wins over execute mode, which wins over plan mode.
pub fn select_panel(snapshot: &Snapshot) -> Option<(AgentRole, &AgentState)> {
    let task = &snapshot.task_runner;
    if task.status != AgentStatus::NotStarted {
        return Some((AgentRole::Task, task));
    }

    let exec = &snapshot.executor;
    if matches!(
        exec.status,
        AgentStatus::Running | AgentStatus::Completed | AgentStatus::Failed
    ) {
        return Some((AgentRole::Execute, exec));
    }

    let plan = &snapshot.planner;
    if plan.status != AgentStatus::NotStarted {
        return Some((AgentRole::Plan, plan));
    }

    None
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    /// Untruncated final message, rendered as markdown
    FinalMessage(String),
    /// Truncated latest text, already wrapped
    LatestActivity(String),
}

/// Display fragments for one agent panel
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPanel {
    pub status: AgentStatus,
    pub label: StatusLabel,
    /// `Turn: 3`, `Cost: $0.0123`, `Duration: 4.5s`; zero values are left out
    pub metrics: Vec<String>,
    pub session: Option<String>,
    pub current_tool: Option<String>,
    pub body: Option<PanelBody>,
}

pub fn agent_panel(state: &AgentState, width: usize, labels: &StatusLabels) -> AgentPanel {
    let mut metrics = Vec::new();
    if state.turns > 0 {
        metrics.push(format!("Turn: {}", state.turns));
    }
    if state.cost_usd > 0.0 {
        metrics.push(format!("Cost: ${:.4}", state.cost_usd));
    }
    if state.duration_ms > 0 {
        metrics.push(format!("Duration: {:.1}s", state.duration_ms as f64 / 1000.0));
    }

    let body = if state.status == AgentStatus::Completed && !state.final_message.is_empty() {
        Some(PanelBody::FinalMessage(state.final_message.clone()))
    } else if !state.latest_text.is_empty() {
        Some(PanelBody::LatestActivity(wrap_text(&state.latest_text, width)))
    } else {
        None
    };

    AgentPanel {
        status: state.status,
        label: labels.get(state.status),
        metrics,
        session: (!state.session_id.is_empty()).then(|| short_id(&state.session_id, SESSION_PREFIX)),
        current_tool: (!state.current_tool.is_empty()).then(|| state.current_tool.clone()),
        body,
    }
}

/// Run-wide outcome line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    TaskCompleted,
    TaskFailed,
    AllCompleted,
    AgentFailed,
}

impl Banner {
    pub fn text(self) -> &'static str {
        match self {
            Banner::TaskCompleted => "✓ TASK COMPLETED",
            Banner::TaskFailed => "✗ TASK FAILED",
            Banner::AllCompleted => "✓ ALL AGENTS COMPLETED",
            Banner::AgentFailed => "✗ AGENT FAILED",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Banner::TaskCompleted | Banner::AllCompleted)
    }
}

pub fn overall_banner(snapshot: &Snapshot) -> Option<Banner> {
    let (plan, exec, task) = (
        snapshot.planner.status,
        snapshot.executor.status,
        snapshot.task_runner.status,
    );
    if task == AgentStatus::Completed {
        Some(Banner::TaskCompleted)
    } else if task == AgentStatus::Failed {
        Some(Banner::TaskFailed)
    } else if plan == AgentStatus::Completed && exec == AgentStatus::Completed {
        Some(Banner::AllCompleted)
    } else if plan == AgentStatus::Failed || exec == AgentStatus::Failed {
        Some(Banner::AgentFailed)
    } else {
        None
    }
}

/// Final message offered for copying: the first completed agent with one,
/// checking task, plan, then execute.
pub fn copy_target(snapshot: &Snapshot) -> Option<&str> {
    [AgentRole::Task, AgentRole::Plan, AgentRole::Execute]
        .into_iter()
        .map(|role| snapshot.agent(role))
        .find(|a| a.status == AgentStatus::Completed && !a.final_message.is_empty())
        .map(|a| a.final_message.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialistLine {
    pub glyph: &'static str,
    pub name: String,
    /// `Session: …`, `Turns: …`, `Last: …` in that order, when known
    pub details: Vec<String>,
}

pub fn specialist_glyph(status: &str) -> &'static str {
    match status {
        "active" => "⚡",
        "dormant" => "💤",
        "new" => "✨",
        _ => "○",
    }
}

pub fn specialist_line(spec: &SpecialistState) -> SpecialistLine {
    let mut details = Vec::new();
    if let Some(session) = spec.session_id.as_deref().filter(|s| !s.is_empty()) {
        details.push(format!("Session: {}", short_id(session, SESSION_PREFIX)));
    }
    if spec.turns > 0 {
        details.push(format!("Turns: {}", spec.turns));
    }
    if let Some(last) = spec.last_active.as_deref() {
        details.push(format!("Last: {}", date_part(last)));
    }

    SpecialistLine {
        glyph: specialist_glyph(&spec.status),
        name: short_name(&spec.name, SPECIALIST_NAME_MAX),
        details,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdKind {
    Heading(u8),
    Bullet,
    Quote,
    Code,
    Rule,
    Text,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdLine {
    pub kind: MdKind,
    pub text: String,
}

impl MdLine {
    fn new(kind: MdKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Block-level markdown projection for the final message.
///
/// Headings, bullets, quotes, fences and rules are recognised. Prose wraps
/// at word boundaries; code is cut at exactly `width` chars so its
/// indentation survives.
pub fn markdown_lines(text: &str, width: usize) -> Vec<MdLine> {
    let mut out = Vec::new();
    let mut in_fence = false;

    for raw in text.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            push_code(&mut out, raw, width);
            continue;
        }
        if trimmed.is_empty() {
            out.push(MdLine::new(MdKind::Blank, ""));
            continue;
        }
        if is_rule(trimmed) {
            out.push(MdLine::new(MdKind::Rule, "─".repeat(width.max(3))));
            continue;
        }

        if let Some(level) = heading_level(trimmed) {
            let title = trimmed[level..].trim();
            push_wrapped(&mut out, MdKind::Heading(level as u8), title, "", width);
        } else if let Some(item) = bullet_item(trimmed) {
            push_wrapped(&mut out, MdKind::Bullet, item, "• ", width);
        } else if let Some(quote) = trimmed.strip_prefix('>') {
            push_wrapped(&mut out, MdKind::Quote, quote.trim_start(), "│ ", width);
        } else {
            push_wrapped(&mut out, MdKind::Text, trimmed, "", width);
        }
    }

    out
}

fn push_code(out: &mut Vec<MdLine>, raw: &str, width: usize) {
    let chars: Vec<char> = raw.chars().collect();
    if width == 0 || chars.len() <= width {
        out.push(MdLine::new(MdKind::Code, raw));
        return;
    }
    for chunk in chars.chunks(width) {
        out.push(MdLine::new(MdKind::Code, chunk.iter().collect::<String>()));
    }
}

fn push_wrapped(out: &mut Vec<MdLine>, kind: MdKind, text: &str, marker: &str, width: usize) {
    let indent = marker.chars().count();
    let inner = width.saturating_sub(indent).max(1);
    let pad = " ".repeat(indent);
    for (i, line) in wrap_text(&strip_emphasis(text), inner).lines().enumerate() {
        let lead = if i == 0 { marker } else { pad.as_str() };
        out.push(MdLine::new(kind, format!("{}{}", lead, line)));
    }
}

fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|&c| c == '#').count();
    let rest = &line[level..];
    ((1..=6).contains(&level) && (rest.is_empty() || rest.starts_with(' '))).then_some(level)
}

fn bullet_item(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3 && ['-', '*', '_'].iter().any(|&m| compact.chars().all(|c| c == m))
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "").replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: AgentStatus) -> AgentState {
        AgentState {
            status,
            ..Default::default()
        }
    }

    fn snapshot(plan: AgentStatus, exec: AgentStatus, task: AgentStatus) -> Snapshot {
        Snapshot {
            planner: state(plan),
            executor: state(exec),
            task_runner: state(task),
            specialists: Vec::new(),
        }
    }

    #[test]
    fn test_wrap_hard_breaks_without_spaces() {
        assert_eq!(wrap_text("abcdefghij", 4), "abcd\nefgh\nij");
    }

    #[test]
    fn test_wrap_breaks_at_last_space() {
        assert_eq!(wrap_text("hello world again", 8), "hello\nworld\nagain");
        assert_eq!(wrap_text("one two three", 9), "one two\nthree");
    }

    #[test]
    fn test_wrap_strips_continuation_spaces() {
        assert_eq!(wrap_text("aaaa  bbbb", 5), "aaaa\nbbbb");
    }

    #[test]
    fn test_wrap_leading_space_is_not_a_break() {
        assert_eq!(wrap_text(" abcdefg", 4), " abc\ndefg");
    }

    #[test]
    fn test_wrap_keeps_line_breaks() {
        assert_eq!(wrap_text("short\n\nlines here", 20), "short\n\nlines here");
        assert_eq!(wrap_text("ab cd\nefgh ij", 4), "ab\ncd\nefgh\nij");
    }

    #[test]
    fn test_wrap_zero_width_is_identity() {
        assert_eq!(wrap_text("anything at all\n", 0), "anything at all\n");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef", 8), "01234567...");
        assert_eq!(short_id("01234567", 8), "01234567");
        assert_eq!(short_id("abc", 8), "abc");
    }

    #[test]
    fn test_short_name_and_date() {
        assert_eq!(short_name("frontend-wizard", 10), "frontend-…");
        assert_eq!(short_name("db", 10), "db");
        assert_eq!(date_part("2026-10-18T21:04:00Z"), "2026-10-18");
        assert_eq!(date_part("2026"), "2026");
    }

    #[test]
    fn test_status_labels_cover_all_states() {
        let labels = StatusLabels::default();
        assert_eq!(labels.get(AgentStatus::NotStarted).label, "Waiting");
        assert_eq!(labels.get(AgentStatus::Running).glyph, "●");
        assert_eq!(labels.get(AgentStatus::Completed).glyph, "✓");
        assert_eq!(labels.get(AgentStatus::Failed).glyph, "✗");
        assert_eq!(labels.get(AgentStatus::Stopped).label, "Stopped");
    }

    #[test]
    fn test_panel_priority() {
        use AgentStatus::*;

        assert_eq!(select_panel(&snapshot(NotStarted, NotStarted, NotStarted)), None);
        let pick = |s: Snapshot| select_panel(&s).map(|(role, _)| role);

        assert_eq!(pick(snapshot(Completed, Running, Stopped)), Some(AgentRole::Task));
        assert_eq!(pick(snapshot(Completed, Failed, NotStarted)), Some(AgentRole::Execute));
        // A stopped executor falls back to the planner
        assert_eq!(pick(snapshot(Completed, Stopped, NotStarted)), Some(AgentRole::Plan));
        assert_eq!(pick(snapshot(Running, NotStarted, NotStarted)), Some(AgentRole::Plan));
        assert_eq!(pick(snapshot(NotStarted, Stopped, NotStarted)), None);
    }

    #[test]
    fn test_panel_shows_final_message_when_completed() {
        let agent = AgentState {
            status: AgentStatus::Completed,
            session_id: "abcdef0123456789".to_string(),
            turns: 3,
            cost_usd: 0.01234,
            duration_ms: 4500,
            current_tool: "Write".to_string(),
            latest_text: "done...".to_string(),
            final_message: "# Done\nAll good".to_string(),
        };
        let panel = agent_panel(&agent, 40, &StatusLabels::default());
        assert_eq!(panel.metrics, vec!["Turn: 3", "Cost: $0.0123", "Duration: 4.5s"]);
        assert_eq!(panel.session.as_deref(), Some("abcdef01..."));
        assert_eq!(panel.current_tool.as_deref(), Some("Write"));
        assert_eq!(panel.body, Some(PanelBody::FinalMessage("# Done\nAll good".to_string())));
    }

    #[test]
    fn test_panel_shows_latest_activity_while_running() {
        let agent = AgentState {
            status: AgentStatus::Running,
            latest_text: "reading the files now".to_string(),
            final_message: "reading the files now".to_string(),
            ..Default::default()
        };
        let panel = agent_panel(&agent, 10, &StatusLabels::default());
        assert!(panel.metrics.is_empty());
        assert_eq!(panel.session, None);
        assert_eq!(
            panel.body,
            Some(PanelBody::LatestActivity("reading\nthe files\nnow".to_string()))
        );
    }

    #[test]
    fn test_banner_priority() {
        use AgentStatus::*;
        assert_eq!(overall_banner(&snapshot(Failed, Failed, Completed)), Some(Banner::TaskCompleted));
        assert_eq!(overall_banner(&snapshot(Completed, Completed, Failed)), Some(Banner::TaskFailed));
        assert_eq!(overall_banner(&snapshot(Completed, Completed, Running)), Some(Banner::AllCompleted));
        assert_eq!(overall_banner(&snapshot(Completed, Failed, NotStarted)), Some(Banner::AgentFailed));
        assert_eq!(overall_banner(&snapshot(Completed, Running, NotStarted)), None);
    }

    #[test]
    fn test_copy_target_order() {
        let mut snap = snapshot(AgentStatus::Completed, AgentStatus::Completed, AgentStatus::Running);
        snap.planner.final_message = "plan".to_string();
        snap.executor.final_message = "exec".to_string();
        snap.task_runner.final_message = "task".to_string();
        assert_eq!(copy_target(&snap), Some("plan"));

        snap.task_runner.status = AgentStatus::Completed;
        assert_eq!(copy_target(&snap), Some("task"));

        snap.planner.final_message.clear();
        snap.task_runner.status = AgentStatus::Failed;
        assert_eq!(copy_target(&snap), Some("exec"));
    }

    #[test]
    fn test_specialist_line() {
        let spec = SpecialistState {
            name: "api-designer".to_string(),
            status: "dormant".to_string(),
            session_id: Some("1234567890".to_string()),
            turns: 7,
            last_active: Some("2026-10-17T10:00:00Z".to_string()),
            created: None,
        };
        let line = specialist_line(&spec);
        assert_eq!(line.glyph, "💤");
        assert_eq!(line.name, "api-designer");
        assert_eq!(
            line.details,
            vec!["Session: 12345678...", "Turns: 7", "Last: 2026-10-17"]
        );

        let bare = specialist_line(&SpecialistState {
            name: "x".to_string(),
            status: "mystery".to_string(),
            ..Default::default()
        });
        assert_eq!(bare.glyph, "○");
        assert!(bare.details.is_empty());
    }

    #[test]
    fn test_markdown_blocks() {
        let text = "# Summary\n\nChanged **two** files:\n- `src/main.rs`\n- docs\n\n```rust\nfn main() {}\n```\n---\n> note";
        let lines = markdown_lines(text, 40);
        let kinds: Vec<_> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MdKind::Heading(1),
                MdKind::Blank,
                MdKind::Text,
                MdKind::Bullet,
                MdKind::Bullet,
                MdKind::Blank,
                MdKind::Code,
                MdKind::Rule,
                MdKind::Quote,
            ]
        );
        assert_eq!(lines[0].text, "Summary");
        assert_eq!(lines[2].text, "Changed two files:");
        assert_eq!(lines[3].text, "• src/main.rs");
        assert_eq!(lines[6].text, "fn main() {}");
        assert_eq!(lines[8].text, "│ note");
    }

    #[test]
    fn test_markdown_wraps_bullets_with_hanging_indent() {
        let lines = markdown_lines("- alpha beta gamma", 10);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["• alpha", "  beta", "  gamma"]);
    }

    #[test]
    fn test_markdown_wraps_long_code_lines() {
        let code = format!("    {}", "x".repeat(46));
        let lines = markdown_lines(&format!("```\n{}\nok\n```", code), 20);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert!(lines.iter().all(|l| l.kind == MdKind::Code));
        assert_eq!(texts.len(), 4);
        assert!(texts.iter().all(|t| t.chars().count() <= 20));
        assert!(texts[0].starts_with("    x"));
        assert_eq!(texts[..3].concat(), code);
        assert_eq!(texts[3], "ok");
    }

    #[test]
    fn test_hashtag_is_not_a_heading() {
        assert_eq!(markdown_lines("#hashtag", 20)[0].kind, MdKind::Text);
    }
}
