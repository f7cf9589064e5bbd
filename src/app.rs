use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::actions::Action;
use crate::display::{
    agent_panel, copy_target, markdown_lines, overall_banner, select_panel, specialist_line,
    AgentPanel, MdKind, PanelBody, StatusLabels,
};
use crate::monitor::{AgentRole, AgentStatus, Snapshot};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Ticks a feedback message stays in the footer
const MESSAGE_TICKS: u8 = 2;

/// Theme colors
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub text: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub plan: Color,
    pub execute: Color,
    pub task: Color,
    pub specialist: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Indexed(212),
            dim: Color::Indexed(240),
            text: Color::Indexed(250),
            success: Color::Indexed(82),
            warning: Color::Indexed(208),
            error: Color::Indexed(196),
            plan: Color::Indexed(212),
            execute: Color::Indexed(51),
            task: Color::Indexed(208),
            specialist: Color::Indexed(141),
        }
    }
}

impl Theme {
    fn role(&self, role: AgentRole) -> Color {
        match role {
            AgentRole::Plan => self.plan,
            AgentRole::Execute => self.execute,
            AgentRole::Task => self.task,
        }
    }

    fn status(&self, status: AgentStatus) -> Color {
        match status {
            AgentStatus::NotStarted => self.dim,
            AgentStatus::Running => Color::Indexed(46),
            AgentStatus::Completed => self.success,
            AgentStatus::Failed => self.error,
            AgentStatus::Stopped => self.warning,
        }
    }

    fn specialist(&self, status: &str) -> Color {
        match status {
            "active" => Color::Indexed(46),
            "dormant" => Color::Indexed(99),
            "new" => self.specialist,
            _ => self.dim,
        }
    }
}

/// Footer message with its remaining lifetime
struct Notice {
    text: String,
    is_error: bool,
    ticks_left: u8,
}

/// Main application state
pub struct App {
    /// Task being followed
    pub task_id: String,
    /// Latest reconciled state, replaced wholesale every tick
    pub snapshot: Snapshot,
    pub labels: StatusLabels,
    pub theme: Theme,
    /// Vertical scroll offset of the main view
    scroll: u16,
    /// Largest useful scroll offset as of the last render
    max_scroll: u16,
    spinner_frame: usize,
    notice: Option<Notice>,
    /// Pending action queue
    pending_actions: Vec<Action>,
}

impl App {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            snapshot: Snapshot::default(),
            labels: StatusLabels::default(),
            theme: Theme::default(),
            scroll: 0,
            max_scroll: 0,
            spinner_frame: 0,
            notice: None,
            pending_actions: Vec::new(),
        }
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Show a message in the footer for a couple of ticks
    pub fn notify(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
            ticks_left: MESSAGE_TICKS,
        });
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = snapshot;
                self.on_tick();
                Ok(false)
            }
            Action::Error(msg) => {
                self.notify(msg, true);
                Ok(false)
            }
            Action::CopyFinalMessage(_) => Ok(false),
        }
    }

    fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
        if let Some(notice) = self.notice.as_mut() {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            KeyCode::Char('c') => match copy_target(&self.snapshot).map(str::to_string) {
                Some(text) => self.pending_actions.push(Action::CopyFinalMessage(text)),
                None => self.notify("Nothing to copy yet", true),
            },
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(10),
            KeyCode::PageUp => self.scroll_by(-10),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll,
            _ => {}
        }
        Ok(false)
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).clamp(0, self.max_scroll as i32);
        self.scroll = next as u16;
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Min(0),    // Main content
                Constraint::Length(3), // Footer/status
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_main(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Paragraph::new(vec![
            Line::from(Span::styled(
                "GUMMY AGENT MONITOR",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled("Task ID: ", Style::default().fg(self.theme.dim)),
                Span::styled(&self.task_id, Style::default().fg(self.theme.fg)),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(self.theme.accent)),
        );
        frame.render_widget(title, area);
    }

    fn render_main(&mut self, frame: &mut Frame, area: Rect) {
        let panel = select_panel(&self.snapshot).map(|(role, _)| role);
        let border = panel.map_or(self.theme.dim, |role| self.theme.role(role));
        let title = panel.map_or(" Agents ".to_string(), |role| format!(" {} ", role.title()));

        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(border).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border));

        let inner = block.inner(area);
        let width = inner.width.saturating_sub(2).max(20) as usize;
        let lines = self.content_lines(width);

        self.max_scroll = (lines.len() as u16).saturating_sub(inner.height);
        self.scroll = self.scroll.min(self.max_scroll);

        let content = Paragraph::new(lines)
            .block(block)
            .scroll((self.scroll, 0));
        frame.render_widget(content, area);
    }

    fn content_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        match select_panel(&self.snapshot) {
            Some((_, state)) => {
                let panel = agent_panel(state, width, &self.labels);
                self.push_panel(&mut lines, panel, width);
            }
            None => lines.push(Line::from(Span::styled(
                "Waiting for agents to start...",
                Style::default().fg(self.theme.dim),
            ))),
        }

        if let Some(banner) = overall_banner(&self.snapshot) {
            let color = if banner.is_success() {
                self.theme.success
            } else {
                self.theme.error
            };
            lines.push(Line::from(""));
            lines.push(
                Line::from(Span::styled(
                    banner.text(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
            );
        }

        if !self.snapshot.specialists.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "═══ PERSISTENT SPECIALISTS ═══",
                Style::default()
                    .fg(self.theme.specialist)
                    .add_modifier(Modifier::BOLD),
            )));
            for spec in &self.snapshot.specialists {
                let line = specialist_line(spec);
                let mut spans = vec![
                    Span::raw("  "),
                    Span::styled(line.glyph, Style::default().fg(self.theme.specialist(&spec.status))),
                    Span::raw(" "),
                    Span::styled(
                        line.name,
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                ];
                for detail in line.details {
                    spans.push(Span::styled(" | ", Style::default().fg(self.theme.dim)));
                    spans.push(Span::styled(detail, Style::default().fg(self.theme.fg)));
                }
                lines.push(Line::from(spans));
            }
        }

        lines
    }

    fn push_panel(&self, lines: &mut Vec<Line<'static>>, panel: AgentPanel, width: usize) {
        let status_color = self.theme.status(panel.status);
        let glyph = if panel.status == AgentStatus::Running {
            SPINNER[self.spinner_frame]
        } else {
            panel.label.glyph
        };

        let mut status = vec![
            Span::styled("Status: ", Style::default().fg(self.theme.dim)),
            Span::styled(
                format!("{} {}", glyph, panel.label.label),
                Style::default().fg(status_color),
            ),
        ];
        for metric in panel.metrics {
            status.push(Span::styled(" | ", Style::default().fg(self.theme.dim)));
            status.push(Span::styled(metric, Style::default().fg(self.theme.fg)));
        }
        lines.push(Line::from(status));
        lines.push(Line::from(""));

        if let Some(session) = panel.session {
            lines.push(Line::from(vec![
                Span::styled("Session: ", Style::default().fg(self.theme.dim)),
                Span::styled(session, Style::default().fg(self.theme.fg)),
            ]));
        }

        if let Some(tool) = panel.current_tool {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("Current Tool: ", Style::default().fg(self.theme.dim)),
                Span::styled(tool, Style::default().fg(self.theme.accent)),
            ]));
        }

        match panel.body {
            Some(PanelBody::FinalMessage(message)) => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Final Message:",
                    Style::default()
                        .fg(self.theme.success)
                        .add_modifier(Modifier::BOLD),
                )));
                for md in markdown_lines(&message, width) {
                    lines.push(Line::from(Span::styled(md.text, self.markdown_style(md.kind))));
                }
            }
            Some(PanelBody::LatestActivity(text)) => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Latest Activity:",
                    Style::default().fg(self.theme.fg),
                )));
                for line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(self.theme.text),
                    )));
                }
            }
            None => {}
        }
    }

    fn markdown_style(&self, kind: MdKind) -> Style {
        match kind {
            MdKind::Heading(1) => Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            MdKind::Heading(_) => Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
            MdKind::Quote => Style::default()
                .fg(self.theme.dim)
                .add_modifier(Modifier::ITALIC),
            MdKind::Code => Style::default().fg(self.theme.warning),
            MdKind::Rule => Style::default().fg(self.theme.dim),
            MdKind::Bullet | MdKind::Text | MdKind::Blank => Style::default().fg(self.theme.text),
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let help_text =
            " q: Quit │ c: Copy final message │ j/k: Scroll │ g/G: Top/Bottom │ Ctrl+C: Exit ";

        let content = match &self.notice {
            Some(notice) => {
                let color = if notice.is_error {
                    self.theme.error
                } else {
                    self.theme.success
                };
                Line::from(Span::styled(
                    format!(" {} ", notice.text),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
            }
            None => Line::from(Span::styled(help_text, Style::default().fg(self.theme.dim))),
        };

        let footer = Paragraph::new(content).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(footer, area);
    }
}
