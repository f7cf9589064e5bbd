use crossterm::event::KeyEvent;

use crate::monitor::Snapshot;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// A tick finished reconciling the logs
    SnapshotUpdated(Snapshot),
    /// An error occurred
    Error(String),
    /// Put a final message on the clipboard
    CopyFinalMessage(String),
}
