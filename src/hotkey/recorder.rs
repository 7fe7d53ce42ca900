//! Interactive capture of a new shortcut.
//!
//! `Idle → Recording → Idle`.  While recording, escape cancels, a key with
//! at least one tracked modifier becomes the shortcut, and a bare key is
//! passed through so the user can take their time.

use crate::shortcut::{EventFlags, KeyShortcut, KEY_ESCAPE};
use crate::workspace::WorkspaceId;
use log::{debug, info};

/// Result of offering a key-down to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderOutcome {
    /// The recorder is idle; the event is not its business.
    NotRecording,
    /// No modifier held.  The event goes on to the focused application and
    /// recording continues.
    PassThrough,
    /// Escape was pressed; recording ended without a shortcut.
    Cancelled,
    /// A shortcut was captured for `workspace`; recording ended.
    Recorded {
        workspace: WorkspaceId,
        shortcut: KeyShortcut,
    },
}

impl RecorderOutcome {
    /// Whether the key event should be swallowed.
    pub fn consumes(&self) -> bool {
        matches!(self, RecorderOutcome::Cancelled | RecorderOutcome::Recorded { .. })
    }
}

#[derive(Debug, Default)]
pub struct ShortcutRecorder {
    target: Option<WorkspaceId>,
}

impl ShortcutRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording a shortcut for `workspace`, replacing any session in
    /// progress.
    pub fn start(&mut self, workspace: WorkspaceId) {
        info!("recording shortcut for {}", workspace);
        self.target = Some(workspace);
    }

    /// Abandon the current session.  Returns whether one was in progress.
    pub fn cancel(&mut self) -> bool {
        self.target.take().is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.target.is_some()
    }

    pub fn handle_key(&mut self, key_code: u16, flags: EventFlags) -> RecorderOutcome {
        let Some(workspace) = self.target else {
            return RecorderOutcome::NotRecording;
        };
        if key_code == KEY_ESCAPE {
            debug!("shortcut recording cancelled");
            self.target = None;
            return RecorderOutcome::Cancelled;
        }
        let shortcut = KeyShortcut::from_event(key_code, flags);
        if !shortcut.has_modifier() {
            return RecorderOutcome::PassThrough;
        }
        self.target = None;
        RecorderOutcome::Recorded { workspace, shortcut }
    }
}
