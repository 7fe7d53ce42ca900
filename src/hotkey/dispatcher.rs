//! The global shortcut dispatcher.
//!
//! Lifecycle: `Stopped → Active` when [`start`](ShortcutDispatcher::start)
//! succeeds on a trusted hook, `Active → Stopped` on
//! [`stop`](ShortcutDispatcher::stop) or when the host refuses to re-enable
//! a disabled hook.
//!
//! The handler installed on the hook runs on the host's input path.  It
//! only reads the [`ShortcutTable`], consults the recorder, and pushes a
//! [`Command`] into the serialized loop; it never calls into the desktop or
//! the store.

use super::recorder::{RecorderOutcome, ShortcutRecorder};
use super::table::ShortcutTable;
use crate::command::Command;
use crate::shortcut::EventFlags;
use crate::traits::{Disposition, HookControl, HookEvent, HookHandle, KeyHook};
use crate::workspace::WorkspaceId;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};

/// Possible errors from the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    /// The process may not intercept global input.
    #[error("global input interception is not permitted")]
    NotTrusted,
    /// The hook backend returned an error.
    #[error("key hook error: {0}")]
    Hook(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Stopped,
    Active,
}

/// State reachable from the hook callback.
struct Shared {
    table: ShortcutTable,
    sink: mpsc::Sender<Command>,
    recorder: Mutex<ShortcutRecorder>,
    active: AtomicBool,
    reenabled: AtomicU64,
}

impl Shared {
    fn handle(&self, event: HookEvent, control: &dyn HookControl) -> Disposition {
        match event {
            HookEvent::Disabled(reason) => {
                warn!("key hook disabled ({:?}), re-enabling", reason);
                if control.reenable() {
                    self.reenabled.fetch_add(1, Ordering::Relaxed);
                } else {
                    warn!("key hook could not be re-enabled, global shortcuts are off");
                    self.active.store(false, Ordering::SeqCst);
                }
                Disposition::Pass
            }
            HookEvent::KeyDown { key_code, flags } => self.key_down(key_code, flags),
        }
    }

    fn key_down(&self, key_code: u16, flags: EventFlags) -> Disposition {
        if let Some(disposition) = self.offer_to_recorder(key_code, flags) {
            return disposition;
        }

        if !flags.intersects(EventFlags::TRACKED) {
            return Disposition::Pass;
        }

        let Some(workspace) = self.table.lookup(key_code, flags) else {
            return Disposition::Pass;
        };
        debug!("shortcut matched workspace {}", workspace);
        match self.sink.send(Command::Activate(workspace)) {
            Ok(()) => Disposition::Consume,
            Err(_) => {
                debug!("command loop gone, passing shortcut through");
                Disposition::Pass
            }
        }
    }

    /// `None` when the recorder is idle.
    fn offer_to_recorder(&self, key_code: u16, flags: EventFlags) -> Option<Disposition> {
        let mut recorder = self.recorder.lock().ok()?;
        let outcome = recorder.handle_key(key_code, flags);
        drop(recorder);
        match outcome {
            RecorderOutcome::NotRecording => return None,
            RecorderOutcome::Recorded { workspace, shortcut } => {
                let _ = self.sink.send(Command::ShortcutRecorded { workspace, shortcut });
            }
            RecorderOutcome::PassThrough | RecorderOutcome::Cancelled => {}
        }
        Some(if outcome.consumes() {
            Disposition::Consume
        } else {
            Disposition::Pass
        })
    }
}

/// Arms and disarms the dispatcher's shortcut recorder from the command
/// loop.
#[derive(Clone)]
pub struct RecorderHandle {
    shared: Arc<Shared>,
}

impl RecorderHandle {
    pub fn start(&self, workspace: WorkspaceId) {
        if let Ok(mut recorder) = self.shared.recorder.lock() {
            recorder.start(workspace);
        }
    }

    pub fn cancel(&self) -> bool {
        self.shared
            .recorder
            .lock()
            .map(|mut r| r.cancel())
            .unwrap_or(false)
    }

    pub fn is_recording(&self) -> bool {
        self.shared
            .recorder
            .lock()
            .map(|r| r.is_recording())
            .unwrap_or(false)
    }
}

/// Routes global key-downs to workspace activations.
pub struct ShortcutDispatcher {
    shared: Arc<Shared>,
    handle: Option<HookHandle>,
}

impl ShortcutDispatcher {
    /// `table` is read on every key-down; matched workspaces are sent to
    /// `sink` as [`Command::Activate`].
    pub fn new(table: ShortcutTable, sink: mpsc::Sender<Command>) -> Self {
        Self {
            shared: Arc::new(Shared {
                table,
                sink,
                recorder: Mutex::new(ShortcutRecorder::new()),
                active: AtomicBool::new(false),
                reenabled: AtomicU64::new(0),
            }),
            handle: None,
        }
    }

    pub fn state(&self) -> DispatcherState {
        if self.handle.is_some() && self.shared.active.load(Ordering::SeqCst) {
            DispatcherState::Active
        } else {
            DispatcherState::Stopped
        }
    }

    /// How many times the hook was switched back on after the host
    /// disabled it.
    pub fn reenable_count(&self) -> u64 {
        self.shared.reenabled.load(Ordering::Relaxed)
    }

    pub fn recorder(&self) -> RecorderHandle {
        RecorderHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Install on `hook`.  A no-op when already active.
    pub fn start<H: KeyHook>(&mut self, hook: &mut H) -> Result<(), DispatcherError> {
        if self.state() == DispatcherState::Active {
            return Ok(());
        }
        if let Some(stale) = self.handle.take() {
            let _ = hook.remove(stale);
        }
        if !hook.is_trusted() {
            warn!("global shortcuts unavailable: input interception not permitted");
            return Err(DispatcherError::NotTrusted);
        }
        let shared = Arc::clone(&self.shared);
        let handle = hook
            .install(Box::new(move |event, control| shared.handle(event, control)))
            .map_err(|e| DispatcherError::Hook(e.to_string()))?;
        self.handle = Some(handle);
        self.shared.active.store(true, Ordering::SeqCst);
        info!("global shortcut dispatcher started");
        Ok(())
    }

    /// Remove from `hook`.  A no-op when already stopped.
    pub fn stop<H: KeyHook>(&mut self, hook: &mut H) -> Result<(), DispatcherError> {
        self.shared.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            hook.remove(handle)
                .map_err(|e| DispatcherError::Hook(e.to_string()))?;
            info!("global shortcut dispatcher stopped");
        }
        Ok(())
    }

    /// Run one event through the same path the installed handler uses.
    pub fn handle_event(&self, event: HookEvent, control: &dyn HookControl) -> Disposition {
        self.shared.handle(event, control)
    }
}
