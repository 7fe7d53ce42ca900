//! Global shortcut handling.
//!
//! The [`ShortcutDispatcher`] installs itself on a
//! [`KeyHook`](crate::traits::KeyHook) and decides, synchronously and
//! without touching the store, whether each key-down belongs to a workspace.
//! Matching reads a [`ShortcutTable`] that the store keeps current through a
//! change callback; the actual switch is deferred to the serialized command
//! loop.  While a [`ShortcutRecorder`] is armed, key-downs go to the
//! recorder instead.

pub mod dispatcher;
pub mod recorder;
pub mod table;

pub use dispatcher::{DispatcherError, DispatcherState, RecorderHandle, ShortcutDispatcher};
pub use recorder::{RecorderOutcome, ShortcutRecorder};
pub use table::ShortcutTable;
