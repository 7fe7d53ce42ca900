//! Core traits that decouple ctxswitch from any specific desktop, input
//! hook, or transport mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket listener, a test harness,
//! …) implements one of these traits.  The
//! [`WorkspaceSwitcher`](crate::switcher::WorkspaceSwitcher) and the
//! [`ShortcutDispatcher`](crate::hotkey::ShortcutDispatcher) only depend on
//! these abstractions.

use crate::command::Command;
use crate::shortcut::EventFlags;
use crate::workspace::{DiscoveredWindow, RunningProcess};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

//  Desktop

/// Abstraction over the host's process and window primitives.
///
/// All calls are fire-and-forget from the caller's point of view: a failed
/// call is logged and the switch continues with the next process or window.
/// Implementations must be [`Send`] + [`Sync`] so enumeration can run on a
/// background worker while the serialized context keeps going.
pub trait Desktop: Send + Sync {
    /// The error type produced by this desktop.
    type Error: std::error::Error + Send + 'static;

    /// Every running top-level process, including background ones.
    fn running_processes(&self) -> Result<Vec<RunningProcess>, Self::Error>;

    /// A fresh snapshot of every discoverable window.
    ///
    /// Returned windows must already carry their
    /// [`stable_identity_name`](DiscoveredWindow::stable_identity_name).
    fn enumerate_windows(&self) -> Result<Vec<DiscoveredWindow>, Self::Error>;

    /// Whether per-window introspection and control is available.  When it
    /// is not, switches degrade to process-level hide/show.
    fn has_elevated_introspection(&self) -> bool;

    /// Unhide every process with this bundle and bring it to the front.
    fn show_process(&self, bundle_identifier: &str) -> Result<(), Self::Error>;

    /// Hide every process with this bundle.
    fn hide_process(&self, bundle_identifier: &str) -> Result<(), Self::Error>;

    /// Un-minimize `window`, raise it within its app, make it the main
    /// window and activate the owning process.
    fn raise(&self, window: &DiscoveredWindow) -> Result<(), Self::Error>;

    /// Minimize `window`.
    fn minimize(&self, window: &DiscoveredWindow) -> Result<(), Self::Error>;
}

//  Key hook

/// Why the host stopped delivering events to an installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisableReason {
    /// The handler took too long to answer.
    Timeout,
    /// The user or the system switched interception off.
    UserInput,
}

/// An event delivered to an installed key hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookEvent {
    /// A hardware key-down, with the raw modifier flags of the event.
    KeyDown {
        key_code: u16,
        #[serde(with = "event_flag_bits")]
        flags: EventFlags,
    },
    /// The host disabled the hook.  No further key events arrive until it
    /// is re-enabled.
    Disabled(DisableReason),
}

/// What the hook should do with the event that was just handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Forward the event to the focused application.
    Pass,
    /// Swallow the event.
    Consume,
}

/// Identifies one installation of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub u64);

/// Control surface handed to the handler alongside every event.
pub trait HookControl {
    /// Turn interception back on after a [`HookEvent::Disabled`].
    ///
    /// Returns `false` if the hook cannot be re-enabled (for instance,
    /// because trust was revoked).
    fn reenable(&self) -> bool;
}

/// A registered handler: invoked synchronously with each event, answers
/// whether to suppress it.
pub type KeyHandler = Box<dyn Fn(HookEvent, &dyn HookControl) -> Disposition + Send + Sync>;

/// Global low-level keyboard interception.
///
/// The handler runs on a latency-sensitive path: it must decide quickly and
/// defer any real work.
pub trait KeyHook {
    /// The error type produced by this hook.
    type Error: std::error::Error + Send + 'static;

    /// Whether the process is allowed to intercept global input.
    fn is_trusted(&self) -> bool;

    /// Start delivering key-down events to `handler`.
    fn install(&mut self, handler: KeyHandler) -> Result<HookHandle, Self::Error>;

    /// Stop delivering events and drop the handler.
    fn remove(&mut self, handle: HookHandle) -> Result<(), Self::Error>;
}

mod event_flag_bits {
    use crate::shortcut::EventFlags;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flags: &EventFlags, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(flags.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EventFlags, D::Error> {
        u64::deserialize(d).map(EventFlags::from_raw)
    }
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, a menu, an
/// in-memory channel) and forward parsed commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
