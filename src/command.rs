//! Commands processed on the serialized execution context.
//!
//! This module defines the vocabulary every trigger source shares: the
//! Unix-socket menu stand-in, the global shortcut dispatcher, and the
//! background capture worker all talk to the
//! [`WorkspaceSwitcher`](crate::switcher::WorkspaceSwitcher) by sending a
//! [`Command`] into one channel.  Only the switcher's thread ever touches the
//! store or calls into the desktop, so two triggers can never interleave
//! their OS calls.
//!
//! Commands that originate inside the daemon (`Activate`,
//! `ShortcutRecorded`, `WindowsEnumerated`) cannot be sent over the wire.

use crate::shortcut::KeyShortcut;
use crate::workspace::{DiscoveredWindow, WorkspaceId};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Selects a workspace on the wire.
///
/// Accepts a UUID string (`Id`), any other string (`Name`, matched
/// case-insensitively) or a non-negative integer (`Index`, 0-based list
/// position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceRef {
    Id(WorkspaceId),
    Name(String),
    Index(usize),
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceRef::Id(id) => write!(f, "{}", id),
            WorkspaceRef::Name(name) => write!(f, "{:?}", name),
            WorkspaceRef::Index(idx) => write!(f, "#{}", idx),
        }
    }
}

impl From<WorkspaceId> for WorkspaceRef {
    fn from(id: WorkspaceId) -> Self {
        WorkspaceRef::Id(id)
    }
}

/// Parse a string selector: a UUID becomes `Id`, anything else `Name`.
fn parse_workspace_ref(s: &str) -> Option<WorkspaceRef> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<WorkspaceId>() {
        Ok(id) => Some(WorkspaceRef::Id(id)),
        Err(_) => Some(WorkspaceRef::Name(trimmed.to_string())),
    }
}

impl<'de> Deserialize<'de> for WorkspaceRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = WorkspaceRef;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "workspace id, name, or list index")
            }
            fn visit_u64<E>(self, n: u64) -> Result<WorkspaceRef, E> {
                Ok(WorkspaceRef::Index(n as usize))
            }
            fn visit_str<E>(self, s: &str) -> Result<WorkspaceRef, E>
            where
                E: DeError,
            {
                parse_workspace_ref(s).ok_or_else(|| DeError::custom("empty workspace selector"))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Capture the current layout as a new workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureRequest {
    /// Defaults to `"Workspace N"`.
    pub name: Option<String>,
    /// [`DiscoveredWindow::id`]s to include; every window when absent.
    pub windows: Option<Vec<String>>,
}

/// Rename an existing workspace or rewrite its windows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditRequest {
    pub workspace: WorkspaceRef,
    #[serde(default)]
    pub name: Option<String>,
    /// Window ids to include.  When absent the saved patterns are kept
    /// as they are and no windows are enumerated.
    #[serde(default)]
    pub windows: Option<Vec<String>>,
}

/// What a background enumeration was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePurpose {
    Create(CaptureRequest),
    Edit {
        workspace: WorkspaceId,
        name: Option<String>,
        windows: Vec<String>,
    },
}

/// Every action the workspace switcher can perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations, the shortcut dispatcher and the capture worker, and
/// consumed by the [`WorkspaceSwitcher`](crate::switcher::WorkspaceSwitcher).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Command {
    /// Mark a workspace active, then apply its layout.
    Switch(WorkspaceRef),

    /// Unhide everything, un-minimize every window and clear the active
    /// workspace.
    ///
    /// On the wire this is encoded as the JSON string `"ShowAll"`.
    ShowAll,

    /// Enumerate windows and save them as a new workspace.
    Capture(CaptureRequest),

    /// Rename a workspace and, with a window list, rewrite its patterns.
    Edit(EditRequest),

    /// Rename a workspace, keeping its windows and shortcut.
    Rename { workspace: WorkspaceRef, name: String },

    /// Delete a workspace.
    Remove(WorkspaceRef),

    /// Arm the shortcut recorder; the next key combination with a modifier
    /// becomes this workspace's shortcut.
    RecordShortcut(WorkspaceRef),

    /// Disarm the shortcut recorder without recording.
    CancelRecording,

    /// Remove a workspace's shortcut.
    ClearShortcut(WorkspaceRef),

    /// End the command loop and tear down the key hook.
    Shutdown,

    //  Internal

    /// A global shortcut matched this workspace.
    #[serde(skip)]
    Activate(WorkspaceId),

    /// The recorder captured a key combination.
    #[serde(skip)]
    ShortcutRecorded {
        workspace: WorkspaceId,
        shortcut: KeyShortcut,
    },

    /// A background enumeration finished.
    #[serde(skip)]
    WindowsEnumerated {
        purpose: CapturePurpose,
        windows: Vec<DiscoveredWindow>,
    },
}
