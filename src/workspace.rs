//! Workspace data model and the window-matching rule.
//!
//! [`DiscoveredWindow`] and [`RunningProcess`] are live snapshots produced
//! by a [`Desktop`](crate::traits::Desktop) and never persisted.
//! [`WindowIdentifier`] and [`WorkspaceConfiguration`] are the persisted
//! side: patterns that are matched against whatever windows exist at the
//! moment a workspace is switched to.

use crate::shortcut::KeyShortcut;
use crate::title::TitleRules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//  Live snapshots

/// How a running process participates in the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// An ordinary application with windows and a dock/taskbar presence.
    Regular,
    /// A helper that may own windows but is not user-facing.
    Accessory,
    /// A background process.
    Prohibited,
}

/// A running top-level process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningProcess {
    pub app_name: String,
    pub bundle_identifier: String,
    pub process_id: u32,
    pub policy: ActivationPolicy,
}

impl RunningProcess {
    pub fn is_regular(&self) -> bool {
        self.policy == ActivationPolicy::Regular
    }
}

/// A window found by one enumeration pass.
///
/// `window_index` (and therefore [`id`](Self::id)) is only meaningful for
/// the lifetime of the owning process; a restarted app reuses indices for
/// unrelated windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredWindow {
    pub app_name: String,
    pub bundle_identifier: String,
    pub process_id: u32,
    /// Raw title; changes with the current tab, file or branch.
    pub window_title: String,
    /// 0-based position within the owning process's window list.
    pub window_index: usize,
    pub is_minimized: bool,
    /// Backend-specific handle used to act on the window.
    pub handle: String,
    /// Title-derived name that survives tab/file switches.  Filled by
    /// [`identify`](Self::identify).
    pub stable_identity_name: String,
}

impl DiscoveredWindow {
    /// `"<bundle>:<index>"`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.bundle_identifier, self.window_index)
    }

    /// Compute the stable identity name from the raw title.
    pub fn identify(mut self, rules: &TitleRules) -> Self {
        self.stable_identity_name = rules.extract_stable_name(&self.bundle_identifier, &self.window_title);
        self
    }
}

//  Persisted patterns

/// A pattern selecting windows of one application.
///
/// Serialized as
/// `{"bundleIdentifier": "...", "titlePattern": "...", "windowID": "..."}`
/// with `windowID` omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowIdentifier {
    pub bundle_identifier: String,
    /// Case-insensitive substring; empty matches every window of the app.
    pub title_pattern: String,
    /// [`DiscoveredWindow::id`] captured at save time.
    #[serde(rename = "windowID", default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
}

impl WindowIdentifier {
    /// A pattern matching every window of `bundle_identifier`.
    pub fn wildcard(bundle_identifier: impl Into<String>) -> Self {
        Self {
            bundle_identifier: bundle_identifier.into(),
            title_pattern: String::new(),
            window_id: None,
        }
    }

    /// A pattern matching windows whose title contains `title_pattern`.
    pub fn titled(bundle_identifier: impl Into<String>, title_pattern: impl Into<String>) -> Self {
        Self {
            bundle_identifier: bundle_identifier.into(),
            title_pattern: title_pattern.into(),
            window_id: None,
        }
    }

    pub fn with_window_id(mut self, window_id: impl Into<String>) -> Self {
        self.window_id = Some(window_id.into());
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.title_pattern.is_empty()
    }

    /// Whether this pattern selects `window`.
    ///
    /// Bundle must be equal; then an equal `window_id` wins outright; then
    /// an empty pattern matches; otherwise the raw title or the stable name
    /// must contain the pattern, ignoring case.
    pub fn matches(&self, window: &DiscoveredWindow) -> bool {
        if window.bundle_identifier != self.bundle_identifier {
            return false;
        }
        if self.window_id.as_deref() == Some(window.id().as_str()) {
            return true;
        }
        self.matches_title(window)
    }

    /// Like [`matches`](Self::matches), but the `window_id` fast path only
    /// counts when `sessions` confirms the window still belongs to the
    /// process it was captured from.
    pub fn matches_in(&self, window: &DiscoveredWindow, sessions: &WindowSessions) -> bool {
        if window.bundle_identifier != self.bundle_identifier {
            return false;
        }
        if let Some(id) = self.window_id.as_deref() {
            if id == window.id() && sessions.is_live(id, window.process_id) {
                return true;
            }
        }
        self.matches_title(window)
    }

    fn matches_title(&self, window: &DiscoveredWindow) -> bool {
        if self.title_pattern.is_empty() {
            return true;
        }
        let pattern = self.title_pattern.to_lowercase();
        window.window_title.to_lowercase().contains(&pattern)
            || window.stable_identity_name.to_lowercase().contains(&pattern)
    }
}

/// Owner process of every `window_id` captured during this run.
///
/// Window ids are positional, so after an app restarts the same id names a
/// different window.  Ids with no record here (for instance, loaded from
/// disk) are never trusted.
#[derive(Debug, Clone, Default)]
pub struct WindowSessions {
    owners: HashMap<String, u32>,
}

impl WindowSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `window` currently belongs to its process.
    pub fn record(&mut self, window: &DiscoveredWindow) {
        self.owners.insert(window.id(), window.process_id);
    }

    /// Whether `window_id` was captured from process `process_id`.
    pub fn is_live(&self, window_id: &str, process_id: u32) -> bool {
        self.owners.get(window_id) == Some(&process_id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

//  Workspaces

/// Opaque workspace identity, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WorkspaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A named, ordered set of window patterns plus an optional shortcut.
///
/// At most one workspace is active at a time; that is enforced by
/// [`WorkspaceStore::activate`](crate::store::WorkspaceStore::activate),
/// not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfiguration {
    pub id: WorkspaceId,
    pub name: String,
    pub window_identifiers: Vec<WindowIdentifier>,
    pub is_active: bool,
    pub display_order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<KeyShortcut>,
    pub created_at: DateTime<Utc>,
}

impl WorkspaceConfiguration {
    pub fn new(name: impl Into<String>, window_identifiers: Vec<WindowIdentifier>) -> Self {
        Self {
            id: WorkspaceId::new(),
            name: name.into(),
            window_identifiers,
            is_active: false,
            display_order: 0,
            shortcut: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_shortcut(mut self, shortcut: KeyShortcut) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    /// Distinct bundle identifiers referenced by the workspace.
    pub fn bundle_identifiers(&self) -> BTreeSet<&str> {
        self.window_identifiers
            .iter()
            .map(|i| i.bundle_identifier.as_str())
            .collect()
    }
}
