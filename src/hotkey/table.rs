//! Read-mostly snapshot of every bound shortcut, in store order.

use crate::shortcut::{EventFlags, KeyShortcut};
use crate::store::ChangeCallback;
use crate::workspace::{WorkspaceConfiguration, WorkspaceId};
use std::sync::{Arc, RwLock};

/// Shortcut bindings shared between the store (writer) and the hook
/// callback (reader).  Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    bindings: Arc<RwLock<Vec<(WorkspaceId, KeyShortcut)>>>,
}

impl ShortcutTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the store's ordered list.
    pub fn replace(&self, workspaces: &[WorkspaceConfiguration]) {
        let fresh: Vec<(WorkspaceId, KeyShortcut)> = workspaces
            .iter()
            .filter_map(|w| w.shortcut.map(|s| (w.id, s)))
            .collect();
        if let Ok(mut bindings) = self.bindings.write() {
            *bindings = fresh;
        }
    }

    /// A store change callback that keeps this table current.
    pub fn observer(&self) -> ChangeCallback {
        let table = self.clone();
        Box::new(move |workspaces| table.replace(workspaces))
    }

    /// The first workspace, in store order, whose shortcut matches the
    /// event.
    pub fn lookup(&self, key_code: u16, flags: EventFlags) -> Option<WorkspaceId> {
        let bindings = self.bindings.read().ok()?;
        bindings
            .iter()
            .find(|(_, shortcut)| shortcut.matches(key_code, flags))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.bindings.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
