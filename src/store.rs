//! The canonical, single-writer list of workspaces.
//!
//! [`WorkspaceStore`] is the only legal way to change the workspace list.
//! Every mutation is written through to a [`Repository`] before the call
//! returns, and then announced to registered change callbacks (the shortcut
//! table, a menu, a HUD, …).  The store itself knows nothing about who is
//! listening.
//!
//! When the repository fails to write, the in-memory list still reflects the
//! change and stays the source of truth for the running session; the caller
//! receives [`StoreError::Persist`] and decides how to surface it.

use crate::command::WorkspaceRef;
use crate::shortcut::KeyShortcut;
use crate::workspace::{WindowIdentifier, WorkspaceConfiguration, WorkspaceId};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Errors from loading, saving or addressing workspaces.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed workspace file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),
    /// The change was applied in memory but could not be written.
    #[error("change kept in memory only: {0}")]
    Persist(#[source] Box<StoreError>),
}

/// Durable storage for the ordered workspace list.
pub trait Repository: Send {
    fn load(&self) -> Result<Vec<WorkspaceConfiguration>, StoreError>;
    fn save(&self, workspaces: &[WorkspaceConfiguration]) -> Result<(), StoreError>;
}

/// JSON array on disk, replaced atomically on every save.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `$XDG_DATA_HOME/ctxswitch/workspaces.json` (or the platform
    /// equivalent), falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ctxswitch")
            .join("workspaces.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unparseable file is moved: `<file name>.corrupt` beside it.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Repository for JsonFileRepository {
    fn load(&self) -> Result<Vec<WorkspaceConfiguration>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        serde_json::from_str(&contents).map_err(|source| {
            let aside = self.corrupt_path();
            match std::fs::rename(&self.path, &aside) {
                Ok(()) => warn!("moved unreadable {} to {}", self.path.display(), aside.display()),
                Err(e) => warn!("could not move {} aside: {}", self.path.display(), e),
            }
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn save(&self, workspaces: &[WorkspaceConfiguration]) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.io_err(e))?;
        let json = serde_json::to_vec_pretty(workspaces).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| self.io_err(e))?;
        tmp.write_all(&json).map_err(|e| self.io_err(e))?;
        tmp.flush().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }
}

/// In-memory repository; clones share the same backing list.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    saved: Arc<Mutex<Vec<WorkspaceConfiguration>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the last successful save.
    pub fn saved(&self) -> Vec<WorkspaceConfiguration> {
        self.saved.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Make subsequent saves fail, simulating a read-only disk.
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut f) = self.fail_saves.lock() {
            *f = fail;
        }
    }
}

impl Repository for MemoryRepository {
    fn load(&self) -> Result<Vec<WorkspaceConfiguration>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, workspaces: &[WorkspaceConfiguration]) -> Result<(), StoreError> {
        if self.fail_saves.lock().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "saves disabled"),
            });
        }
        if let Ok(mut saved) = self.saved.lock() {
            *saved = workspaces.to_vec();
        }
        Ok(())
    }
}

/// Callback invoked with the full ordered list after every mutation.
pub type ChangeCallback = Box<dyn Fn(&[WorkspaceConfiguration]) + Send>;

/// The workspace list and its write-through persistence.
pub struct WorkspaceStore {
    workspaces: Vec<WorkspaceConfiguration>,
    repository: Box<dyn Repository>,
    observers: Vec<ChangeCallback>,
}

impl WorkspaceStore {
    /// Load the list from `repository`.
    ///
    /// A missing file is an empty list.  A corrupt or unreadable one is
    /// logged and also treated as empty so startup never blocks; the JSON
    /// repository moves a corrupt file aside first.
    pub fn open(repository: impl Repository + 'static) -> Self {
        let workspaces = match repository.load() {
            Ok(list) => {
                info!("loaded {} workspace(s)", list.len());
                list
            }
            Err(e) => {
                warn!("could not load workspaces, starting empty: {}", e);
                Vec::new()
            }
        };
        Self {
            workspaces,
            repository: Box::new(repository),
            observers: Vec::new(),
        }
    }

    /// Register a change callback.  It is called once immediately with the
    /// current list.
    pub fn on_change(&mut self, callback: ChangeCallback) {
        callback(&self.workspaces);
        self.observers.push(callback);
    }

    pub fn list(&self) -> &[WorkspaceConfiguration] {
        &self.workspaces
    }

    pub fn get(&self, id: WorkspaceId) -> Option<&WorkspaceConfiguration> {
        self.workspaces.iter().find(|w| w.id == id)
    }

    /// Resolve a wire selector.  Names compare case-insensitively; the
    /// earliest workspace wins.
    pub fn find(&self, selector: &WorkspaceRef) -> Option<&WorkspaceConfiguration> {
        match selector {
            WorkspaceRef::Id(id) => self.get(*id),
            WorkspaceRef::Name(name) => {
                let wanted = name.to_lowercase();
                self.workspaces.iter().find(|w| w.name.to_lowercase() == wanted)
            }
            WorkspaceRef::Index(idx) => self.workspaces.get(*idx),
        }
    }

    pub fn active(&self) -> Option<&WorkspaceConfiguration> {
        self.workspaces.iter().find(|w| w.is_active)
    }

    /// The earliest workspace other than `except` bound to `shortcut`.
    pub fn shortcut_owner(
        &self,
        shortcut: &KeyShortcut,
        except: Option<WorkspaceId>,
    ) -> Option<&WorkspaceConfiguration> {
        self.workspaces
            .iter()
            .filter(|w| Some(w.id) != except)
            .find(|w| w.shortcut.as_ref() == Some(shortcut))
    }

    /// Append a workspace; its display order becomes the current count.
    pub fn add(&mut self, mut workspace: WorkspaceConfiguration) -> Result<WorkspaceId, StoreError> {
        workspace.display_order = self.workspaces.len();
        if let Some(shortcut) = workspace.shortcut {
            self.warn_on_conflict(&shortcut, workspace.id);
        }
        let id = workspace.id;
        info!("add workspace {:?} ({})", workspace.name, id);
        self.workspaces.push(workspace);
        self.commit()?;
        Ok(id)
    }

    /// Replace name, patterns and shortcut of an existing workspace.
    pub fn update(
        &mut self,
        id: WorkspaceId,
        name: impl Into<String>,
        identifiers: Vec<WindowIdentifier>,
        shortcut: Option<KeyShortcut>,
    ) -> Result<(), StoreError> {
        if let Some(s) = &shortcut {
            self.warn_on_conflict(s, id);
        }
        let ws = self.get_mut(id)?;
        ws.name = name.into();
        ws.window_identifiers = identifiers;
        ws.shortcut = shortcut;
        info!("update workspace {:?} ({})", ws.name, id);
        self.commit()
    }

    pub fn rename(&mut self, id: WorkspaceId, name: impl Into<String>) -> Result<(), StoreError> {
        let ws = self.get_mut(id)?;
        ws.name = name.into();
        self.commit()
    }

    /// Bind (or with `None`, unbind) a shortcut.
    pub fn set_shortcut(&mut self, id: WorkspaceId, shortcut: Option<KeyShortcut>) -> Result<(), StoreError> {
        if let Some(s) = &shortcut {
            self.warn_on_conflict(s, id);
        }
        let ws = self.get_mut(id)?;
        ws.shortcut = shortcut;
        match &shortcut {
            Some(s) => info!("workspace {:?} bound to {}", ws.name, s),
            None => info!("workspace {:?} shortcut cleared", ws.name),
        }
        self.commit()
    }

    pub fn remove(&mut self, id: WorkspaceId) -> Result<(), StoreError> {
        let before = self.workspaces.len();
        self.workspaces.retain(|w| w.id != id);
        if self.workspaces.len() == before {
            return Err(StoreError::NotFound(id));
        }
        info!("removed workspace {}", id);
        self.commit()
    }

    /// Make `id` the only active workspace.
    pub fn activate(&mut self, id: WorkspaceId) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        for ws in &mut self.workspaces {
            ws.is_active = ws.id == id;
        }
        self.commit()
    }

    pub fn deactivate_all(&mut self) -> Result<(), StoreError> {
        for ws in &mut self.workspaces {
            ws.is_active = false;
        }
        self.commit()
    }

    fn get_mut(&mut self, id: WorkspaceId) -> Result<&mut WorkspaceConfiguration, StoreError> {
        self.workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn warn_on_conflict(&self, shortcut: &KeyShortcut, id: WorkspaceId) {
        if let Some(owner) = self.shortcut_owner(shortcut, Some(id)) {
            warn!(
                "shortcut {} is already bound to {:?}; the earlier workspace wins",
                shortcut, owner.name
            );
        }
    }

    /// Write through, then notify.  Observers run even if the write fails.
    fn commit(&mut self) -> Result<(), StoreError> {
        let saved = self.repository.save(&self.workspaces);
        for observer in &self.observers {
            observer(&self.workspaces);
        }
        match saved {
            Ok(()) => {
                debug!("persisted {} workspace(s)", self.workspaces.len());
                Ok(())
            }
            Err(e) => {
                warn!("failed to persist workspaces: {}", e);
                Err(StoreError::Persist(Box::new(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcut::Modifiers;
    use std::sync::mpsc;

    fn ws(name: &str) -> WorkspaceConfiguration {
        WorkspaceConfiguration::new(name, vec![WindowIdentifier::wildcard("com.apple.Terminal")])
    }

    #[test]
    fn add_assigns_display_order() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        store.add(ws("a")).unwrap();
        store.add(ws("b")).unwrap();
        let orders: Vec<usize> = store.list().iter().map(|w| w.display_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn activate_leaves_exactly_one_active() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        let a = store.add(ws("a")).unwrap();
        let b = store.add(ws("b")).unwrap();
        store.activate(a).unwrap();
        store.activate(b).unwrap();
        let active: Vec<WorkspaceId> = store.list().iter().filter(|w| w.is_active).map(|w| w.id).collect();
        assert_eq!(active, vec![b]);
        store.deactivate_all().unwrap();
        assert!(store.active().is_none());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        let missing = WorkspaceId::new();
        assert!(matches!(store.activate(missing), Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove(missing), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(missing, "x", vec![], None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn mutations_write_through() {
        let repo = MemoryRepository::new();
        let mut store = WorkspaceStore::open(repo.clone());
        let a = store.add(ws("a")).unwrap();
        store
            .update(a, "renamed", vec![WindowIdentifier::titled("x", "y")], None)
            .unwrap();
        let saved = repo.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "renamed");
        store.remove(a).unwrap();
        assert!(repo.saved().is_empty());
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let repo = MemoryRepository::new();
        let mut store = WorkspaceStore::open(repo.clone());
        store.add(ws("kept")).unwrap();
        repo.set_fail_saves(true);
        let err = store.add(ws("memory only")).unwrap_err();
        assert!(matches!(err, StoreError::Persist(_)));
        assert_eq!(store.list().len(), 2);
        assert_eq!(repo.saved().len(), 1);
    }

    #[test]
    fn find_by_name_id_and_index() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        let a = store.add(ws("Coding")).unwrap();
        store.add(ws("Mail")).unwrap();
        assert_eq!(store.find(&WorkspaceRef::Name("coding".into())).map(|w| w.id), Some(a));
        assert_eq!(store.find(&WorkspaceRef::Id(a)).map(|w| w.name.as_str()), Some("Coding"));
        assert_eq!(store.find(&WorkspaceRef::Index(1)).map(|w| w.name.as_str()), Some("Mail"));
        assert!(store.find(&WorkspaceRef::Index(2)).is_none());
    }

    #[test]
    fn observers_see_every_change() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        let (tx, rx) = mpsc::channel();
        store.on_change(Box::new(move |list| {
            let _ = tx.send(list.len());
        }));
        store.add(ws("a")).unwrap();
        store.add(ws("b")).unwrap();
        let seen: Vec<usize> = rx.try_iter().collect();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn shortcut_owner_prefers_earliest() {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        let s = KeyShortcut::new(18, Modifiers::CONTROL);
        let a = store.add(ws("a").with_shortcut(s)).unwrap();
        let b = store.add(ws("b").with_shortcut(s)).unwrap();
        assert_eq!(store.shortcut_owner(&s, None).map(|w| w.id), Some(a));
        assert_eq!(store.shortcut_owner(&s, Some(a)).map(|w| w.id), Some(b));
        store.set_shortcut(a, None).unwrap();
        assert_eq!(store.shortcut_owner(&s, None).map(|w| w.id), Some(b));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workspaces.json");

        let shortcut = KeyShortcut::new(19, Modifiers::CONTROL | Modifiers::SHIFT);
        let identifiers = vec![
            WindowIdentifier::wildcard("com.apple.Terminal"),
            WindowIdentifier::titled("com.jetbrains.intellij", "backend")
                .with_window_id("com.jetbrains.intellij:1"),
        ];
        let id = {
            let mut store = WorkspaceStore::open(JsonFileRepository::new(&path));
            store.add(ws("first")).unwrap();
            let id = store
                .add(WorkspaceConfiguration::new("Coding", identifiers.clone()).with_shortcut(shortcut))
                .unwrap();
            store.activate(id).unwrap();
            id
        };

        let store = WorkspaceStore::open(JsonFileRepository::new(&path));
        let names: Vec<&str> = store.list().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["first", "Coding"]);
        let coding = store.get(id).unwrap();
        assert_eq!(coding.window_identifiers, identifiers);
        assert_eq!(coding.shortcut, Some(shortcut));
        assert_eq!(coding.display_order, 1);
        assert!(coding.is_active);
    }

    #[test]
    fn missing_or_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspaces.json");
        assert!(JsonFileRepository::new(&path).load().unwrap().is_empty());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileRepository::new(&path).load(),
            Err(StoreError::Json { .. })
        ));
        assert!(!path.exists());
        std::fs::write(&path, "[ truncated").unwrap();
        let store = WorkspaceStore::open(JsonFileRepository::new(&path));
        assert!(store.list().is_empty());
    }

    #[test]
    fn corrupt_file_survives_the_next_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspaces.json");
        std::fs::write(&path, r#"[{"name": "Coding", "#).unwrap();

        let repo = JsonFileRepository::new(&path);
        let aside = repo.corrupt_path();
        assert_eq!(aside, dir.path().join("workspaces.json.corrupt"));
        let mut store = WorkspaceStore::open(repo);
        store.add(ws("fresh")).unwrap();

        assert_eq!(std::fs::read_to_string(&aside).unwrap(), r#"[{"name": "Coding", "#);
        let reloaded = WorkspaceStore::open(JsonFileRepository::new(&path));
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.list()[0].name, "fresh");
    }
}
