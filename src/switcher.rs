//! The orchestrator that ties the store, the desktop and the command
//! sources together.
//!
//! [`WorkspaceSwitcher`] owns the [`WorkspaceStore`] and reacts to
//! [`Command`]s by mutating the store and issuing calls to the [`Desktop`]
//! trait.  It is meant to run on exactly one thread; every trigger source
//! reaches it through the same channel.

use crate::capture;
use crate::command::{CapturePurpose, CaptureRequest, Command, WorkspaceRef};
use crate::hotkey::RecorderHandle;
use crate::store::{StoreError, WorkspaceStore};
use crate::title::TitleRules;
use crate::traits::Desktop;
use crate::workspace::{
    DiscoveredWindow, RunningProcess, WindowIdentifier, WindowSessions, WorkspaceConfiguration,
    WorkspaceId,
};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{mpsc, Arc};
use std::thread;

/// Possible errors from the switcher.
#[derive(Debug, thiserror::Error)]
pub enum SwitcherError {
    /// The desktop returned an error.
    #[error("desktop error: {0}")]
    Desktop(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no workspace matches {0}")]
    UnknownWorkspace(String),
    /// A capture or edit selected no window that can be stored.
    #[error("no windows selected")]
    NothingSelected,
    #[error("global shortcuts are not available")]
    ShortcutsUnavailable,
}

/// Persistence failures leave the in-memory list authoritative; the store
/// has already logged them.
fn kept_in_memory(result: Result<(), StoreError>) -> Result<(), SwitcherError> {
    match result {
        Err(StoreError::Persist(_)) => Ok(()),
        other => other.map_err(SwitcherError::from),
    }
}

/// Applies workspaces to the desktop and processes every [`Command`].
///
/// The switcher is generic over any [`Desktop`] implementation, making it
/// independent of Hyprland or any other concrete backend.
///
/// # Typical usage
///
/// ```ignore
/// let desktop = Arc::new(HyprlandDesktop::new(TitleRules::default())?);
/// let mut switcher = WorkspaceSwitcher::new(desktop, store);
/// switcher.handle(Command::Switch(WorkspaceRef::Name("Coding".into())))?;
/// ```
pub struct WorkspaceSwitcher<D: Desktop + 'static> {
    desktop: Arc<D>,
    store: WorkspaceStore,
    sessions: WindowSessions,
    excluded: HashSet<String>,
    self_pid: u32,
    titles: TitleRules,
    recorder: Option<RecorderHandle>,
    loopback: Option<mpsc::Sender<Command>>,
}

impl<D: Desktop + 'static> WorkspaceSwitcher<D> {
    pub fn new(desktop: Arc<D>, store: WorkspaceStore) -> Self {
        Self {
            desktop,
            store,
            sessions: WindowSessions::new(),
            excluded: HashSet::new(),
            self_pid: std::process::id(),
            titles: TitleRules::default(),
            recorder: None,
            loopback: None,
        }
    }

    /// Bundles that phase 1 never hides or shows.
    pub fn set_excluded_bundles<I, S>(&mut self, bundles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = bundles.into_iter().map(Into::into).collect();
    }

    /// Process treated as "self" and left alone.  Defaults to this process.
    pub fn set_self_pid(&mut self, pid: u32) {
        self.self_pid = pid;
    }

    /// Rules used to render window names in capture logs.
    pub fn set_title_rules(&mut self, titles: TitleRules) {
        self.titles = titles;
    }

    /// Attach the shortcut dispatcher's recorder.  Without it,
    /// [`Command::RecordShortcut`] fails.
    pub fn set_recorder(&mut self, recorder: RecorderHandle) {
        self.recorder = Some(recorder);
    }

    /// Attach the sender of this switcher's own command channel.
    ///
    /// With it, capture and edit enumerate windows on a background thread
    /// and deliver the result as [`Command::WindowsEnumerated`]; without
    /// it, they enumerate inline.
    pub fn set_loopback(&mut self, tx: mpsc::Sender<Command>) {
        self.loopback = Some(tx);
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    /// Process a single [`Command`].
    pub fn handle(&mut self, cmd: Command) -> Result<(), SwitcherError> {
        match cmd {
            Command::Switch(selector) => {
                let id = self.resolve(&selector)?;
                self.activate(id)?;
            }

            Command::Activate(id) => {
                debug!("shortcut activation of {}", id);
                self.activate(id)?;
            }

            Command::ShowAll => {
                info!("show all apps");
                self.show_all_apps()?;
            }

            Command::Capture(request) => {
                info!("capture requested");
                self.enumerate(CapturePurpose::Create(request))?;
            }

            Command::Edit(request) => {
                let id = self.resolve(&request.workspace)?;
                let Some(windows) = request.windows else {
                    // Patterns stay as saved; only the name can change.
                    if let Some(name) = request.name.filter(|n| !n.trim().is_empty()) {
                        info!("edit {}: rename to {:?}", request.workspace, name);
                        kept_in_memory(self.store.rename(id, name))?;
                    }
                    return Ok(());
                };
                info!("edit {} requested", request.workspace);
                self.enumerate(CapturePurpose::Edit {
                    workspace: id,
                    name: request.name,
                    windows,
                })?;
            }

            Command::WindowsEnumerated { purpose, windows } => {
                self.finish_capture(purpose, windows)?;
            }

            Command::Rename { workspace, name } => {
                let id = self.resolve(&workspace)?;
                info!("rename {} to {:?}", workspace, name);
                kept_in_memory(self.store.rename(id, name))?;
            }

            Command::Remove(selector) => {
                let id = self.resolve(&selector)?;
                kept_in_memory(self.store.remove(id))?;
            }

            Command::RecordShortcut(selector) => {
                let id = self.resolve(&selector)?;
                let recorder = self.recorder.as_ref().ok_or(SwitcherError::ShortcutsUnavailable)?;
                recorder.start(id);
            }

            Command::CancelRecording => {
                if let Some(recorder) = &self.recorder {
                    if recorder.cancel() {
                        info!("shortcut recording cancelled");
                    }
                }
            }

            Command::ShortcutRecorded { workspace, shortcut } => {
                if self.store.get(workspace).is_none() {
                    warn!("recorded {} for a workspace that no longer exists", shortcut);
                    return Ok(());
                }
                kept_in_memory(self.store.set_shortcut(workspace, Some(shortcut)))?;
            }

            Command::ClearShortcut(selector) => {
                let id = self.resolve(&selector)?;
                kept_in_memory(self.store.set_shortcut(id, None))?;
            }

            Command::Shutdown => debug!("shutdown requested"),
        }
        Ok(())
    }

    /// Mark `id` active, then apply its layout.
    ///
    /// The store is updated first so no observer ever sees a workspace as
    /// active before its layout has been requested.
    pub fn activate(&mut self, id: WorkspaceId) -> Result<(), SwitcherError> {
        kept_in_memory(self.store.activate(id))?;
        let workspace = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| SwitcherError::UnknownWorkspace(id.to_string()))?;
        self.switch_to(&workspace)
    }

    /// Apply `workspace`'s layout.  Does not touch the store.
    ///
    /// Phase 1 shows the workspace's apps and hides every other regular
    /// app.  Phase 2, only with elevated introspection, raises the selected
    /// windows and minimizes unselected windows of the shown apps.  Failed
    /// desktop calls are logged and skipped.
    pub fn switch_to(&self, workspace: &WorkspaceConfiguration) -> Result<(), SwitcherError> {
        info!("switch to {:?}", workspace.name);
        let targets = workspace.bundle_identifiers();

        let processes = self
            .desktop
            .running_processes()
            .map_err(|e| SwitcherError::Desktop(e.to_string()))?;
        let mut seen = HashSet::new();
        for process in processes.iter().filter(|p| self.is_switchable(p)) {
            let bundle = process.bundle_identifier.as_str();
            if !seen.insert(bundle) {
                continue;
            }
            if targets.contains(bundle) {
                debug!("  show {}", bundle);
                if let Err(e) = self.desktop.show_process(bundle) {
                    warn!("show {} failed: {}", bundle, e);
                }
            } else {
                debug!("  hide {}", bundle);
                if let Err(e) = self.desktop.hide_process(bundle) {
                    warn!("hide {} failed: {}", bundle, e);
                }
            }
        }

        if !self.desktop.has_elevated_introspection() {
            debug!("window introspection unavailable, process-level switch only");
            return Ok(());
        }
        let windows = match self.desktop.enumerate_windows() {
            Ok(w) => w,
            Err(e) => {
                warn!("window enumeration failed, process-level switch only: {}", e);
                return Ok(());
            }
        };

        let mut specific: HashMap<&str, Vec<&WindowIdentifier>> = HashMap::new();
        for ident in workspace.window_identifiers.iter().filter(|i| !i.is_wildcard()) {
            specific
                .entry(ident.bundle_identifier.as_str())
                .or_default()
                .push(ident);
        }

        for window in windows
            .iter()
            .filter(|w| targets.contains(w.bundle_identifier.as_str()))
        {
            let selected = match specific.get(window.bundle_identifier.as_str()) {
                None => true,
                Some(idents) => idents.iter().any(|i| i.matches_in(window, &self.sessions)),
            };
            if selected {
                debug!("  raise {}", window.id());
                if let Err(e) = self.desktop.raise(window) {
                    warn!("raise {} failed: {}", window.id(), e);
                }
            } else {
                debug!("  minimize {}", window.id());
                if let Err(e) = self.desktop.minimize(window) {
                    warn!("minimize {} failed: {}", window.id(), e);
                }
            }
        }
        Ok(())
    }

    /// Show every regular app, un-minimize every window and clear the
    /// active workspace.  Safe to repeat.
    pub fn show_all_apps(&mut self) -> Result<(), SwitcherError> {
        let processes = self
            .desktop
            .running_processes()
            .map_err(|e| SwitcherError::Desktop(e.to_string()))?;
        let mut seen = HashSet::new();
        for process in processes
            .iter()
            .filter(|p| p.is_regular() && p.process_id != self.self_pid)
        {
            let bundle = process.bundle_identifier.as_str();
            if seen.insert(bundle) {
                if let Err(e) = self.desktop.show_process(bundle) {
                    warn!("show {} failed: {}", bundle, e);
                }
            }
        }

        if self.desktop.has_elevated_introspection() {
            match self.desktop.enumerate_windows() {
                Ok(windows) => {
                    for window in windows.iter().filter(|w| w.is_minimized) {
                        if let Err(e) = self.desktop.raise(window) {
                            warn!("restore {} failed: {}", window.id(), e);
                        }
                    }
                }
                Err(e) => warn!("window enumeration failed: {}", e),
            }
        }

        kept_in_memory(self.store.deactivate_all())
    }

    //  Capture / edit

    fn enumerate(&mut self, purpose: CapturePurpose) -> Result<(), SwitcherError> {
        let Some(tx) = self.loopback.clone() else {
            let windows = capture_snapshot(&*self.desktop, self.self_pid)?;
            return self.finish_capture(purpose, windows);
        };
        let desktop = Arc::clone(&self.desktop);
        let self_pid = self.self_pid;
        thread::spawn(move || match capture_snapshot(&*desktop, self_pid) {
            Ok(windows) => {
                let _ = tx.send(Command::WindowsEnumerated { purpose, windows });
            }
            Err(e) => warn!("capture enumeration failed: {}", e),
        });
        Ok(())
    }

    fn finish_capture(
        &mut self,
        purpose: CapturePurpose,
        mut windows: Vec<DiscoveredWindow>,
    ) -> Result<(), SwitcherError> {
        windows.retain(|w| w.process_id != self.self_pid);
        for w in &windows {
            debug!(
                "  found {} {}",
                w.id(),
                self.titles.display_name(&w.bundle_identifier, &w.window_title)
            );
        }

        match purpose {
            CapturePurpose::Create(CaptureRequest { name, windows: requested }) => {
                let selected = capture::selection(&windows, requested.as_deref());
                let identifiers = capture::build_identifiers(&windows, &selected, &mut self.sessions);
                if identifiers.is_empty() {
                    return Err(SwitcherError::NothingSelected);
                }
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| capture::default_name(self.store.list().len()));
                info!("captured {:?} with {} pattern(s)", name, identifiers.len());
                match self.store.add(WorkspaceConfiguration::new(name, identifiers)) {
                    Ok(_) | Err(StoreError::Persist(_)) => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }

            CapturePurpose::Edit {
                workspace,
                name,
                windows: requested,
            } => {
                let existing = self
                    .store
                    .get(workspace)
                    .cloned()
                    .ok_or_else(|| SwitcherError::UnknownWorkspace(workspace.to_string()))?;
                let selected = capture::selection(&windows, Some(requested.as_slice()));
                let identifiers = capture::build_identifiers(&windows, &selected, &mut self.sessions);
                if identifiers.is_empty() {
                    return Err(SwitcherError::NothingSelected);
                }
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(existing.name);
                kept_in_memory(self.store.update(workspace, name, identifiers, existing.shortcut))
            }
        }
    }

    fn resolve(&self, selector: &WorkspaceRef) -> Result<WorkspaceId, SwitcherError> {
        self.store
            .find(selector)
            .map(|w| w.id)
            .ok_or_else(|| SwitcherError::UnknownWorkspace(selector.to_string()))
    }

    fn is_switchable(&self, process: &RunningProcess) -> bool {
        process.is_regular()
            && process.process_id != self.self_pid
            && !self.excluded.contains(&process.bundle_identifier)
    }
}

/// Windows offered for capture.  Without elevated introspection the window
/// list is not consulted and every app is offered as a whole.
fn capture_snapshot<D: Desktop>(desktop: &D, self_pid: u32) -> Result<Vec<DiscoveredWindow>, SwitcherError> {
    let processes = desktop
        .running_processes()
        .map_err(|e| SwitcherError::Desktop(e.to_string()))?;
    let windows = if desktop.has_elevated_introspection() {
        desktop
            .enumerate_windows()
            .map_err(|e| SwitcherError::Desktop(e.to_string()))?
    } else {
        debug!("window introspection unavailable, capturing whole apps");
        Vec::new()
    };
    Ok(capture::with_app_entries(windows, &processes, self_pid))
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EditRequest;
    use crate::hotkey::{ShortcutDispatcher, ShortcutTable};
    use crate::shortcut::{KeyShortcut, Modifiers};
    use crate::store::MemoryRepository;
    use crate::testing::{process, window, Call, FakeDesktop};
    use crate::workspace::ActivationPolicy;

    const TERMINAL: &str = "com.apple.Terminal";
    const IDEA: &str = "com.jetbrains.intellij";
    const CHROME: &str = "com.google.Chrome";
    const FINDER: &str = "com.apple.finder";

    fn desktop() -> FakeDesktop {
        FakeDesktop::new()
            .with_app(TERMINAL, 100)
            .with_app(IDEA, 100)
            .with_app(CHROME, 100)
            .with_app(FINDER, 100)
            .with_process(process("com.example.agent", 300, ActivationPolicy::Accessory))
            .with_app("ctxswitch", 1)
            .with_window(window(TERMINAL, 0, "zsh"))
            .with_window(window(IDEA, 0, "backend \u{2013} Main.kt [main]"))
            .with_window(window(IDEA, 1, "frontend \u{2013} App.tsx"))
            .with_window(window(CHROME, 0, "Inbox - Google Chrome - Work"))
    }

    fn make_switcher(workspaces: Vec<WorkspaceConfiguration>) -> WorkspaceSwitcher<FakeDesktop> {
        let mut store = WorkspaceStore::open(MemoryRepository::new());
        for ws in workspaces {
            store.add(ws).unwrap();
        }
        let mut s = WorkspaceSwitcher::new(Arc::new(desktop()), store);
        s.set_self_pid(1);
        s.set_excluded_bundles([FINDER]);
        s
    }

    fn coding() -> WorkspaceConfiguration {
        WorkspaceConfiguration::new(
            "Coding",
            vec![
                WindowIdentifier::wildcard(TERMINAL),
                WindowIdentifier::titled(IDEA, "backend"),
            ],
        )
    }

    fn browsing() -> WorkspaceConfiguration {
        WorkspaceConfiguration::new("Browsing", vec![WindowIdentifier::wildcard(CHROME)])
    }

    fn by_name(name: &str) -> WorkspaceRef {
        WorkspaceRef::Name(name.into())
    }

    #[test]
    fn consecutive_switches_leave_exactly_one_active() {
        let mut s = make_switcher(vec![coding(), browsing()]);
        s.handle(Command::Switch(by_name("Coding"))).unwrap();
        s.handle(Command::Switch(by_name("Browsing"))).unwrap();
        let active: Vec<&str> = s
            .store()
            .list()
            .iter()
            .filter(|w| w.is_active)
            .map(|w| w.name.as_str())
            .collect();
        assert_eq!(active, vec!["Browsing"]);
    }

    #[test]
    fn phase_one_shows_targets_and_hides_the_rest() {
        let s = make_switcher(vec![]);
        s.switch_to(&coding()).unwrap();
        assert!(!s.desktop.is_hidden(TERMINAL));
        assert!(!s.desktop.is_hidden(IDEA));
        assert!(s.desktop.is_hidden(CHROME));

        let calls = s.desktop.calls();
        // Excluded, background and self processes are never touched.
        for untouched in [FINDER, "com.example.agent", "ctxswitch"] {
            assert!(!calls.contains(&Call::Hide(untouched.into())));
            assert!(!calls.contains(&Call::Show(untouched.into())));
        }
    }

    #[test]
    fn phase_two_raises_matches_and_minimizes_the_rest() {
        let s = make_switcher(vec![]);
        s.switch_to(&coding()).unwrap();
        let calls = s.desktop.calls();
        assert!(calls.contains(&Call::Raise(format!("{}:0", TERMINAL))));
        assert!(calls.contains(&Call::Raise(format!("{}:0", IDEA))));
        assert!(calls.contains(&Call::Minimize(format!("{}:1", IDEA))));
        // Windows of hidden apps are left to the process-level hide.
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::Raise(id) | Call::Minimize(id) if id.starts_with(CHROME))));
    }

    #[test]
    fn without_introspection_only_processes_change() {
        let s = make_switcher(vec![]);
        s.desktop.set_elevated(false);
        s.switch_to(&coding()).unwrap();
        let calls = s.desktop.calls();
        assert!(!calls.is_empty());
        assert!(calls
            .iter()
            .all(|c| matches!(c, Call::Show(_) | Call::Hide(_))));
    }

    #[test]
    fn failed_calls_do_not_abort_the_switch() {
        let s = make_switcher(vec![]);
        s.desktop.fail_bundle(TERMINAL);
        s.switch_to(&browsing()).unwrap();
        assert!(s.desktop.is_hidden(IDEA));
        assert!(!s.desktop.is_hidden(CHROME));
        assert!(s.desktop.calls().contains(&Call::Raise(format!("{}:0", CHROME))));
    }

    #[test]
    fn show_all_is_idempotent() {
        let mut s = make_switcher(vec![coding()]);
        s.handle(Command::Switch(by_name("coding"))).unwrap();
        assert!(s.desktop.is_minimized(&format!("{}:1", IDEA)));

        s.handle(Command::ShowAll).unwrap();
        let once = s.desktop.visibility();
        assert_eq!(once, (vec![], vec![]));
        assert!(s.store().active().is_none());

        s.handle(Command::ShowAll).unwrap();
        assert_eq!(s.desktop.visibility(), once);
        assert!(s.store().active().is_none());
    }

    #[test]
    fn show_all_with_nothing_active_is_harmless() {
        let mut s = make_switcher(vec![]);
        s.show_all_apps().unwrap();
        assert_eq!(s.desktop.visibility(), (vec![], vec![]));
    }

    #[test]
    fn window_id_fast_path_only_within_the_capturing_session() {
        let mut s = make_switcher(vec![]);
        // Capture only the frontend IDE window; title drift afterwards.
        s.handle(Command::Capture(CaptureRequest {
            name: Some("Front".into()),
            windows: Some(vec![format!("{}:1", IDEA)]),
        }))
        .unwrap();
        let captured = s.store().find(&by_name("Front")).cloned().unwrap();
        assert_eq!(
            captured.window_identifiers,
            vec![WindowIdentifier::titled(IDEA, "frontend").with_window_id(format!("{}:1", IDEA))]
        );

        let drifted = vec![
            window(IDEA, 0, "backend \u{2013} Main.kt"),
            window(IDEA, 1, "renamed \u{2013} App.tsx"),
        ];
        s.desktop.set_windows(drifted.clone());
        s.desktop.clear_calls();
        s.switch_to(&captured).unwrap();
        assert!(s.desktop.calls().contains(&Call::Raise(format!("{}:1", IDEA))));

        // Same positional id, different process: the app restarted.
        let restarted: Vec<DiscoveredWindow> = drifted
            .into_iter()
            .map(|mut w| {
                w.process_id = 200;
                w
            })
            .collect();
        s.desktop.set_windows(restarted);
        s.desktop.clear_calls();
        s.switch_to(&captured).unwrap();
        assert!(s.desktop.calls().contains(&Call::Minimize(format!("{}:1", IDEA))));
    }

    #[test]
    fn capture_everything_uses_wildcards_and_default_name() {
        let mut s = make_switcher(vec![coding()]);
        s.handle(Command::Capture(CaptureRequest::default())).unwrap();
        let created = s.store().list().last().cloned().unwrap();
        assert_eq!(created.name, "Workspace 2");
        assert_eq!(created.display_order, 1);
        assert_eq!(
            created.window_identifiers,
            vec![
                WindowIdentifier::wildcard(TERMINAL),
                WindowIdentifier::wildcard(IDEA),
                WindowIdentifier::wildcard(CHROME),
                WindowIdentifier::wildcard(FINDER),
            ]
        );
    }

    #[test]
    fn capture_with_nothing_selected_fails() {
        let mut s = make_switcher(vec![]);
        let err = s
            .handle(Command::Capture(CaptureRequest {
                name: None,
                windows: Some(vec!["gone:0".into()]),
            }))
            .unwrap_err();
        assert!(matches!(err, SwitcherError::NothingSelected));
        assert!(s.store().list().is_empty());
    }

    #[test]
    fn capture_enumerates_in_the_background_when_looped_back() {
        let mut s = make_switcher(vec![]);
        let (tx, rx) = mpsc::channel();
        s.set_loopback(tx);
        s.handle(Command::Capture(CaptureRequest::default())).unwrap();
        // Nothing is stored until the enumeration result comes back.
        assert!(s.store().list().is_empty());

        let delivered = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert!(matches!(delivered, Command::WindowsEnumerated { .. }));
        s.handle(delivered).unwrap();
        assert_eq!(s.store().list().len(), 1);
    }

    #[test]
    fn edit_without_windows_only_renames() {
        let shortcut = KeyShortcut::new(18, Modifiers::CONTROL);
        let mut s = make_switcher(vec![coding().with_shortcut(shortcut)]);
        s.handle(Command::Edit(EditRequest {
            workspace: by_name("Coding"),
            name: Some("Code".into()),
            windows: None,
        }))
        .unwrap();
        let edited = s.store().list()[0].clone();
        assert_eq!(edited.name, "Code");
        assert_eq!(edited.shortcut, Some(shortcut));
        assert_eq!(edited.window_identifiers, coding().window_identifiers);
    }

    #[test]
    fn rename_only_edit_keeps_a_specific_pattern_for_a_lone_window() {
        let store = WorkspaceStore::open(MemoryRepository::new());
        let desktop = FakeDesktop::new()
            .with_app(IDEA, 100)
            .with_window(window(IDEA, 0, "frontend \u{2013} App.tsx"));
        let mut s = WorkspaceSwitcher::new(Arc::new(desktop), store);
        s.set_self_pid(1);
        let front = WindowIdentifier::titled(IDEA, "frontend");
        s.store.add(WorkspaceConfiguration::new("Front", vec![front.clone()])).unwrap();

        s.handle(Command::Edit(EditRequest {
            workspace: by_name("Front"),
            name: Some("Frontend".into()),
            windows: None,
        }))
        .unwrap();
        let edited = s.store().list()[0].clone();
        assert_eq!(edited.name, "Frontend");
        assert_eq!(edited.window_identifiers, vec![front]);

        // A window opened later is still not part of the workspace.
        s.desktop.set_windows(vec![
            window(IDEA, 0, "frontend \u{2013} App.tsx"),
            window(IDEA, 1, "backend \u{2013} Main.kt"),
        ]);
        s.switch_to(&edited).unwrap();
        assert!(s.desktop.calls().contains(&Call::Minimize(format!("{}:1", IDEA))));
    }

    #[test]
    fn edit_with_windows_rebuilds_patterns() {
        let mut s = make_switcher(vec![coding()]);
        s.handle(Command::Edit(EditRequest {
            workspace: by_name("Coding"),
            name: None,
            windows: Some(vec![format!("{}:1", IDEA)]),
        }))
        .unwrap();
        let edited = s.store().list()[0].clone();
        assert_eq!(edited.name, "Coding");
        assert_eq!(
            edited.window_identifiers,
            vec![WindowIdentifier::titled(IDEA, "frontend").with_window_id(format!("{}:1", IDEA))]
        );
    }

    #[test]
    fn capture_without_introspection_stores_whole_apps() {
        let desktop = FakeDesktop::new()
            .with_app(TERMINAL, 100)
            .with_app(CHROME, 101)
            .with_window(window(TERMINAL, 0, "zsh"));
        desktop.set_elevated(false);
        let mut s = WorkspaceSwitcher::new(Arc::new(desktop), WorkspaceStore::open(MemoryRepository::new()));
        s.set_self_pid(1);
        s.handle(Command::Capture(CaptureRequest::default())).unwrap();
        let created = s.store().list()[0].clone();
        assert_eq!(
            created.window_identifiers,
            vec![WindowIdentifier::wildcard(TERMINAL), WindowIdentifier::wildcard(CHROME)]
        );
    }

    #[test]
    fn capture_includes_running_apps_without_windows() {
        let desktop = desktop().with_app("com.apple.Notes", 100);
        let mut s = WorkspaceSwitcher::new(Arc::new(desktop), WorkspaceStore::open(MemoryRepository::new()));
        s.set_self_pid(1);
        s.handle(Command::Capture(CaptureRequest {
            name: Some("Notes".into()),
            windows: Some(vec!["com.apple.Notes:0".into()]),
        }))
        .unwrap();
        let created = s.store().list()[0].clone();
        assert_eq!(created.window_identifiers, vec![WindowIdentifier::wildcard("com.apple.Notes")]);
    }

    #[test]
    fn rename_remove_and_unknown_workspaces() {
        let mut s = make_switcher(vec![coding(), browsing()]);
        s.handle(Command::Rename {
            workspace: WorkspaceRef::Index(1),
            name: "Web".into(),
        })
        .unwrap();
        assert!(s.store().find(&by_name("web")).is_some());

        s.handle(Command::Remove(by_name("Coding"))).unwrap();
        assert_eq!(s.store().list().len(), 1);

        let err = s.handle(Command::Switch(by_name("Coding"))).unwrap_err();
        assert!(matches!(err, SwitcherError::UnknownWorkspace(_)));
    }

    #[test]
    fn switch_survives_persistence_failure() {
        let repo = MemoryRepository::new();
        let mut store = WorkspaceStore::open(repo.clone());
        store.add(coding()).unwrap();
        repo.set_fail_saves(true);
        let mut s = WorkspaceSwitcher::new(Arc::new(desktop()), store);
        s.set_self_pid(1);
        s.handle(Command::Switch(by_name("Coding"))).unwrap();
        assert_eq!(s.store().active().map(|w| w.name.as_str()), Some("Coding"));
        assert!(s.desktop.is_hidden(CHROME));
    }

    #[test]
    fn shortcut_recording_round_trip() {
        let mut s = make_switcher(vec![coding()]);
        assert!(matches!(
            s.handle(Command::RecordShortcut(by_name("Coding"))),
            Err(SwitcherError::ShortcutsUnavailable)
        ));

        let (tx, _rx) = mpsc::channel();
        let dispatcher = ShortcutDispatcher::new(ShortcutTable::new(), tx);
        s.set_recorder(dispatcher.recorder());
        s.handle(Command::RecordShortcut(by_name("Coding"))).unwrap();
        assert!(dispatcher.recorder().is_recording());
        s.handle(Command::CancelRecording).unwrap();
        assert!(!dispatcher.recorder().is_recording());

        let id = s.store().list()[0].id;
        let shortcut = KeyShortcut::new(19, Modifiers::COMMAND | Modifiers::OPTION);
        s.handle(Command::ShortcutRecorded { workspace: id, shortcut }).unwrap();
        assert_eq!(s.store().get(id).and_then(|w| w.shortcut), Some(shortcut));

        s.handle(Command::ClearShortcut(WorkspaceRef::Id(id))).unwrap();
        assert_eq!(s.store().get(id).and_then(|w| w.shortcut), None);
    }

    #[test]
    fn activate_from_dispatcher_switches() {
        let mut s = make_switcher(vec![coding(), browsing()]);
        let id = s.store().list()[1].id;
        s.handle(Command::Activate(id)).unwrap();
        assert_eq!(s.store().active().map(|w| w.id), Some(id));
        assert!(s.desktop.is_hidden(TERMINAL));
    }
}
