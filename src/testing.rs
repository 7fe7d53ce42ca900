//! Shared test doubles.

use crate::title::TitleRules;
use crate::traits::{Desktop, Disposition, HookControl, HookEvent, HookHandle, KeyHandler, KeyHook};
use crate::workspace::{ActivationPolicy, DiscoveredWindow, RunningProcess};
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A window of process 100, identified with the default title rules.
pub fn window(bundle: &str, index: usize, title: &str) -> DiscoveredWindow {
    DiscoveredWindow {
        app_name: bundle.to_string(),
        bundle_identifier: bundle.to_string(),
        process_id: 100,
        window_title: title.to_string(),
        window_index: index,
        is_minimized: false,
        handle: format!("{}#{}", bundle, index),
        stable_identity_name: String::new(),
    }
    .identify(&TitleRules::default())
}

pub fn process(bundle: &str, pid: u32, policy: ActivationPolicy) -> RunningProcess {
    RunningProcess {
        app_name: bundle.to_string(),
        bundle_identifier: bundle.to_string(),
        process_id: pid,
        policy,
    }
}

//  Desktop

/// One call made against [`FakeDesktop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Show(String),
    Hide(String),
    Raise(String),
    Minimize(String),
}

#[derive(Debug, thiserror::Error)]
#[error("fake desktop error")]
pub struct FakeDesktopError;

#[derive(Default)]
struct DesktopState {
    processes: Vec<RunningProcess>,
    hidden: HashSet<String>,
    windows: Vec<DiscoveredWindow>,
    failing: HashSet<String>,
    calls: Vec<Call>,
}

/// Recording desktop that keeps track of hidden processes and minimized
/// windows.
pub struct FakeDesktop {
    state: Mutex<DesktopState>,
    elevated: AtomicBool,
}

impl FakeDesktop {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DesktopState::default()),
            elevated: AtomicBool::new(true),
        }
    }

    /// Add a regular app; its windows are added separately.
    pub fn with_app(self, bundle: &str, pid: u32) -> Self {
        self.with_process(process(bundle, pid, ActivationPolicy::Regular))
    }

    pub fn with_process(self, process: RunningProcess) -> Self {
        self.state.lock().unwrap().processes.push(process);
        self
    }

    pub fn with_window(self, window: DiscoveredWindow) -> Self {
        self.state.lock().unwrap().windows.push(window);
        self
    }

    pub fn set_elevated(&self, elevated: bool) {
        self.elevated.store(elevated, Ordering::SeqCst);
    }

    /// Make every call touching `bundle` fail.
    pub fn fail_bundle(&self, bundle: &str) {
        self.state.lock().unwrap().failing.insert(bundle.to_string());
    }

    /// Replace the window list, e.g. to simulate an app restart.
    pub fn set_windows(&self, windows: Vec<DiscoveredWindow>) {
        self.state.lock().unwrap().windows = windows;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn is_hidden(&self, bundle: &str) -> bool {
        self.state.lock().unwrap().hidden.contains(bundle)
    }

    pub fn is_minimized(&self, window_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .windows
            .iter()
            .any(|w| w.id() == window_id && w.is_minimized)
    }

    /// `(hidden bundles, minimized window ids)`, sorted.
    pub fn visibility(&self) -> (Vec<String>, Vec<String>) {
        let state = self.state.lock().unwrap();
        let mut hidden: Vec<String> = state.hidden.iter().cloned().collect();
        hidden.sort();
        let mut minimized: Vec<String> = state
            .windows
            .iter()
            .filter(|w| w.is_minimized)
            .map(|w| w.id())
            .collect();
        minimized.sort();
        (hidden, minimized)
    }

    fn set_minimized(&self, window: &DiscoveredWindow, minimized: bool, call: Call) -> Result<(), FakeDesktopError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(&window.bundle_identifier) {
            return Err(FakeDesktopError);
        }
        if let Some(w) = state.windows.iter_mut().find(|w| w.id() == window.id()) {
            w.is_minimized = minimized;
        }
        Ok(())
    }
}

impl Desktop for FakeDesktop {
    type Error = FakeDesktopError;

    fn running_processes(&self) -> Result<Vec<RunningProcess>, FakeDesktopError> {
        Ok(self.state.lock().unwrap().processes.clone())
    }

    fn enumerate_windows(&self) -> Result<Vec<DiscoveredWindow>, FakeDesktopError> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    fn has_elevated_introspection(&self) -> bool {
        self.elevated.load(Ordering::SeqCst)
    }

    fn show_process(&self, bundle: &str) -> Result<(), FakeDesktopError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Show(bundle.to_string()));
        if state.failing.contains(bundle) {
            return Err(FakeDesktopError);
        }
        state.hidden.remove(bundle);
        Ok(())
    }

    fn hide_process(&self, bundle: &str) -> Result<(), FakeDesktopError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Hide(bundle.to_string()));
        if state.failing.contains(bundle) {
            return Err(FakeDesktopError);
        }
        state.hidden.insert(bundle.to_string());
        Ok(())
    }

    fn raise(&self, window: &DiscoveredWindow) -> Result<(), FakeDesktopError> {
        self.set_minimized(window, false, Call::Raise(window.id()))
    }

    fn minimize(&self, window: &DiscoveredWindow) -> Result<(), FakeDesktopError> {
        self.set_minimized(window, true, Call::Minimize(window.id()))
    }
}

//  Key hook

#[derive(Debug, thiserror::Error)]
#[error("fake hook error")]
pub struct FakeHookError;

/// In-process hook: tests push events through [`fire`](Self::fire).
pub struct FakeHook {
    trusted: bool,
    handler: Option<(HookHandle, KeyHandler)>,
    installs: u64,
    reenables: Cell<u32>,
}

impl FakeHook {
    pub fn trusted() -> Self {
        Self {
            trusted: true,
            handler: None,
            installs: 0,
            reenables: Cell::new(0),
        }
    }

    pub fn untrusted() -> Self {
        Self {
            trusted: false,
            ..Self::trusted()
        }
    }

    pub fn set_trusted(&mut self, trusted: bool) {
        self.trusted = trusted;
    }

    pub fn is_installed(&self) -> bool {
        self.handler.is_some()
    }

    pub fn installs(&self) -> u64 {
        self.installs
    }

    pub fn reenables(&self) -> u32 {
        self.reenables.get()
    }

    /// Deliver `event` to the installed handler, if any.
    pub fn fire(&self, event: HookEvent) -> Option<Disposition> {
        self.handler.as_ref().map(|(_, handler)| handler(event, self))
    }
}

impl HookControl for FakeHook {
    fn reenable(&self) -> bool {
        if self.trusted {
            self.reenables.set(self.reenables.get() + 1);
        }
        self.trusted
    }
}

impl KeyHook for FakeHook {
    type Error = FakeHookError;

    fn is_trusted(&self) -> bool {
        self.trusted
    }

    fn install(&mut self, handler: KeyHandler) -> Result<HookHandle, FakeHookError> {
        self.installs += 1;
        let handle = HookHandle(self.installs);
        self.handler = Some((handle, handler));
        Ok(handle)
    }

    fn remove(&mut self, handle: HookHandle) -> Result<(), FakeHookError> {
        match &self.handler {
            Some((current, _)) if *current == handle => {
                self.handler = None;
                Ok(())
            }
            _ => Err(FakeHookError),
        }
    }
}
