//! Turning a selection of live windows into persisted window patterns.
//!
//! When every window of an app is selected the app is stored as a single
//! wildcard pattern, so windows opened later are part of the workspace too.
//! When only some are selected, each selected window becomes its own
//! pattern keyed on its stable identity name, plus the window id as a
//! same-session fast path.

use crate::workspace::{DiscoveredWindow, RunningProcess, WindowIdentifier, WindowSessions};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Name proposed for the next captured workspace.
pub fn default_name(existing: usize) -> String {
    format!("Workspace {}", existing + 1)
}

/// Resolve a requested window-id list against a snapshot.
///
/// `None` selects everything; unknown ids are dropped with a warning.
pub fn selection(discovered: &[DiscoveredWindow], requested: Option<&[String]>) -> HashSet<String> {
    let Some(requested) = requested else {
        return discovered.iter().map(|w| w.id()).collect();
    };
    let known: HashSet<String> = discovered.iter().map(|w| w.id()).collect();
    requested
        .iter()
        .filter(|id| {
            let ok = known.contains(id.as_str());
            if !ok {
                warn!("window {} is not open, ignoring", id);
            }
            ok
        })
        .cloned()
        .collect()
}

/// Complete a window snapshot with one app-level entry per running regular
/// app that has no window in it.
///
/// An app-level entry has index 0 and an empty title, so on its own it is
/// captured as a wildcard.  `self_pid` is never included.
pub fn with_app_entries(
    mut windows: Vec<DiscoveredWindow>,
    processes: &[RunningProcess],
    self_pid: u32,
) -> Vec<DiscoveredWindow> {
    let mut covered: HashSet<String> = windows.iter().map(|w| w.bundle_identifier.clone()).collect();
    for p in processes.iter().filter(|p| p.is_regular() && p.process_id != self_pid) {
        if !covered.insert(p.bundle_identifier.clone()) {
            continue;
        }
        debug!("capture {}: no windows, app-level entry", p.bundle_identifier);
        windows.push(DiscoveredWindow {
            app_name: p.app_name.clone(),
            bundle_identifier: p.bundle_identifier.clone(),
            process_id: p.process_id,
            window_title: String::new(),
            window_index: 0,
            is_minimized: false,
            handle: String::new(),
            stable_identity_name: String::new(),
        });
    }
    windows
}

/// Build the pattern list for the selected windows.
///
/// Order follows `discovered`.  Every window id that ends up in a pattern is
/// recorded in `sessions` together with its owning process.
pub fn build_identifiers(
    discovered: &[DiscoveredWindow],
    selected: &HashSet<String>,
    sessions: &mut WindowSessions,
) -> Vec<WindowIdentifier> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    let mut picked: HashMap<&str, usize> = HashMap::new();
    for window in discovered {
        *totals.entry(window.bundle_identifier.as_str()).or_default() += 1;
        if selected.contains(&window.id()) {
            *picked.entry(window.bundle_identifier.as_str()).or_default() += 1;
        }
    }

    let mut identifiers = Vec::new();
    let mut whole_apps: HashSet<&str> = HashSet::new();

    for window in discovered.iter().filter(|w| selected.contains(&w.id())) {
        let bundle = window.bundle_identifier.as_str();
        if picked.get(bundle) == totals.get(bundle) {
            if whole_apps.insert(bundle) {
                debug!("capture {}: all windows", bundle);
                identifiers.push(WindowIdentifier::wildcard(bundle));
            }
            continue;
        }

        if window.stable_identity_name.is_empty() {
            debug!("capture {}: skipping untitled window {}", bundle, window.id());
            continue;
        }
        debug!("capture {}: {:?}", bundle, window.stable_identity_name);
        sessions.record(window);
        identifiers.push(
            WindowIdentifier::titled(bundle, window.stable_identity_name.clone())
                .with_window_id(window.id()),
        );
    }

    identifiers
}
