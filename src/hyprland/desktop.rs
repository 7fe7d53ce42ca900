//! [`Desktop`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.
//!
//! Hyprland has no notion of hidden apps or minimized windows, so both are
//! modelled with special workspaces: a hidden app's windows live on
//! `special:ctxswitch`, a minimized window on `special:minimized`.  The
//! client `class` plays the role of the bundle identifier.

use crate::title::TitleRules;
use crate::traits::Desktop;
use crate::workspace::{ActivationPolicy, DiscoveredWindow, RunningProcess};
use log::debug;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Special workspace holding the windows of hidden apps.
pub const HIDDEN_WORKSPACE: &str = "special:ctxswitch";
/// Special workspace holding minimized windows.
pub const MINIMIZED_WORKSPACE: &str = "special:minimized";

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(String);

/// Hyprland-backed desktop.
///
/// No connection is held open; each call opens a short-lived IPC request.
pub struct HyprlandDesktop {
    socket: PathBuf,
    titles: TitleRules,
}

/// Resolve the Hyprland command socket path.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
fn socket_path() -> Result<PathBuf, HyprlandError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!("{}/hypr/{}/.socket.sock", runtime_dir, his)))
}

//  Minimal serde structs for the JSON we care about

#[derive(Deserialize)]
struct WorkspaceJson {
    id: i64,
    name: String,
}

/// Subset of the JSON object returned by `j/clients`.
#[derive(Deserialize)]
struct ClientJson {
    address: String,
    #[serde(default = "mapped_default")]
    mapped: bool,
    workspace: WorkspaceJson,
    class: String,
    #[serde(default, rename = "initialClass")]
    initial_class: String,
    title: String,
    pid: i64,
}

fn mapped_default() -> bool {
    true
}

impl ClientJson {
    fn process_id(&self) -> Option<u32> {
        u32::try_from(self.pid).ok()
    }
}

impl HyprlandDesktop {
    /// Locate the compositor socket from the environment.
    pub fn new(titles: TitleRules) -> Result<Self, HyprlandError> {
        Ok(Self::with_socket(socket_path()?, titles))
    }

    /// Talk to the compositor socket at `socket`.
    pub fn with_socket(socket: impl AsRef<Path>, titles: TitleRules) -> Self {
        Self {
            socket: socket.as_ref().to_path_buf(),
            titles,
        }
    }

    //  Direct Hyprland IPC helpers

    /// Send a raw command and return the response as a string.
    fn ipc_request(&self, command: &str) -> Result<String, HyprlandError> {
        let mut stream = UnixStream::connect(&self.socket)
            .map_err(|e| HyprlandError(format!("connect to {}: {}", self.socket.display(), e)))?;

        stream
            .write_all(command.as_bytes())
            .map_err(|e| HyprlandError(format!("write: {}", e)))?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .map_err(|e| HyprlandError(format!("read: {}", e)))?;

        String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
    }

    /// Send a JSON data query (`j/<command>`) and return the raw JSON string.
    fn ipc_json(&self, data_command: &str) -> Result<String, HyprlandError> {
        self.ipc_request(&format!("j/{}", data_command))
    }

    /// Send a dispatch command and check for `"ok"`.
    fn ipc_dispatch(&self, args: &str) -> Result<(), HyprlandError> {
        let response = self.ipc_request(&format!("/dispatch {}", args))?;
        if response.trim() == "ok" {
            Ok(())
        } else {
            Err(HyprlandError(format!("dispatch error: {}", response)))
        }
    }

    fn clients(&self) -> Result<Vec<ClientJson>, HyprlandError> {
        let json = self.ipc_json("clients")?;
        let clients: Vec<ClientJson> =
            serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse: {}", e)))?;
        Ok(clients
            .into_iter()
            .filter(|c| c.mapped && !c.class.is_empty())
            .collect())
    }

    fn active_workspace(&self) -> Result<i64, HyprlandError> {
        let json = self.ipc_json("activeworkspace")?;
        let ws: WorkspaceJson =
            serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse: {}", e)))?;
        Ok(ws.id)
    }

    fn move_silently(&self, address: &str, workspace: &str) -> Result<(), HyprlandError> {
        self.ipc_dispatch(&format!("movetoworkspacesilent {},address:{}", workspace, address))
    }

    fn focus(&self, address: &str) -> Result<(), HyprlandError> {
        self.ipc_dispatch(&format!("focuswindow address:{}", address))
    }
}

//  Desktop implementation

impl Desktop for HyprlandDesktop {
    type Error = HyprlandError;

    /// One process per client pid.  Every process with a mapped window is
    /// treated as a regular app.
    fn running_processes(&self) -> Result<Vec<RunningProcess>, Self::Error> {
        let mut seen = HashSet::new();
        let mut processes = Vec::new();
        for client in self.clients()? {
            let Some(pid) = client.process_id() else { continue };
            if !seen.insert(pid) {
                continue;
            }
            let app_name = if client.initial_class.is_empty() {
                client.class.clone()
            } else {
                client.initial_class.clone()
            };
            processes.push(RunningProcess {
                app_name,
                bundle_identifier: client.class,
                process_id: pid,
                policy: ActivationPolicy::Regular,
            });
        }
        Ok(processes)
    }

    fn enumerate_windows(&self) -> Result<Vec<DiscoveredWindow>, Self::Error> {
        let mut next_index: HashMap<String, usize> = HashMap::new();
        let mut windows = Vec::new();
        for client in self.clients()? {
            let Some(pid) = client.process_id() else { continue };
            let index = next_index.entry(client.class.clone()).or_default();
            let window = DiscoveredWindow {
                app_name: client.class.clone(),
                bundle_identifier: client.class,
                process_id: pid,
                window_title: client.title,
                window_index: *index,
                is_minimized: client.workspace.name == MINIMIZED_WORKSPACE,
                handle: client.address,
                stable_identity_name: String::new(),
            }
            .identify(&self.titles);
            *index += 1;
            windows.push(window);
        }
        Ok(windows)
    }

    fn has_elevated_introspection(&self) -> bool {
        UnixStream::connect(&self.socket).is_ok()
    }

    fn show_process(&self, bundle_identifier: &str) -> Result<(), Self::Error> {
        let clients = self.clients()?;
        let active = self.active_workspace()?.to_string();
        let mut first = None;
        for client in clients.iter().filter(|c| c.class == bundle_identifier) {
            if client.workspace.name == HIDDEN_WORKSPACE {
                debug!("unhide {} ({})", client.address, bundle_identifier);
                self.move_silently(&client.address, &active)?;
            }
            if first.is_none() && client.workspace.name != MINIMIZED_WORKSPACE {
                first = Some(client.address.as_str());
            }
        }
        match first {
            Some(address) => self.focus(address),
            None => Ok(()),
        }
    }

    fn hide_process(&self, bundle_identifier: &str) -> Result<(), Self::Error> {
        for client in self
            .clients()?
            .iter()
            .filter(|c| c.class == bundle_identifier && c.workspace.name != HIDDEN_WORKSPACE)
        {
            debug!("hide {} ({})", client.address, bundle_identifier);
            self.move_silently(&client.address, HIDDEN_WORKSPACE)?;
        }
        Ok(())
    }

    fn raise(&self, window: &DiscoveredWindow) -> Result<(), Self::Error> {
        if window.is_minimized {
            let active = self.active_workspace()?.to_string();
            self.move_silently(&window.handle, &active)?;
        }
        self.focus(&window.handle)
    }

    fn minimize(&self, window: &DiscoveredWindow) -> Result<(), Self::Error> {
        if window.is_minimized {
            return Ok(());
        }
        self.move_silently(&window.handle, MINIMIZED_WORKSPACE)
    }
}

//  Tests
