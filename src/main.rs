//! Entry point for the **ctxswitch** daemon.
//!
//! Construction order is store, shortcut table, dispatcher, switcher: the
//! table must observe the store before the dispatcher starts matching, and
//! the switcher needs the dispatcher's recorder.  Command sources run on
//! background threads; every command is processed on the main thread until
//! a `"Shutdown"` command arrives.

use ctxswitch::command::Command;
use ctxswitch::config::Config;
use ctxswitch::hotkey::{ShortcutDispatcher, ShortcutTable};
use ctxswitch::hyprland::HyprlandDesktop;
use ctxswitch::ipc::{SocketKeyHook, UnixSocketListener};
use ctxswitch::store::{JsonFileRepository, WorkspaceStore};
use ctxswitch::switcher::WorkspaceSwitcher;
use ctxswitch::traits::CommandSource;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

/// Try to load the config from `$XDG_CONFIG_HOME/ctxswitch/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = Config::default_path();
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();
    let config = load_config();

    let desktop = match HyprlandDesktop::new(config.titles.clone()) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!("failed to locate the compositor: {}", e);
            std::process::exit(1);
        }
    };

    let store_path = config
        .paths
        .store
        .clone()
        .unwrap_or_else(JsonFileRepository::default_path);
    info!("workspaces stored in {}", store_path.display());
    let mut store = WorkspaceStore::open(JsonFileRepository::new(&store_path));

    let table = ShortcutTable::new();
    store.on_change(table.observer());

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    let key_path = config
        .paths
        .key_socket
        .clone()
        .unwrap_or_else(SocketKeyHook::default_path);
    let mut hook = SocketKeyHook::new(&key_path);
    let mut dispatcher = ShortcutDispatcher::new(table, cmd_tx.clone());
    let shortcuts = match dispatcher.start(&mut hook) {
        Ok(()) => true,
        Err(e) => {
            warn!("global shortcuts disabled: {}", e);
            false
        }
    };

    let mut switcher = WorkspaceSwitcher::new(desktop, store);
    switcher.set_excluded_bundles(config.switch.excluded_bundles.iter().cloned());
    switcher.set_title_rules(config.titles.clone());
    switcher.set_loopback(cmd_tx.clone());
    if shortcuts {
        switcher.set_recorder(dispatcher.recorder());
    }

    let socket_path = config
        .paths
        .socket
        .clone()
        .unwrap_or_else(UnixSocketListener::default_path);
    spawn_command_sources(cmd_tx, socket_path);

    info!("ctxswitch running");
    for cmd in cmd_rx.iter() {
        if matches!(cmd, Command::Shutdown) {
            info!("shutdown requested, exiting");
            break;
        }
        if let Err(e) = switcher.handle(cmd) {
            error!("command error: {}", e);
        }
    }

    if let Err(e) = dispatcher.stop(&mut hook) {
        warn!("failed to stop shortcut dispatcher: {}", e);
    }
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Command>, path: PathBuf) {
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
